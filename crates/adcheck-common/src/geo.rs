/// Best-effort location used to bias map grounding.
///
/// Every failure path logs and yields `None`; the review proceeds without a location bias.
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Returns `None` for values outside WGS84 bounds or non-finite input.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Clone, Debug)]
pub enum LocationProvider {
    Disabled,
    Fixed(GeoCoordinate),
    /// HTTP JSON lookup (IP geolocation) returning `latitude`/`longitude` or `lat`/`lon`.
    Lookup {
        http: reqwest::Client,
        url: String,
        timeout: Duration,
    },
}

#[derive(Debug, Deserialize)]
struct LookupPayload {
    #[serde(alias = "lat")]
    latitude: Option<f64>,
    #[serde(alias = "lon", alias = "lng")]
    longitude: Option<f64>,
}

impl LocationProvider {
    pub fn lookup(url: impl Into<String>, timeout: Duration) -> Self {
        LocationProvider::Lookup {
            http: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            LocationProvider::Disabled => "disabled",
            LocationProvider::Fixed(_) => "fixed",
            LocationProvider::Lookup { .. } => "lookup",
        }
    }

    pub async fn locate(&self) -> Option<GeoCoordinate> {
        match self {
            LocationProvider::Disabled => None,
            LocationProvider::Fixed(coord) => Some(*coord),
            LocationProvider::Lookup { http, url, timeout } => {
                let coord = lookup_once(http, url, *timeout).await;
                if coord.is_some() {
                    info!(url = %url, "location lookup succeeded");
                }
                coord
            }
        }
    }
}

async fn lookup_once(http: &reqwest::Client, url: &str, timeout: Duration) -> Option<GeoCoordinate> {
    let resp = http
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .inspect_err(|e| warn!(error = %e, url, "location lookup failed, continuing without location"))
        .ok()?;

    if !resp.status().is_success() {
        warn!(status = %resp.status(), url, "location lookup rejected, continuing without location");
        return None;
    }

    let payload = resp
        .json::<LookupPayload>()
        .await
        .inspect_err(|e| warn!(error = %e, url, "location payload unreadable"))
        .ok()?;

    let coord = GeoCoordinate::new(payload.latitude?, payload.longitude?);
    if coord.is_none() {
        warn!(url, "location payload out of range");
    }
    coord
}
