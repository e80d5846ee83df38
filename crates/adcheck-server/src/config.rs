use std::time::Duration;

use adcheck_common::gemini::GeminiClientConfig;
use adcheck_common::geo::{GeoCoordinate, LocationProvider};
use adcheck_common::prompt::PromptProfile;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// The API key is optional at this layer. Its absence is logged at startup and returned as a
/// configuration error from every analysis attempt.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiClientConfig,
    pub profile: PromptProfile,
    pub location: LocationProvider,
}

impl Config {
    /// Optional:
    /// - `GEMINI_API_KEY` (or legacy `API_KEY`), `GEMINI_BASE_URL`, `GEMINI_TIMEOUT_SECS`
    /// - `ADCHECK_PROFILE`: `standard` | `quick` | `detailed` (default `standard`)
    /// - `ADCHECK_MODEL`: override the profile's model ID
    /// - `ADCHECK_LATITUDE` + `ADCHECK_LONGITUDE`: fixed location bias
    /// - `ADCHECK_GEOIP_URL`, `ADCHECK_GEOIP_TIMEOUT_MS`: lookup-based location bias
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let profile_name = var("ADCHECK_PROFILE").unwrap_or_else(|| "standard".to_string());
        let mut profile = PromptProfile::by_name(&profile_name).ok_or_else(|| {
            AppError::Config(format!(
                "unknown ADCHECK_PROFILE '{profile_name}' (expected one of: {})",
                PromptProfile::builtin_names().join(", ")
            ))
        })?;
        if let Some(model) = var("ADCHECK_MODEL") {
            profile = profile.with_model(model.trim());
        }

        let location = match (var("ADCHECK_LATITUDE"), var("ADCHECK_LONGITUDE")) {
            (Some(lat), Some(lng)) => {
                let coord = parse_f64("ADCHECK_LATITUDE", &lat)
                    .and_then(|lat| Ok((lat, parse_f64("ADCHECK_LONGITUDE", &lng)?)))
                    .and_then(|(lat, lng)| {
                        GeoCoordinate::new(lat, lng).ok_or_else(|| {
                            AppError::Config(format!("coordinate out of range: {lat}, {lng}"))
                        })
                    })?;
                LocationProvider::Fixed(coord)
            }
            (None, None) => match var("ADCHECK_GEOIP_URL") {
                Some(url) => {
                    let timeout_ms = match var("ADCHECK_GEOIP_TIMEOUT_MS") {
                        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                            AppError::Config(format!("ADCHECK_GEOIP_TIMEOUT_MS is not a number: {raw}"))
                        })?,
                        None => 3_000,
                    };
                    LocationProvider::lookup(url, Duration::from_millis(timeout_ms))
                }
                None => LocationProvider::Disabled,
            },
            _ => {
                return Err(AppError::Config(
                    "ADCHECK_LATITUDE and ADCHECK_LONGITUDE must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            gemini: GeminiClientConfig::from_env(),
            profile,
            location,
        })
    }
}

fn parse_f64(key: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AppError::Config(format!("{key} is not a number: {raw}")))
}
