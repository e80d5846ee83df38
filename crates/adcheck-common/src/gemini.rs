use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ComplianceError;
use crate::inline_data::InlineData;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClientConfig {
    pub base_url: String,
    /// `None` leaves the service unconfigured; every analysis then fails fast.
    pub api_key: Option<String>,
    /// Transport timeout. `None` relies on the OS/network stack.
    pub timeout: Option<Duration>,
    pub max_error_body_bytes: usize,
}

impl std::fmt::Debug for GeminiClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_error_body_bytes", &self.max_error_body_bytes)
            .finish()
    }
}

impl GeminiClientConfig {
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .or_else(|| std::env::var("API_KEY").ok())
            .filter(|k| !k.trim().is_empty());

        let timeout = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .map(Duration::from_secs);

        let max_error_body_bytes = std::env::var("GEMINI_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            max_error_body_bytes,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: None,
            max_error_body_bytes: 8 * 1024,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },
}

impl From<GeminiClientError> for ComplianceError {
    fn from(err: GeminiClientError) -> Self {
        let status = match &err {
            GeminiClientError::InvalidJson(e) => {
                return ComplianceError::ResponseFormat(format!("response body was not valid JSON: {e}"));
            }
            GeminiClientError::Request(e) => e.status().map(|s| s.as_u16()),
            GeminiClientError::Upstream { status, .. }
            | GeminiClientError::UpstreamBody { status, .. } => Some(status.as_u16()),
        };
        ComplianceError::Service {
            status,
            message: err.to_string(),
        }
    }
}

/// Thin REST client for `models/{model}:generateContent`.
///
/// Single attempt per call. A repeated generation is billed again, so retries belong to the user.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    timeout: Option<Duration>,
    max_error_body_bytes: usize,
    http: reqwest::Client,
}

impl GeminiClient {
    /// Fails with `Configuration` when no usable API key is present.
    pub fn new(config: GeminiClientConfig) -> Result<Self, ComplianceError> {
        let api_key = config
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ComplianceError::Configuration(missing_key_message()))?;

        let http = reqwest::Client::builder()
            .user_agent("adcheck/compliance-reviewer")
            .build()
            .map_err(|e| ComplianceError::Configuration(format!("failed to build http client: {e}")))?;

        Ok(Self {
            base_url: config.base_url,
            api_key,
            timeout: config.timeout,
            max_error_body_bytes: config.max_error_body_bytes,
            http,
        })
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiClientError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let mut builder = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let resp = builder.send().await?;

        if resp.status().is_success() {
            let body = resp.bytes().await?;
            return Ok(serde_json::from_slice::<GenerateContentResponse>(&body)?);
        }
        Err(to_upstream_error(resp, self.max_error_body_bytes).await)
    }
}

pub fn missing_key_message() -> String {
    "GEMINI_API_KEY is not set. Register the API key in the deployment environment \
(GEMINI_API_KEY) and redeploy the server."
        .to_string()
}

async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> GeminiClientError {
    let status = resp.status();
    let body = read_limited_text(resp, max_error_body_bytes).await;
    if let Ok(parsed) = serde_json::from_str::<GoogleErrorEnvelope>(&body) {
        let message = parsed
            .error
            .message
            .or(parsed.error.status)
            .unwrap_or_else(|| "unknown upstream error".to_string());
        return GeminiClientError::Upstream { status, message };
    }
    GeminiClientError::UpstreamBody { status, body }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorObject,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorObject {
    message: Option<String>,
    status: Option<String>,
    #[allow(dead_code)]
    code: Option<i64>,
}

// --- Request wire types ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: SystemInstruction,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
}

/// Grounding tools. Each serializes as a single-key object with an empty body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    GoogleSearch(EmptyObject),
    GoogleMaps(EmptyObject),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmptyObject {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub retrieval_config: RetrievalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    pub lat_lng: LatLng,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

// --- Response wire types ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<ResponseContent>,
    pub finish_reason: Option<String>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<ChunkRef>,
    pub maps: Option<ChunkRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkRef {
    pub uri: Option<String>,
    pub title: Option<String>,
}
