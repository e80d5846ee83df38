/// Compliance service: one round trip to the model, then fence stripping, report parsing
/// and grounding attachment.
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use tracing::{info, warn};

use crate::error::ComplianceError;
use crate::gemini::{
    GeminiClient, GeminiClientConfig, GenerateContentResponse, GroundingChunk,
};
use crate::model::{ComplianceReport, GroundingSource, SourceRef};
use crate::prompt::PromptProfile;
use crate::request::{build_request, request_fingerprint, ReviewInput};

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```$").expect("valid regex")
});

pub struct ComplianceService {
    /// `None` when no credential was configured at startup.
    client: Option<GeminiClient>,
    profile: PromptProfile,
}

/// A parsed report plus the fingerprint of the request that produced it.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: ComplianceReport,
    pub fingerprint: String,
}

impl ComplianceService {
    /// Builds the service once at startup. A missing credential is logged here and
    /// reported on every `analyze` call without touching the network.
    pub fn new(config: GeminiClientConfig, profile: PromptProfile) -> Self {
        let client = match GeminiClient::new(config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "compliance service unconfigured; analyses will be rejected");
                None
            }
        };
        Self { client, profile }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Fails with `Configuration` when no credential was configured. Performs no I/O.
    pub fn ensure_configured(&self) -> Result<&GeminiClient, ComplianceError> {
        self.client
            .as_ref()
            .ok_or_else(|| ComplianceError::Configuration(crate::gemini::missing_key_message()))
    }

    pub async fn analyze(&self, input: &ReviewInput) -> Result<Analysis, ComplianceError> {
        let client = self.ensure_configured()?;

        let request = build_request(&self.profile, input);
        let fingerprint = request_fingerprint(&request);
        info!(
            model = %self.profile.model,
            profile = %self.profile.name,
            fingerprint = %fingerprint,
            has_design = input.design.is_some(),
            has_location = input.location.is_some(),
            "submitting compliance review"
        );

        let started = Instant::now();
        let response = client.generate_content(&self.profile.model, &request).await?;
        let report = parse_response(&response)?;

        info!(
            fingerprint = %fingerprint,
            elapsed_ms = started.elapsed().as_millis(),
            results = report.results.len(),
            grounding_sources = report.grounding_sources.as_ref().map_or(0, |s| s.len()),
            model_version = response.model_version.as_deref().unwrap_or("unknown"),
            "compliance review complete"
        );
        Ok(Analysis {
            report,
            fingerprint,
        })
    }
}

/// Remove a surrounding code fence (```` ``` ```` or ```` ```json ````) if present.
///
/// Idempotent: cleaning already-clean text returns it unchanged (modulo outer whitespace).
pub fn clean_json_text(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unfenced = match FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).trim(),
        None => trimmed,
    };
    if unfenced.starts_with('{') {
        return unfenced;
    }
    // Prose around the object: fall back to the outermost braces.
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Parse the model's cleaned text into a report (without grounding).
pub fn parse_report_text(raw: &str) -> Result<ComplianceReport, ComplianceError> {
    let cleaned = clean_json_text(raw);
    let mut report: ComplianceReport = serde_json::from_str(cleaned)
        .map_err(|e| ComplianceError::ResponseFormat(format!("report JSON did not match: {e}")))?;
    if report.revised_copy().is_none() {
        report.revised_ad_copy = None;
    }
    // Citations come only from response metadata, never from the model's own JSON.
    report.grounding_sources = None;
    Ok(report)
}

pub fn parse_response(response: &GenerateContentResponse) -> Result<ComplianceReport, ComplianceError> {
    let Some(text) = response.text() else {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(ComplianceError::Service {
                status: None,
                message: format!("request was blocked: {reason}"),
            });
        }
        let finish = response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .unwrap_or("none");
        return Err(ComplianceError::ResponseFormat(format!(
            "response carried no text (finish_reason={finish})"
        )));
    };

    let mut report = parse_report_text(&text)?;
    report.grounding_sources = response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .and_then(|m| m.grounding_chunks.as_deref())
        .and_then(map_grounding_chunks);
    Ok(report)
}

/// One source per web or maps chunk; `None` when nothing maps.
fn map_grounding_chunks(chunks: &[GroundingChunk]) -> Option<Vec<GroundingSource>> {
    let sources: Vec<GroundingSource> = chunks
        .iter()
        .filter_map(|chunk| {
            let to_ref = |r: &crate::gemini::ChunkRef| SourceRef {
                uri: r.uri.clone().unwrap_or_default(),
                title: r.title.clone().unwrap_or_default(),
            };
            if let Some(web) = &chunk.web {
                Some(GroundingSource::Web(to_ref(web)))
            } else {
                chunk.maps.as_ref().map(|maps| GroundingSource::Maps(to_ref(maps)))
            }
        })
        .collect();
    (!sources.is_empty()).then_some(sources)
}
