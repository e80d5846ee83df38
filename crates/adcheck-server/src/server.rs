/// MCP server for real-estate advertisement compliance review.
///
/// Exposes three tools:
/// - `check_ad_compliance`: review ad copy and an optional design file against the evidence sheet
/// - `extract_evidence`: preview the text extracted from an evidence spreadsheet
/// - `export_report`: render an existing report as clipboard text or printable HTML
use std::path::Path;
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use adcheck_common::compliance::ComplianceService;
use adcheck_common::error::ComplianceError;
use adcheck_common::evidence::extract_first_sheet;
use adcheck_common::geo::{GeoCoordinate, LocationProvider};
use adcheck_common::inline_data::{guess_mime_type, InlineData};
use adcheck_common::model::ComplianceReport;
use adcheck_common::report::{to_plain_text, to_print_html};
use adcheck_common::request::ReviewInput;

use crate::error::AppError;
use crate::gate::AnalysisGate;

#[derive(Clone)]
pub struct AdCheckServer {
    service: Arc<ComplianceService>,
    locator: Arc<LocationProvider>,
    gate: AnalysisGate,
    tool_router: ToolRouter<AdCheckServer>,
}

impl AdCheckServer {
    pub fn new(service: Arc<ComplianceService>, locator: Arc<LocationProvider>) -> Self {
        Self {
            service,
            locator,
            gate: AnalysisGate::new(),
            tool_router: Self::tool_router(),
        }
    }

    async fn resolve_location(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<GeoCoordinate>, AppError> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => GeoCoordinate::new(lat, lng).map(Some).ok_or_else(|| {
                AppError::InvalidInput(format!("coordinate out of range: {lat}, {lng}"))
            }),
            (None, None) => Ok(self.locator.locate().await),
            _ => Err(AppError::InvalidInput(
                "latitude and longitude must be given together".to_string(),
            )),
        }
    }

    async fn run_check(&self, params: CheckAdComplianceParams) -> Result<CheckAdComplianceResponse, AppError> {
        let ad_text = params.ad_text.unwrap_or_default();
        let evidence_path = params.evidence_path.filter(|p| !p.trim().is_empty());
        if ad_text.trim().is_empty() && evidence_path.is_none() {
            return Err(AppError::InvalidInput(
                "provide ad_text or evidence_path".to_string(),
            ));
        }
        self.service.ensure_configured()?;

        let _permit = self.gate.try_acquire().map_err(AppError::InvalidInput)?;

        let design_path = params.design_path.filter(|p| !p.trim().is_empty());
        let (evidence, design, location) = tokio::join!(
            load_evidence(evidence_path),
            load_design(design_path, params.design_mime_type),
            self.resolve_location(params.latitude, params.longitude),
        );

        let input = ReviewInput {
            ad_text,
            evidence_text: evidence?,
            design: design?,
            location: location?,
        };

        let analysis = self.service.analyze(&input).await?;
        let report_text = to_plain_text(&analysis.report);
        Ok(CheckAdComplianceResponse {
            report: analysis.report,
            report_text,
            request_fingerprint: analysis.fingerprint,
            location_used: input.location.is_some(),
        })
    }
}

async fn read_file(path: &str) -> Result<Vec<u8>, AppError> {
    tokio::fs::read(path).await.map_err(|source| AppError::Io {
        path: path.to_string(),
        source,
    })
}

async fn load_evidence(path: Option<String>) -> Result<String, AppError> {
    let Some(path) = path else {
        return Ok(String::new());
    };
    let bytes = read_file(&path).await?;
    let text = tokio::task::spawn_blocking(move || extract_first_sheet(&bytes))
        .await
        .map_err(|e| ComplianceError::Extraction(format!("extraction task failed: {e}")))??;
    info!(path = %path, chars = text.chars().count(), "evidence extracted");
    Ok(text)
}

async fn load_design(path: Option<String>, mime: Option<String>) -> Result<Option<InlineData>, AppError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = read_file(&path).await?;
    let mime = mime.unwrap_or_else(|| guess_mime_type(Path::new(&path)).to_string());
    let inline = InlineData::from_bytes(&bytes, &mime);
    info!(path = %path, mime = %inline.mime_type, bytes = bytes.len(), "design file attached");
    Ok(Some(inline))
}

/// Log at the boundary and turn the error into reviewer-facing text.
fn tool_error(err: AppError) -> String {
    match &err {
        AppError::Compliance(e @ ComplianceError::ResponseFormat(_)) => {
            error!(kind = e.kind(), error = %e, "model response violated the report contract");
        }
        AppError::Compliance(e) => {
            warn!(kind = e.kind(), error = %e, "compliance review failed");
        }
        other => {
            warn!(error = %other, "request rejected");
        }
    }
    match err {
        AppError::Compliance(e) => e.user_message(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CheckAdComplianceParams {
    /// Draft advertisement copy to review.
    #[serde(default)]
    ad_text: Option<String>,
    /// Path to the evidence spreadsheet (xlsx/xls/xlsb/ods). Only the first sheet is read.
    #[serde(default)]
    evidence_path: Option<String>,
    /// Path to the design mock-up (image or PDF).
    #[serde(default)]
    design_path: Option<String>,
    /// Media type of the design file; guessed from the extension when omitted.
    #[serde(default)]
    design_mime_type: Option<String>,
    /// Caller location used to bias map lookups. Give both or neither.
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct CheckAdComplianceResponse {
    report: ComplianceReport,
    /// Plain-text rendering for pasting into chat.
    report_text: String,
    request_fingerprint: String,
    location_used: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExtractEvidenceParams {
    path: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ExtractEvidenceResponse {
    text: String,
    line_count: usize,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Text,
    Html,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExportReportParams {
    report: ComplianceReport,
    #[serde(default)]
    format: ExportFormat,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ExportReportResponse {
    format: ExportFormat,
    content: String,
}

#[tool_router]
impl AdCheckServer {
    #[tool(description = "Review real-estate ad copy (and an optional design image/PDF) against the evidence spreadsheet using the hosted model with Google Search and Maps grounding. Returns the structured report and a plain-text version.")]
    async fn check_ad_compliance(
        &self,
        Parameters(params): Parameters<CheckAdComplianceParams>,
    ) -> Result<Json<CheckAdComplianceResponse>, String> {
        self.run_check(params).await.map(Json).map_err(tool_error)
    }

    #[tool(description = "Extract the first sheet of an evidence spreadsheet as TAB-separated text, exactly as it will be sent to the model.")]
    async fn extract_evidence(
        &self,
        Parameters(params): Parameters<ExtractEvidenceParams>,
    ) -> Result<Json<ExtractEvidenceResponse>, String> {
        let path = params.path.trim().to_string();
        if path.is_empty() {
            return Err("path must not be empty".to_string());
        }
        let text = load_evidence(Some(path)).await.map_err(tool_error)?;
        let line_count = text.lines().count();
        Ok(Json(ExtractEvidenceResponse { text, line_count }))
    }

    #[tool(description = "Render a compliance report as clipboard text (format=text) or a printable HTML document (format=html).")]
    async fn export_report(
        &self,
        Parameters(params): Parameters<ExportReportParams>,
    ) -> Result<Json<ExportReportResponse>, String> {
        let content = match params.format {
            ExportFormat::Text => to_plain_text(&params.report),
            ExportFormat::Html => to_print_html(&params.report),
        };
        Ok(Json(ExportReportResponse {
            format: params.format,
            content,
        }))
    }
}

#[tool_handler]
impl ServerHandler for AdCheckServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "adcheck-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Real-estate advertisement compliance reviewer. Use extract_evidence to preview the \
evidence sheet, check_ad_compliance to run a review (one at a time), and export_report to render \
the returned report as text or printable HTML."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use adcheck_common::gemini::GeminiClientConfig;
    use adcheck_common::prompt::PromptProfile;

    fn unconfigured_server() -> AdCheckServer {
        let service = ComplianceService::new(GeminiClientConfig::default(), PromptProfile::standard());
        AdCheckServer::new(Arc::new(service), Arc::new(LocationProvider::Disabled))
    }

    /// Holds a key but points at a closed port; only useful for failures before the model call.
    fn offline_server() -> AdCheckServer {
        let config = GeminiClientConfig {
            api_key: Some("test-key".to_string()),
            ..GeminiClientConfig::default()
        }
        .with_base_url("http://127.0.0.1:1/v1beta");
        let service = ComplianceService::new(config, PromptProfile::standard());
        AdCheckServer::new(Arc::new(service), Arc::new(LocationProvider::Disabled))
    }

    /// Accepts and counts TCP connections without ever answering.
    async fn counting_listener() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        });
        (format!("http://{addr}/json"), hits)
    }

    fn params(ad_text: Option<&str>, evidence_path: Option<&str>) -> CheckAdComplianceParams {
        CheckAdComplianceParams {
            ad_text: ad_text.map(str::to_string),
            evidence_path: evidence_path.map(str::to_string),
            design_path: None,
            design_mime_type: None,
            latitude: None,
            longitude: None,
        }
    }

    fn write_evidence(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("evidence.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "駅徒歩").unwrap();
        sheet.write_string(0, 1, "6分").unwrap();
        workbook.save(&path).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = AdCheckServer::tool_router().list_all();
        for name in ["check_ad_compliance", "extract_evidence", "export_report"] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn empty_submission_is_rejected() {
        let server = unconfigured_server();
        let err = server.run_check(params(Some("  "), None)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unconfigured_service_reports_remediation() {
        let server = unconfigured_server();
        let err = server
            .check_ad_compliance(Parameters(params(Some("格安物件！"), None)))
            .await
            .err()
            .unwrap();
        assert!(err.contains("redeploy"));
        assert!(!server.gate.is_busy());
    }

    #[tokio::test]
    async fn unconfigured_service_skips_location_lookup() {
        let (url, hits) = counting_listener().await;
        let service = ComplianceService::new(GeminiClientConfig::default(), PromptProfile::standard());
        let server = AdCheckServer::new(
            Arc::new(service),
            Arc::new(LocationProvider::lookup(url, Duration::from_millis(500))),
        );

        let err = server.run_check(params(Some("格安物件！"), None)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Compliance(ComplianceError::Configuration(_))
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_key_wins_over_broken_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        let path = path.to_string_lossy().to_string();

        let server = unconfigured_server();
        let err = server
            .run_check(params(None, Some(path.as_str())))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Compliance(ComplianceError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn unreadable_evidence_surfaces_extraction_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        let path = path.to_string_lossy().to_string();

        let server = offline_server();
        let err = server
            .check_ad_compliance(Parameters(params(None, Some(path.as_str()))))
            .await
            .err()
            .unwrap();
        assert!(err.starts_with("エクセル解析エラー"));
    }

    #[tokio::test]
    async fn half_coordinate_is_rejected() {
        let server = offline_server();
        let mut p = params(Some("新築"), None);
        p.latitude = Some(35.0);
        let err = server.run_check(p).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn extract_evidence_previews_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_evidence(&dir);

        let server = unconfigured_server();
        let Json(resp) = server
            .extract_evidence(Parameters(ExtractEvidenceParams { path }))
            .await
            .unwrap();
        assert_eq!(resp.text, "駅徒歩\t6分");
        assert_eq!(resp.line_count, 1);
    }

    #[tokio::test]
    async fn export_report_in_both_formats() {
        let report: ComplianceReport = serde_json::from_value(serde_json::json!({
            "results": [{
                "item": "特定用語",
                "originalContent": "格安物件！",
                "factCheckResult": "根拠なし",
                "judgment": "FAIL",
                "suggestion": "「格安」を削除",
                "source": ""
            }],
            "overallComment": "要修正"
        }))
        .unwrap();

        let server = unconfigured_server();
        let Json(text) = server
            .export_report(Parameters(ExportReportParams {
                report: report.clone(),
                format: ExportFormat::Text,
            }))
            .await
            .unwrap();
        assert!(text.content.starts_with("【不動産広告審査レポート】"));
        assert!(text.content.contains("[FAIL]"));

        let Json(html) = server
            .export_report(Parameters(ExportReportParams {
                report,
                format: ExportFormat::Html,
            }))
            .await
            .unwrap();
        assert!(html.content.starts_with("<!DOCTYPE html>"));
        assert!(html.content.contains("修正要"));
    }
}
