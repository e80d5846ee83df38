/// Error taxonomy for a single compliance review.
///
/// Every failure between reading the user's files and handing a parsed report to the
/// presenter is one of these four kinds. Callers at the tool boundary convert them to
/// `user_message()` text; nothing here should reach the user as a raw panic or string match.

#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    #[error("spreadsheet extraction failed: {0}")]
    Extraction(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("compliance service error (status={status:?}): {message}")]
    Service { status: Option<u16>, message: String },

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),
}

pub const EXTRACTION_USER_MESSAGE: &str = "エクセル解析エラー";
pub const ANALYSIS_USER_MESSAGE: &str = "AI解析中にエラーが発生しました。";

impl ComplianceError {
    /// Text suitable for showing to the reviewer.
    ///
    /// `Configuration` keeps its own message because it carries the remediation step.
    pub fn user_message(&self) -> String {
        match self {
            ComplianceError::Extraction(detail) => {
                format!("{EXTRACTION_USER_MESSAGE}: {detail}")
            }
            ComplianceError::Configuration(message) => message.clone(),
            ComplianceError::Service { .. } | ComplianceError::ResponseFormat(_) => {
                ANALYSIS_USER_MESSAGE.to_string()
            }
        }
    }

    /// Stable short name used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ComplianceError::Extraction(_) => "extraction",
            ComplianceError::Configuration(_) => "configuration",
            ComplianceError::Service { .. } => "service",
            ComplianceError::ResponseFormat(_) => "response_format",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_and_format_errors_share_display_text() {
        let service = ComplianceError::Service {
            status: Some(503),
            message: "overloaded".to_string(),
        };
        let format = ComplianceError::ResponseFormat("missing results".to_string());
        assert_eq!(service.user_message(), ANALYSIS_USER_MESSAGE);
        assert_eq!(format.user_message(), ANALYSIS_USER_MESSAGE);
        assert_ne!(service.kind(), format.kind());
    }

    #[test]
    fn configuration_message_is_passed_through() {
        let err = ComplianceError::Configuration("set GEMINI_API_KEY and redeploy".to_string());
        assert_eq!(err.user_message(), "set GEMINI_API_KEY and redeploy");
    }

    #[test]
    fn extraction_message_names_the_file_problem() {
        let err = ComplianceError::Extraction("no sheets".to_string());
        assert!(err.user_message().starts_with(EXTRACTION_USER_MESSAGE));
    }
}
