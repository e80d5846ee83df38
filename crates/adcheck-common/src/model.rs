use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of one compliance check item.
///
/// Closed set: any other value in a model response is a format error, never a
/// silently-blank badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Judgment {
    Pass,
    Warning,
    Fail,
}

impl Judgment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Judgment::Pass => "PASS",
            Judgment::Warning => "WARNING",
            Judgment::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for Judgment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the compliance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    /// Checked attribute, e.g. "徒歩時間" or "周辺施設".
    #[serde(default, deserialize_with = "null_as_empty")]
    pub item: String,
    /// Verbatim claim as it appears in the ad.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub original_content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fact_check_result: String,
    pub judgment: Judgment,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub suggestion: String,
    /// Evidence sheet or external lookup backing the finding.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// A citation returned alongside the model answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GroundingSource {
    Web(SourceRef),
    Maps(SourceRef),
}

impl GroundingSource {
    pub fn reference(&self) -> &SourceRef {
        match self {
            GroundingSource::Web(r) | GroundingSource::Maps(r) => r,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceRef {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub uri: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    /// Presentation order only.
    pub results: Vec<ReviewResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_ad_copy: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub overall_comment: String,
    /// `None` means the platform returned no citation metadata at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_sources: Option<Vec<GroundingSource>>,
}

impl ComplianceReport {
    pub fn count(&self, judgment: Judgment) -> usize {
        self.results.iter().filter(|r| r.judgment == judgment).count()
    }

    /// Revised copy, treating a blank string the same as absent.
    pub fn revised_copy(&self) -> Option<&str> {
        self.revised_ad_copy
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
