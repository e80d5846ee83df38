use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Media type assumed when the platform reports none.
pub const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// A binary file embedded directly in a multimodal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Standard base64, no data-URL prefix.
    pub data: String,
}

impl InlineData {
    pub fn from_bytes(bytes: &[u8], declared_mime: &str) -> Self {
        Self {
            mime_type: normalize_mime(declared_mime),
            data: STANDARD.encode(bytes),
        }
    }

    /// Accepts either `data:<mime>;base64,<payload>` or a bare base64 payload.
    ///
    /// A mime type embedded in the data URL takes precedence over `fallback_mime`.
    pub fn from_data_url(input: &str, fallback_mime: &str) -> Self {
        let input = input.trim();
        if let Some(rest) = input.strip_prefix("data:") {
            if let Some((header, payload)) = rest.split_once(',') {
                let mime = header
                    .split(';')
                    .next()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(fallback_mime);
                return Self {
                    mime_type: normalize_mime(mime),
                    data: payload.to_string(),
                };
            }
        }
        Self {
            mime_type: normalize_mime(fallback_mime),
            data: input.to_string(),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.data.as_bytes())
    }
}

fn normalize_mime(declared: &str) -> String {
    let declared = declared.trim();
    if declared.is_empty() {
        DEFAULT_MIME_TYPE.to_string()
    } else {
        declared.to_string()
    }
}

/// Best guess at a file's media type from its extension, the way a browser fills `File.type`.
///
/// Returns an empty string for unknown extensions so the converter's default applies.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_value_survives_the_round_trip() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(1031).collect();
        let inline = InlineData::from_bytes(&bytes, "image/png");
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.decode().unwrap(), bytes);
    }

    #[test]
    fn empty_input_round_trips() {
        let inline = InlineData::from_bytes(&[], "application/pdf");
        assert_eq!(inline.data, "");
        assert_eq!(inline.decode().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn blank_mime_falls_back_to_pdf() {
        assert_eq!(InlineData::from_bytes(b"%PDF-1.7", "").mime_type, DEFAULT_MIME_TYPE);
        assert_eq!(InlineData::from_bytes(b"%PDF-1.7", "  ").mime_type, DEFAULT_MIME_TYPE);
    }

    #[test]
    fn data_url_prefix_is_removed() {
        let original = InlineData::from_bytes(b"\x89PNG\r\n", "image/png");
        let url = format!("data:image/png;base64,{}", original.data);

        let parsed = InlineData::from_data_url(&url, "");
        assert_eq!(parsed, original);

        let bare = InlineData::from_data_url(&original.data, "image/png");
        assert_eq!(bare, original);
    }

    #[test]
    fn data_url_without_mime_uses_fallback() {
        let parsed = InlineData::from_data_url("data:;base64,AAEC", "");
        assert_eq!(parsed.mime_type, DEFAULT_MIME_TYPE);
        assert_eq!(parsed.decode().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn mime_guess_by_extension() {
        assert_eq!(guess_mime_type(Path::new("mock.PNG")), "image/png");
        assert_eq!(guess_mime_type(Path::new("flyer.jpeg")), "image/jpeg");
        assert_eq!(guess_mime_type(Path::new("design.pdf")), "application/pdf");
        assert_eq!(guess_mime_type(Path::new("design.ai")), "");
        assert_eq!(guess_mime_type(Path::new("noext")), "");
    }
}
