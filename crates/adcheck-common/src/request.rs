/// Deterministic assembly of the outbound multimodal request.
use sha2::{Digest, Sha256};

use crate::gemini::{
    Content, EmptyObject, GenerateContentRequest, GenerationConfig, LatLng, Part, RetrievalConfig,
    SystemInstruction, Tool, ToolConfig,
};
use crate::geo::GeoCoordinate;
use crate::inline_data::InlineData;
use crate::prompt::PromptProfile;

/// Everything the reviewer supplied for one analysis, already normalized.
#[derive(Debug, Clone, Default)]
pub struct ReviewInput {
    pub ad_text: String,
    pub evidence_text: String,
    pub design: Option<InlineData>,
    pub location: Option<GeoCoordinate>,
}

pub fn build_request(profile: &PromptProfile, input: &ReviewInput) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: profile.render_user_text(&input.ad_text, &input.evidence_text),
    }];
    if let Some(design) = &input.design {
        parts.push(Part::Inline {
            inline_data: design.clone(),
        });
    }

    GenerateContentRequest {
        system_instruction: SystemInstruction {
            parts: vec![Part::Text {
                text: profile.system_instruction.clone(),
            }],
        },
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
        },
        tools: vec![
            Tool::GoogleSearch(EmptyObject::default()),
            Tool::GoogleMaps(EmptyObject::default()),
        ],
        tool_config: input.location.map(|loc| ToolConfig {
            retrieval_config: RetrievalConfig {
                lat_lng: LatLng {
                    latitude: loc.latitude,
                    longitude: loc.longitude,
                },
            },
        }),
    }
}

/// SHA-256 of the serialized request body, for log correlation.
pub fn request_fingerprint(request: &GenerateContentRequest) -> String {
    let body = serde_json::to_vec(request).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&body);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> ReviewInput {
        ReviewInput {
            ad_text: "駅徒歩5分！格安物件！".to_string(),
            evidence_text: "物件名\tサンプル\n駅距離\t480m".to_string(),
            design: None,
            location: None,
        }
    }

    fn inline_part_count(value: &serde_json::Value) -> usize {
        value["contents"][0]["parts"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|p| p.get("inlineData").is_some())
            .count()
    }

    #[test]
    fn location_and_design_are_both_attached() {
        let mut input = sample_input();
        input.design = Some(InlineData::from_bytes(b"%PDF-1.7", "application/pdf"));
        input.location = GeoCoordinate::new(35.6812, 139.7671);

        let request = build_request(&PromptProfile::standard(), &input);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(inline_part_count(&value), 1);
        assert_eq!(value["contents"][0]["parts"][1]["inlineData"]["mimeType"], "application/pdf");
        let lat_lng = &value["toolConfig"]["retrievalConfig"]["latLng"];
        assert_eq!(lat_lng["latitude"], 35.6812);
        assert_eq!(lat_lng["longitude"], 139.7671);
    }

    #[test]
    fn missing_location_omits_tool_config_key() {
        let request = build_request(&PromptProfile::standard(), &sample_input());
        let value = serde_json::to_value(&request).unwrap();

        let object = value.as_object().unwrap();
        assert!(!object.contains_key("toolConfig"));
        assert_eq!(inline_part_count(&value), 0);
        assert_eq!(value["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn structured_output_and_grounding_tools_are_requested() {
        let request = build_request(&PromptProfile::standard(), &sample_input());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            value["tools"],
            serde_json::json!([{"googleSearch": {}}, {"googleMaps": {}}])
        );
        assert_eq!(value["contents"][0]["role"], "user");
        let instruction = value["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(instruction.contains("公正競争規約"));
    }

    #[test]
    fn ad_and_evidence_text_are_interpolated() {
        let request = build_request(&PromptProfile::standard(), &sample_input());
        let Part::Text { text } = &request.contents[0].parts[0] else {
            panic!("first part should be text");
        };
        assert!(text.contains("駅徒歩5分！格安物件！"));
        assert!(text.contains("駅距離\t480m"));
    }

    #[test]
    fn same_input_same_request() {
        let mut input = sample_input();
        input.location = GeoCoordinate::new(34.7025, 135.4959);

        let a = build_request(&PromptProfile::quick(), &input);
        let b = build_request(&PromptProfile::quick(), &input);
        assert_eq!(a, b);
        assert_eq!(request_fingerprint(&a), request_fingerprint(&b));

        input.ad_text.push('！');
        let c = build_request(&PromptProfile::quick(), &input);
        assert_ne!(request_fingerprint(&a), request_fingerprint(&c));
    }
}
