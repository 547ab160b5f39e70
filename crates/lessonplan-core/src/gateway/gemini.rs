//! Google Gemini implementation of [`GenerationGateway`].
//!
//! Calls the `generateContent` REST endpoint directly with `reqwest`. The
//! request asks for `application/json` output; the response text is the
//! concatenation of the first candidate's text parts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::trait_def::GenerationGateway;
use super::types::{GatewayError, GenerateRequest, ModelTier};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Full lesson plans for a school year are long; generous timeout.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Text returned when the model produced no text at all.
const EMPTY_RESPONSE: &str = "[]";

/// Gemini gateway holding an HTTP client and the API key.
#[derive(Clone)]
pub struct GeminiGateway {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiGateway {
    /// Create a gateway for the given API key.
    ///
    /// Returns [`GatewayError::MissingCredential`] for a blank key, before
    /// any network I/O happens.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GatewayError> {
        let api_key: String = api_key.into();
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(GatewayError::MissingCredential);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the gateway at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, model: ModelTier) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model.model_id())
    }
}

#[async_trait]
impl GenerationGateway for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, GatewayError> {
        let body = to_gemini_request(request);
        let url = self.endpoint(request.model);

        debug!(
            model = request.model.model_id(),
            parts = body.contents.first().map_or(0, |c| c.parts.len()),
            "sending generation request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let text = response_text(parsed);
        debug!(len = text.len(), "received generation response");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Build the wire request. Attachments with an empty payload (unreadable
/// files) are left out.
fn to_gemini_request(request: &GenerateRequest) -> GeminiRequest {
    let mut parts = Vec::with_capacity(request.attachments.len() + 1);
    parts.push(GeminiPart::Text {
        text: request.user_text.clone(),
    });

    for attachment in &request.attachments {
        if attachment.is_empty() {
            warn!(name = %attachment.name, "skipping attachment with empty payload");
            continue;
        }
        parts.push(GeminiPart::InlineData {
            inline_data: GeminiBlob {
                mime_type: attachment.mime_type.clone(),
                data: attachment.data.clone(),
            },
        });
    }

    GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text {
                text: request.system_instruction.clone(),
            }],
        },
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GeminiGenerationConfig {
            response_mime_type: "application/json".to_string(),
            temperature: request.temperature,
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GeminiResponse) -> String {
    let Some(candidate) = response.candidates.into_iter().next() else {
        warn!("generation response contained no candidates");
        return EMPTY_RESPONSE.to_string();
    };

    if let Some(reason) = &candidate.finish_reason {
        if reason != "STOP" {
            warn!(finish_reason = %reason, "generation stopped early");
        }
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    GeminiPart::Text { text } => Some(text),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        EMPTY_RESPONSE.to_string()
    } else {
        text
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
    /// Function calls, thought signatures and anything else we do not use.
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Attachment;

    #[test]
    fn blank_key_is_missing_credential() {
        assert!(matches!(
            GeminiGateway::new("   "),
            Err(GatewayError::MissingCredential)
        ));
    }

    #[test]
    fn endpoint_includes_model_id() {
        let gateway = GeminiGateway::new("k")
            .unwrap()
            .with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(gateway.base_url(), "http://localhost:9999/v1beta");
        assert_eq!(
            gateway.endpoint(ModelTier::Fast),
            "http://localhost:9999/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn debug_output_hides_key() {
        let gateway = GeminiGateway::new("secret-key").unwrap();
        assert!(!format!("{gateway:?}").contains("secret-key"));
    }

    #[test]
    fn request_body_shape() {
        let request = GenerateRequest::new(ModelTier::Fast, "Toán 10").with_attachments(vec![
            Attachment::new("ppct.pdf", "application/pdf", "JVBERi0="),
            Attachment::new("broken.png", "image/png", ""),
        ]);
        let value = serde_json::to_value(to_gemini_request(&request)).unwrap();

        assert!(value["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("KẾ HOẠCH BÀI DẠY"));
        assert!(value["systemInstruction"].get("role").is_none());

        let parts = value["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(parts.len(), 2, "empty attachment must be skipped");
        assert!(parts[0]["text"].as_str().unwrap().contains("Toán 10"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["inlineData"]["data"], "JVBERi0=");

        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        let temperature = value["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.1).abs() < 1e-6);
    }

    #[test]
    fn response_text_joins_text_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"role": "model", "parts": [
                {"text": "[{\"stt\": "},
                {"functionCall": {"name": "x", "args": {}}},
                {"text": "\"1\"}]"}
            ]}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response), r#"[{"stt": "1"}]"#);
    }

    #[test]
    fn response_without_text_is_empty_array() {
        let none: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(response_text(none), "[]");

        let blank: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}, "finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(blank), "[]");

        let no_content: GeminiResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert_eq!(response_text(no_content), "[]");
    }
}
