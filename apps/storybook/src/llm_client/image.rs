//! Image-generation client (Gemini image models).
//!
//! A response without any inline image is a valid response, not an error; the
//! caller decides what a missing image means.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::llm_client::models::ModelSpec;
use crate::llm_client::{build_http_client, post_json_with_retry, HttpSettings, LlmError, GEMINI_API_BASE};

/// One element of a multimodal request.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Image { mime_type: String, data: Bytes },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateContent {
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

/// Decoded image-model response: zero or more candidates, each of which may
/// carry inline binary data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageResponse {
    pub candidates: Vec<Candidate>,
}

impl ImageResponse {
    /// Builds a response holding a single inline image.
    #[cfg(test)]
    pub fn with_image(mime_type: &str, data: impl Into<Bytes>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![ResponsePart {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: data.into(),
                        }),
                    }],
                }),
            }],
        }
    }

    /// Scans candidates → content parts → inline data and returns the first
    /// non-empty payload.
    pub fn first_inline_image(&self) -> Option<&InlineData> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.inline_data.as_ref())
            .find(|inline| !inline.data.is_empty())
    }
}

/// An image-generation model.
#[async_trait]
pub trait ImageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, parts: &[ContentPart]) -> Result<ImageResponse, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

/// Undecodable payloads are dropped from the response. The decode error only
/// surfaces when no usable image remains.
fn decode_response(value: Value) -> Result<ImageResponse, LlmError> {
    let wire: WireResponse = serde_json::from_value(value)?;
    let mut decode_error = None;
    let mut candidates = Vec::with_capacity(wire.candidates.len());

    for candidate in wire.candidates {
        let content = match candidate.content {
            Some(content) => {
                let mut parts = Vec::with_capacity(content.parts.len());
                for part in content.parts {
                    let inline_data = match part.inline_data.map(decode_inline) {
                        Some(Ok(inline)) => Some(inline),
                        Some(Err(e)) => {
                            warn!("Dropping undecodable inline image payload: {}", e);
                            decode_error.get_or_insert(e);
                            None
                        }
                        None => None,
                    };
                    parts.push(ResponsePart {
                        text: part.text,
                        inline_data,
                    });
                }
                Some(CandidateContent { parts })
            }
            None => None,
        };
        candidates.push(Candidate { content });
    }

    let response = ImageResponse { candidates };
    match decode_error {
        Some(e) if response.first_inline_image().is_none() => Err(e),
        _ => Ok(response),
    }
}

fn decode_inline(inline: WireInlineData) -> Result<InlineData, LlmError> {
    let data = BASE64
        .decode(inline.data.as_bytes())
        .map_err(|e| LlmError::Decode(e.to_string()))?;
    Ok(InlineData {
        mime_type: inline.mime_type,
        data: Bytes::from(data),
    })
}

fn encode_parts(parts: &[ContentPart]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Image { mime_type, data } => json!({
                "inlineData": { "mimeType": mime_type, "data": BASE64.encode(data) }
            }),
            ContentPart::Text(text) => json!({ "text": text }),
        })
        .collect()
}

/// Gemini image-generation client. Stateless; clones share the HTTP pool.
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl ImageClient {
    pub fn new(
        spec: &ModelSpec,
        api_key: String,
        base_url: Option<String>,
        settings: &HttpSettings,
    ) -> Self {
        Self {
            client: build_http_client(settings),
            model: spec.name.to_string(),
            api_key: api_key.trim().to_string(),
            base_url: base_url
                .unwrap_or_else(|| GEMINI_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_retries: settings.max_retries,
        }
    }
}

#[async_trait]
impl ImageModel for ImageClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: &[ContentPart]) -> Result<ImageResponse, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": encode_parts(parts) }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });

        let response = post_json_with_retry(
            &self.client,
            &url,
            &[("x-goog-api-key", self.api_key.as_str())],
            &body,
            self.max_retries,
        )
        .await?;

        let decoded = decode_response(response)?;
        debug!(
            "Image call returned {} candidate(s), image present: {}",
            decoded.candidates.len(),
            decoded.first_inline_image().is_some()
        );
        Ok(decoded)
    }
}
