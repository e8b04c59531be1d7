//! LLM Client: the single point of entry for all generative-model calls.
//!
//! No other module talks to a model provider over HTTP. Text stages go through
//! [`ChatModel`], illustrations through [`image::ImageModel`]. Tests drive the
//! pipeline through the same traits with scripted fakes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::models::{ModelSpec, Provider};

#[cfg(test)]
pub mod fakes;
pub mod image;
pub mod models;
pub mod prompts;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const HF_API_BASE: &str = "https://router.huggingface.co";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Could not decode inline payload: {0}")]
    Decode(String),
}

/// A rendered system+user message pair plus sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f64,
}

/// A chat/completion model. Implementations must be stateless across calls so
/// one instance can serve many concurrent runs.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Transport settings shared by the chat and image clients.
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Total attempts for transient failures (429, 5xx, connection errors).
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_retries: 3,
        }
    }
}

pub(crate) fn build_http_client(settings: &HttpSettings) -> Client {
    Client::builder()
        .timeout(settings.timeout)
        .build()
        .expect("Failed to build HTTP client")
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// POSTs a JSON body and returns the parsed JSON response.
/// Retries on 429 (rate limit), 5xx and connection errors with exponential backoff.
pub(crate) async fn post_json_with_retry(
    client: &Client,
    url: &str,
    headers: &[(&str, &str)],
    body: &Value,
    max_retries: u32,
) -> Result<Value, LlmError> {
    let attempts = max_retries.max(1);
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "Model call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let mut request = client
            .post(url)
            .header("content-type", "application/json")
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model API returned {}: {}", status, body);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        return Ok(response.json::<Value>().await?);
    }

    Err(last_error.unwrap_or(LlmError::RateLimited {
        retries: max_retries,
    }))
}

/// Which wire protocol a chat client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatBackend {
    Gemini,
    HuggingFace,
}

/// Chat client over either Gemini `generateContent` or the Hugging Face
/// OpenAI-compatible chat endpoint. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    backend: ChatBackend,
    model: String,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl LlmClient {
    /// `spec` must be a chat model; `base_url` overrides the provider default.
    pub fn new(
        spec: &ModelSpec,
        api_key: String,
        base_url: Option<String>,
        settings: &HttpSettings,
    ) -> Self {
        let (backend, default_base) = match spec.provider {
            Provider::HuggingFace => (ChatBackend::HuggingFace, HF_API_BASE),
            Provider::Google | Provider::GoogleImage => (ChatBackend::Gemini, GEMINI_API_BASE),
        };
        Self {
            client: build_http_client(settings),
            backend,
            model: spec.name.to_string(),
            api_key: api_key.trim().to_string(),
            base_url: base_url
                .unwrap_or_else(|| default_base.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_retries: settings.max_retries,
        }
    }

    async fn complete_gemini(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "systemInstruction": { "parts": [{ "text": request.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.user }] }],
            "generationConfig": { "temperature": request.temperature }
        });

        let response = post_json_with_retry(
            &self.client,
            &url,
            &[("x-goog-api-key", self.api_key.as_str())],
            &body,
            self.max_retries,
        )
        .await?;

        if let Some(usage) = response.get("usageMetadata") {
            debug!(
                "Gemini call succeeded: model={}, input_tokens={}, output_tokens={}",
                self.model,
                usage["promptTokenCount"].as_u64().unwrap_or(0),
                usage["candidatesTokenCount"].as_u64().unwrap_or(0)
            );
        }

        gemini_text(&response).ok_or(LlmError::EmptyContent)
    }

    async fn complete_hf(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": request.temperature,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ]
        });
        let bearer = format!("Bearer {}", self.api_key);

        let response = post_json_with_retry(
            &self.client,
            &url,
            &[("authorization", bearer.as_str())],
            &body,
            self.max_retries,
        )
        .await?;

        response["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .and_then(|c| c["message"]["content"].as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        match self.backend {
            ChatBackend::Gemini => self.complete_gemini(request).await,
            ChatBackend::HuggingFace => self.complete_hf(request).await,
        }
    }
}

/// Concatenates the text parts of the first Gemini candidate.
fn gemini_text(response: &Value) -> Option<String> {
    let parts = response["candidates"]
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::models::resolve_chat_model;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(max_retries: u32) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(10),
            max_retries,
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            system: "You write stories.".to_string(),
            user: "Write one.".to_string(),
            temperature: 0.7,
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_gemini_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Once " }, { "text": "upon" }] } }]
        });
        assert_eq!(gemini_text(&response).as_deref(), Some("Once upon"));
    }

    #[test]
    fn test_gemini_text_empty_candidates() {
        assert!(gemini_text(&json!({ "candidates": [] })).is_none());
        assert!(gemini_text(&json!({})).is_none());
    }

    #[tokio::test]
    async fn test_gemini_request_shape_and_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-exp:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": "You write stories." }] },
                "generationConfig": { "temperature": 0.7 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "A tale." }] } }],
                "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 3 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spec = resolve_chat_model("gemini-2.0-flash-exp").unwrap();
        let client = LlmClient::new(spec, "test-key".to_string(), Some(server.uri()), &settings(1));
        let text = client.complete(&request()).await.unwrap();
        assert_eq!(text, "A tale.");
        assert_eq!(client.model_name(), "gemini-2.0-flash-exp");
    }

    #[tokio::test]
    async fn test_huggingface_request_shape_and_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer hf-token"))
            .and(body_partial_json(json!({ "model": "Qwen/Qwen2.5-72B-Instruct" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Hello." } }]
            })))
            .mount(&server)
            .await;

        let spec = resolve_chat_model("Qwen/Qwen2.5-72B-Instruct").unwrap();
        let client = LlmClient::new(spec, "hf-token".to_string(), Some(server.uri()), &settings(1));
        assert_eq!(client.complete(&request()).await.unwrap(), "Hello.");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried_and_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spec = resolve_chat_model("gemini-2.0-flash-lite").unwrap();
        let client = LlmClient::new(spec, "bad".to_string(), Some(server.uri()), &settings(3));
        match client.complete(&request()).await {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "Recovered." }] } }]
            })))
            .mount(&server)
            .await;

        let spec = resolve_chat_model("gemini-2.0-flash-exp").unwrap();
        let client = LlmClient::new(spec, "k".to_string(), Some(server.uri()), &settings(2));
        assert_eq!(client.complete(&request()).await.unwrap(), "Recovered.");
    }

    #[tokio::test]
    async fn test_empty_candidates_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let spec = resolve_chat_model("gemini-2.0-flash-exp").unwrap();
        let client = LlmClient::new(spec, "k".to_string(), Some(server.uri()), &settings(1));
        assert!(matches!(
            client.complete(&request()).await,
            Err(LlmError::EmptyContent)
        ));
    }
}
