//! Scripted in-memory models for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm_client::image::{ContentPart, ImageModel, ImageResponse};
use crate::llm_client::{ChatModel, ChatRequest, LlmError};

/// Replies to each call with the next scripted response, recording requests.
pub struct ScriptedChatModel {
    name: String,
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatModel {
    pub fn new(name: &str, replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(name: &str, replies: &[&str]) -> Self {
        Self::new(name, replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

/// Replies to each image call with the next scripted response, recording the
/// parts it was sent.
pub struct ScriptedImageModel {
    replies: Mutex<VecDeque<Result<ImageResponse, LlmError>>>,
    pub calls: Mutex<Vec<Vec<ContentPart>>>,
}

impl ScriptedImageModel {
    pub fn new(replies: Vec<Result<ImageResponse, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageModel for ScriptedImageModel {
    fn model_name(&self) -> &str {
        "scripted-image"
    }

    async fn generate(&self, parts: &[ContentPart]) -> Result<ImageResponse, LlmError> {
        self.calls.lock().unwrap().push(parts.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ImageResponse::default()))
    }
}
