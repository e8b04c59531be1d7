//! Static model registry. Every model identifier the pipeline may be configured
//! with must appear here; anything else is a configuration error at startup.

use crate::errors::AppError;

pub const DEFAULT_STORY_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_POLISH_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_MODERATION_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Which backend serves a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Gemini chat via `generateContent`.
    Google,
    /// Hugging Face inference router (OpenAI-compatible chat completions).
    HuggingFace,
    /// Gemini image generation via `generateContent` with image output.
    GoogleImage,
}

impl Provider {
    pub fn is_chat(self) -> bool {
        matches!(self, Provider::Google | Provider::HuggingFace)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub name: &'static str,
    pub provider: Provider,
}

pub static MODEL_REGISTRY: &[ModelSpec] = &[
    ModelSpec {
        name: "gemini-2.0-flash-exp",
        provider: Provider::Google,
    },
    ModelSpec {
        name: "gemini-2.0-flash-lite",
        provider: Provider::Google,
    },
    ModelSpec {
        name: "Qwen/Qwen2.5-72B-Instruct",
        provider: Provider::HuggingFace,
    },
    ModelSpec {
        name: "gemini-2.5-flash-image",
        provider: Provider::GoogleImage,
    },
];

fn available() -> String {
    MODEL_REGISTRY
        .iter()
        .map(|m| m.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Looks up a chat model. Unknown names and image-only models are rejected.
pub fn resolve_chat_model(name: &str) -> Result<&'static ModelSpec, AppError> {
    let spec = MODEL_REGISTRY
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| {
            AppError::Config(format!(
                "Model {name} not supported. Available models: {}",
                available()
            ))
        })?;

    if !spec.provider.is_chat() {
        return Err(AppError::Config(format!(
            "Model {name} is not configured as a chat model (provider={:?})",
            spec.provider
        )));
    }
    Ok(spec)
}

/// Looks up an image model. Only `Provider::GoogleImage` entries qualify.
pub fn resolve_image_model(name: &str) -> Result<&'static ModelSpec, AppError> {
    let spec = MODEL_REGISTRY
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| {
            AppError::Config(format!(
                "Model {name} not supported. Available models: {}",
                available()
            ))
        })?;

    if spec.provider != Provider::GoogleImage {
        return Err(AppError::Config(format!(
            "Model {name} is not configured as an image model (provider={:?})",
            spec.provider
        )));
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_registered() {
        assert!(resolve_chat_model(DEFAULT_STORY_MODEL).is_ok());
        assert!(resolve_chat_model(DEFAULT_POLISH_MODEL).is_ok());
        assert!(resolve_chat_model(DEFAULT_MODERATION_MODEL).is_ok());
        assert!(resolve_image_model(DEFAULT_IMAGE_MODEL).is_ok());
    }

    #[test]
    fn test_unknown_model_is_config_error() {
        let err = resolve_chat_model("gpt-imaginary").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("gpt-imaginary"));
    }

    #[test]
    fn test_image_model_rejected_as_chat_model() {
        assert!(matches!(
            resolve_chat_model(DEFAULT_IMAGE_MODEL),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_chat_model_rejected_as_image_model() {
        assert!(matches!(
            resolve_image_model(DEFAULT_STORY_MODEL),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_huggingface_model_resolves() {
        let spec = resolve_chat_model("Qwen/Qwen2.5-72B-Instruct").unwrap();
        assert_eq!(spec.provider, Provider::HuggingFace);
    }
}
