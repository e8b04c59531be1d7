use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::llm_client::models::{
    DEFAULT_IMAGE_MODEL, DEFAULT_MODERATION_MODEL, DEFAULT_POLISH_MODEL, DEFAULT_STORY_MODEL,
};

/// Application configuration loaded from environment variables.
///
/// API keys are optional here; `AppState::build` fails fast when a selected
/// model needs a key that is not set.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: Option<String>,
    pub hf_token: Option<String>,
    pub story_model: String,
    pub polish_model: String,
    pub moderation_model: String,
    pub image_model: String,
    /// Directory holding `system/<stage>.txt` and `user/<stage>.txt`.
    /// Built-in prompts are used when unset.
    pub prompts_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub gemini_base_url: Option<String>,
    pub hf_base_url: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_api_key: optional_env("GOOGLE_API_KEY"),
            hf_token: optional_env("HF_TOKEN"),
            story_model: env_or("STORY_MODEL", DEFAULT_STORY_MODEL),
            polish_model: env_or("POLISH_MODEL", DEFAULT_POLISH_MODEL),
            moderation_model: env_or("MODERATION_MODEL", DEFAULT_MODERATION_MODEL),
            image_model: env_or("IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            prompts_dir: optional_env("PROMPTS_DIR").map(PathBuf::from),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "./generated")),
            llm_timeout_secs: env_or("LLM_TIMEOUT_SECS", "120")
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            llm_max_retries: env_or("LLM_MAX_RETRIES", "3")
                .parse::<u32>()
                .context("LLM_MAX_RETRIES must be a non-negative integer")?,
            gemini_base_url: optional_env("GEMINI_BASE_URL"),
            hf_base_url: optional_env("HF_BASE_URL"),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}
