use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::errors::AppError;
use crate::generation::stage::Stage;
use crate::generation::StoryPipeline;
use crate::llm_client::image::ImageClient;
use crate::llm_client::models::{resolve_chat_model, resolve_image_model, ModelSpec, Provider};
use crate::llm_client::{HttpSettings, LlmClient};
use crate::prompt_store::{FsPromptStore, PromptRole, PromptStore, StaticPromptStore};

/// Everything a command needs, built once from `Config` and passed by reference.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: StoryPipeline,
}

impl AppState {
    /// Resolves every configured model against the registry and builds the
    /// clients. Fails fast on unknown models, missing credentials or an
    /// incomplete prompt directory.
    pub fn build(config: &Config) -> Result<Self, AppError> {
        let settings = HttpSettings {
            timeout: Duration::from_secs(config.llm_timeout_secs),
            max_retries: config.llm_max_retries,
        };

        let story = chat_client(config, &config.story_model, &settings)?;
        let polish = chat_client(config, &config.polish_model, &settings)?;
        let moderation = chat_client(config, &config.moderation_model, &settings)?;

        let image_spec = resolve_image_model(&config.image_model)?;
        let image = ImageClient::new(
            image_spec,
            api_key_for(config, image_spec)?,
            config.gemini_base_url.clone(),
            &settings,
        );

        let prompts: Arc<dyn PromptStore> = match &config.prompts_dir {
            Some(dir) => {
                info!("Using prompts from {}", dir.display());
                Arc::new(FsPromptStore::new(dir))
            }
            None => Arc::new(StaticPromptStore::builtin()),
        };
        for stage in Stage::TEXT_STAGES {
            prompts.get(PromptRole::System, stage.prompt_name())?;
            prompts.get(PromptRole::User, stage.prompt_name())?;
        }

        info!(
            "Models: story={} polish={} moderation={} image={}",
            config.story_model, config.polish_model, config.moderation_model, config.image_model
        );

        let pipeline = StoryPipeline::new(
            Arc::new(story),
            Arc::new(polish),
            Arc::new(moderation),
            Arc::new(image),
            prompts,
            config.output_dir.clone(),
        );

        Ok(Self {
            config: config.clone(),
            pipeline,
        })
    }
}

fn chat_client(
    config: &Config,
    name: &str,
    settings: &HttpSettings,
) -> Result<LlmClient, AppError> {
    let spec = resolve_chat_model(name)?;
    let base_url = match spec.provider {
        Provider::HuggingFace => config.hf_base_url.clone(),
        Provider::Google | Provider::GoogleImage => config.gemini_base_url.clone(),
    };
    Ok(LlmClient::new(
        spec,
        api_key_for(config, spec)?,
        base_url,
        settings,
    ))
}

fn api_key_for(config: &Config, spec: &ModelSpec) -> Result<String, AppError> {
    match spec.provider {
        Provider::Google | Provider::GoogleImage => {
            config.google_api_key.clone().ok_or_else(|| {
                AppError::Config(format!(
                    "GOOGLE_API_KEY must be set to use Google model {}",
                    spec.name
                ))
            })
        }
        Provider::HuggingFace => config.hf_token.clone().ok_or_else(|| {
            AppError::Config(format!(
                "HF_TOKEN must be set to use Hugging Face model {}",
                spec.name
            ))
        }),
    }
}
