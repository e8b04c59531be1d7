//! Stage Chain. One generative call: render prompts → call model → parse.
//!
//! Both prompts are resolved before the model is touched, so a missing prompt
//! never costs a network call. Nothing here retries; a bad structured response
//! is a hard `AppError::Schema` carrying the stage and the raw text.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::AppError;
use crate::generation::schemas::StructuredOutput;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{strip_json_fences, ChatModel, ChatRequest};
use crate::prompt_store::{PromptRole, PromptStore};

/// Pipeline stages, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Template,
    Outline,
    Draft,
    Polish,
    Moderation,
    IllustrationPrompts,
    Illustrations,
    Audio,
}

impl Stage {
    /// Stages that render prompts from the prompt store.
    pub const TEXT_STAGES: [Stage; 6] = [
        Stage::Template,
        Stage::Outline,
        Stage::Draft,
        Stage::Polish,
        Stage::Moderation,
        Stage::IllustrationPrompts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Template => "template",
            Stage::Outline => "outline",
            Stage::Draft => "draft",
            Stage::Polish => "polish",
            Stage::Moderation => "moderation",
            Stage::IllustrationPrompts => "illustration_prompts",
            Stage::Illustrations => "illustrations",
            Stage::Audio => "audio",
        }
    }

    /// Name under which the stage's prompts are stored.
    pub fn prompt_name(self) -> &'static str {
        match self {
            Stage::IllustrationPrompts => "illustration",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named values substituted into `{name}` placeholders.
pub type PromptVars = BTreeMap<String, String>;

pub fn prompt_vars<const N: usize>(pairs: [(&str, String); N]) -> PromptVars {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Single-pass `{name}` substitution. Unknown placeholders and stray braces are
/// kept verbatim; substituted values are never re-scanned.
pub fn render_template(template: &str, vars: &PromptVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => match vars.get(&after[..close]) {
                Some(value) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            },
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// One configured stage: which model, at what temperature, with which prompts.
pub struct StageChain<'a> {
    pub stage: Stage,
    pub model: &'a dyn ChatModel,
    pub temperature: f64,
    pub prompts: &'a dyn PromptStore,
}

impl<'a> StageChain<'a> {
    pub fn new(
        stage: Stage,
        model: &'a dyn ChatModel,
        temperature: f64,
        prompts: &'a dyn PromptStore,
    ) -> Self {
        Self {
            stage,
            model,
            temperature,
            prompts,
        }
    }

    fn render(&self, vars: &PromptVars) -> Result<ChatRequest, AppError> {
        let name = self.stage.prompt_name();
        let system = self.prompts.get(PromptRole::System, name)?;
        let user = self.prompts.get(PromptRole::User, name)?;

        Ok(ChatRequest {
            system: render_template(&system, vars),
            user: render_template(&user, vars),
            temperature: self.temperature,
        })
    }

    async fn invoke(&self, vars: &PromptVars) -> Result<String, AppError> {
        let request = self.render(vars)?;
        debug!(
            "Stage {} → {} (temperature {})",
            self.stage,
            self.model.model_name(),
            self.temperature
        );

        self.model.complete(&request).await.map_err(|source| {
            error!("Stage {} model call failed: {}", self.stage, source);
            AppError::Llm {
                stage: self.stage,
                source,
            }
        })
    }

    /// Runs the stage and returns the raw model text.
    pub async fn run_text(&self, vars: PromptVars) -> Result<String, AppError> {
        let text = self.invoke(&vars).await?;
        Ok(text.trim().to_string())
    }

    /// Runs the stage with `{format_instructions}` for `T`, then parses and
    /// validates the response.
    pub async fn run_structured<T: StructuredOutput>(
        &self,
        mut vars: PromptVars,
    ) -> Result<T, AppError> {
        vars.insert(
            "format_instructions".to_string(),
            format!("{JSON_ONLY_INSTRUCTION}\n\n{}", T::FORMAT),
        );
        let raw = self.invoke(&vars).await?;
        parse_structured(self.stage, &raw)
    }
}

/// Parses and validates a structured stage response.
pub fn parse_structured<T: StructuredOutput>(stage: Stage, raw: &str) -> Result<T, AppError> {
    let value: T = serde_json::from_str(strip_json_fences(raw)).map_err(|e| {
        error!("Stage {stage} returned unparsable output: {e}");
        debug!("Stage {stage} raw output:\n{raw}");
        AppError::Schema {
            stage,
            detail: e.to_string(),
            raw: raw.to_string(),
        }
    })?;

    value.validate().map_err(|detail| {
        error!("Stage {stage} output failed validation: {detail}");
        debug!("Stage {stage} raw output:\n{raw}");
        AppError::Schema {
            stage,
            detail,
            raw: raw.to_string(),
        }
    })?;

    Ok(value)
}
