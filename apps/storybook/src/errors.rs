use thiserror::Error;

use crate::generation::stage::Stage;
use crate::llm_client::LlmError;
use crate::prompt_store::PromptRole;

/// Application-level error type.
///
/// A pipeline caller receives either a complete `StoryOutput` or exactly one of
/// these. Per-page image failures and broken artwork at render time are
/// recoverable and never surface here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt not found: {role}/{name}")]
    PromptNotFound { role: PromptRole, name: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Stage '{stage}' returned malformed output: {detail}")]
    Schema {
        stage: Stage,
        detail: String,
        raw: String,
    },

    #[error("Story failed moderation: {reason}")]
    ModerationRejected { reason: String },

    #[error("Stage '{stage}' model call failed: {source}")]
    Llm {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The pipeline stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AppError::Schema { stage, .. } | AppError::Llm { stage, .. } => Some(*stage),
            AppError::ModerationRejected { .. } => Some(Stage::Moderation),
            AppError::Storage(_) => Some(Stage::Illustrations),
            _ => None,
        }
    }

    /// Moderation rejection is a legitimate pipeline outcome, not a bug.
    pub fn is_moderation_rejection(&self) -> bool {
        matches!(self, AppError::ModerationRejected { .. })
    }
}

/// Tagged outcome of a unit of pipeline work.
///
/// `Fatal` ends the run; `PageSkipped` leaves one page without artwork and the
/// run continues.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Ok(T),
    Fatal { stage: Stage, detail: String },
    PageSkipped { page: u32, detail: String },
}
