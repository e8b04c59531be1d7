//! Prompt Resolver: maps `(role, stage name)` to prompt text.
//!
//! Pure lookup: a missing prompt is `AppError::PromptNotFound`, nothing more.
//! Stores are read-only once built and can be shared across runs without locking.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptRole {
    System,
    User,
}

impl PromptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptRole::System => "system",
            PromptRole::User => "user",
        }
    }
}

impl fmt::Display for PromptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait PromptStore: Send + Sync {
    fn get(&self, role: PromptRole, name: &str) -> Result<String, AppError>;
}

/// Reads `<base_dir>/<role>/<name>.txt` on every lookup.
#[derive(Debug, Clone)]
pub struct FsPromptStore {
    base_dir: PathBuf,
}

impl FsPromptStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl PromptStore for FsPromptStore {
    fn get(&self, role: PromptRole, name: &str) -> Result<String, AppError> {
        let path = self
            .base_dir
            .join(role.as_str())
            .join(format!("{name}.txt"));

        if !path.is_file() {
            debug!("Prompt file not found: {}", path.display());
            return Err(AppError::PromptNotFound {
                role,
                name: name.to_string(),
            });
        }

        std::fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("Failed to read prompt {}: {e}", path.display()))
        })
    }
}

/// In-memory prompt table.
#[derive(Debug, Clone, Default)]
pub struct StaticPromptStore {
    prompts: HashMap<(PromptRole, String), String>,
}

/// Default prompts compiled into the binary: (name, system, user).
const BUILTIN_PROMPTS: &[(&str, &str, &str)] = &[
    (
        "template",
        include_str!("../prompts/system/template.txt"),
        include_str!("../prompts/user/template.txt"),
    ),
    (
        "outline",
        include_str!("../prompts/system/outline.txt"),
        include_str!("../prompts/user/outline.txt"),
    ),
    (
        "draft",
        include_str!("../prompts/system/draft.txt"),
        include_str!("../prompts/user/draft.txt"),
    ),
    (
        "polish",
        include_str!("../prompts/system/polish.txt"),
        include_str!("../prompts/user/polish.txt"),
    ),
    (
        "moderation",
        include_str!("../prompts/system/moderation.txt"),
        include_str!("../prompts/user/moderation.txt"),
    ),
    (
        "illustration",
        include_str!("../prompts/system/illustration.txt"),
        include_str!("../prompts/user/illustration.txt"),
    ),
];

impl StaticPromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The prompts shipped in `prompts/`.
    pub fn builtin() -> Self {
        let mut store = Self::new();
        for (name, system, user) in BUILTIN_PROMPTS {
            store.insert(PromptRole::System, name, *system);
            store.insert(PromptRole::User, name, *user);
        }
        store
    }

    pub fn insert(&mut self, role: PromptRole, name: &str, text: impl Into<String>) {
        self.prompts.insert((role, name.to_string()), text.into());
    }

    #[cfg(test)]
    pub fn without(mut self, role: PromptRole, name: &str) -> Self {
        self.prompts.remove(&(role, name.to_string()));
        self
    }
}

impl PromptStore for StaticPromptStore {
    fn get(&self, role: PromptRole, name: &str) -> Result<String, AppError> {
        self.prompts
            .get(&(role, name.to_string()))
            .cloned()
            .ok_or_else(|| AppError::PromptNotFound {
                role,
                name: name.to_string(),
            })
    }
}
