//! Story data model: every structure a stage produces plus the final
//! `StoryOutput` aggregate.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::generation::prompts::{
    ILLUSTRATION_FORMAT, MODERATION_FORMAT, OUTLINE_FORMAT, TEMPLATE_FORMAT,
};

/// A stage output parsed from model JSON. `validate` runs right after parsing;
/// an `Err` is reported as a schema error for the stage.
pub trait StructuredOutput: DeserializeOwned {
    /// JSON shape description injected as `{format_instructions}`.
    const FORMAT: &'static str;

    fn validate(&self) -> Result<(), String>;
}

// ────────────────────────────────────────────────────────────────────────────
// Stage outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryTemplate {
    pub theme: String,
    pub template_id: String,
    pub beats: Vec<String>,
}

impl StructuredOutput for StoryTemplate {
    const FORMAT: &'static str = TEMPLATE_FORMAT;

    fn validate(&self) -> Result<(), String> {
        if self.theme.trim().is_empty() {
            return Err("template theme is empty".to_string());
        }
        if self.template_id.trim().is_empty() {
            return Err("template_id is empty".to_string());
        }
        if self.beats.is_empty() {
            return Err("template has no beats".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryBeat {
    pub page: u32,
    pub summary: String,
}

/// Page-by-page plan. Pages are `1..=N` in ascending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryOutline {
    pub title: String,
    pub beats: Vec<StoryBeat>,
    #[serde(default)]
    pub vocabulary_targets: BTreeSet<String>,
}

impl StoryOutline {
    /// `"Page N: summary"` lines, the form the draft stage consumes.
    pub fn beats_as_lines(&self) -> String {
        self.beats
            .iter()
            .map(|b| format!("Page {}: {}", b.page, b.summary))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All beat summaries joined with `"; "`.
    pub fn summary(&self) -> String {
        self.beats
            .iter()
            .map(|b| b.summary.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn has_page(&self, page: u32) -> bool {
        self.beats.iter().any(|b| b.page == page)
    }
}

impl StructuredOutput for StoryOutline {
    const FORMAT: &'static str = OUTLINE_FORMAT;

    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("outline title is empty".to_string());
        }
        if self.beats.is_empty() {
            return Err("outline has no beats".to_string());
        }
        for (idx, beat) in self.beats.iter().enumerate() {
            let expected = idx as u32 + 1;
            if beat.page != expected {
                return Err(format!(
                    "outline pages must run 1..={} in order; position {} has page {}",
                    self.beats.len(),
                    expected,
                    beat.page
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllustrationPrompt {
    pub page: u32,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllustrationPrompts {
    pub prompts: Vec<IllustrationPrompt>,
}

impl StructuredOutput for IllustrationPrompts {
    const FORMAT: &'static str = ILLUSTRATION_FORMAT;

    /// Page numbers are reconciled against the outline by the pipeline, which
    /// drops what it cannot use.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub is_safe: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ModerationResult {
    pub fn reason_or_default(&self) -> &str {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("no reason given")
    }
}

impl StructuredOutput for ModerationResult {
    const FORMAT: &'static str = MODERATION_FORMAT;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Final aggregate
// ────────────────────────────────────────────────────────────────────────────

/// A page whose illustration could not be generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPage {
    pub page: u32,
    pub reason: String,
}

/// Cross-cutting values about a story. Typed fields for everything the
/// pipeline and renderer use; `extra` for caller-supplied extension data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Page → illustration prompt text.
    #[serde(default)]
    pub illustration_prompts: BTreeMap<u32, String>,
    #[serde(default)]
    pub skipped_illustrations: Vec<SkippedPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Terminal artifact of a successful run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryOutput {
    pub title: String,
    pub outline: StoryOutline,
    pub draft: String,
    pub story_final: String,
    /// Page → artifact URI; keys are a subset of the outline pages.
    #[serde(default)]
    pub illustrations: BTreeMap<u32, String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub metadata: StoryMetadata,
}
