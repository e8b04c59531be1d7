//! Pipeline Orchestrator: template → outline → draft → polish → moderation →
//! illustration prompts → illustrations → optional audio → `StoryOutput`.
//!
//! Stages run strictly in sequence; each one is a typed function so callers
//! and tests can drive them individually.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::illustrations::{generate_illustrations, RunWorkspace};
use crate::generation::schemas::{
    IllustrationPrompt, IllustrationPrompts, ModerationResult, StoryMetadata, StoryOutline,
    StoryOutput, StoryTemplate,
};
use crate::generation::stage::{prompt_vars, Stage, StageChain};
use crate::llm_client::image::ImageModel;
use crate::llm_client::ChatModel;
use crate::prompt_store::PromptStore;

pub const STORY_TEMPERATURE: f64 = 0.7;
pub const POLISH_TEMPERATURE: f64 = 0.4;
pub const MODERATION_TEMPERATURE: f64 = 0.0;

/// Audio URI recorded when narration is requested. No audio is synthesized.
pub const TTS_PLACEHOLDER_URI: &str = "tts://audio/story_narration.mp3";

pub const MIN_AGE: u32 = 2;
pub const MAX_AGE: u32 = 12;
pub const MAX_LENGTH: u32 = 20;
pub const MAX_CHILD_NAME_CHARS: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request
// ────────────────────────────────────────────────────────────────────────────

/// Parameters for one story run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRequest {
    /// Comma-separated candidate themes; the template stage picks one.
    pub themes: String,
    pub child_name: String,
    pub age: u32,
    pub reading_level: String,
    /// Requested page count.
    pub length: u32,
    pub tone: String,
    /// Illustration art style.
    pub style: String,
    #[serde(default)]
    pub generate_tts: bool,
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub moral: Option<String>,
}

impl Default for StoryRequest {
    fn default() -> Self {
        Self {
            themes: String::new(),
            child_name: "Alex".to_string(),
            age: 5,
            reading_level: "beginner".to_string(),
            length: 10,
            tone: "warm".to_string(),
            style: "modern".to_string(),
            generate_tts: false,
            culture: None,
            moral: None,
        }
    }
}

impl StoryRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.themes.trim().is_empty() {
            return Err(AppError::Validation("themes must not be empty".to_string()));
        }
        let name = self.child_name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(
                "child_name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_CHILD_NAME_CHARS {
            return Err(AppError::Validation(format!(
                "child_name must be at most {MAX_CHILD_NAME_CHARS} characters"
            )));
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(AppError::Validation(format!(
                "age must be between {MIN_AGE} and {MAX_AGE}, got {}",
                self.age
            )));
        }
        if !(1..=MAX_LENGTH).contains(&self.length) {
            return Err(AppError::Validation(format!(
                "length must be between 1 and {MAX_LENGTH} pages, got {}",
                self.length
            )));
        }
        Ok(())
    }

    fn extra_metadata(&self) -> BTreeMap<String, Value> {
        [("culture", &self.culture), ("moral", &self.moral)]
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .map(|v| (key.to_string(), Value::String(v.clone())))
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Shared, immutable pipeline wiring. One instance serves any number of runs.
#[derive(Clone)]
pub struct StoryPipeline {
    story_model: Arc<dyn ChatModel>,
    polish_model: Arc<dyn ChatModel>,
    moderation_model: Arc<dyn ChatModel>,
    image_model: Arc<dyn ImageModel>,
    prompts: Arc<dyn PromptStore>,
    output_root: PathBuf,
}

impl StoryPipeline {
    pub fn new(
        story_model: Arc<dyn ChatModel>,
        polish_model: Arc<dyn ChatModel>,
        moderation_model: Arc<dyn ChatModel>,
        image_model: Arc<dyn ImageModel>,
        prompts: Arc<dyn PromptStore>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            story_model,
            polish_model,
            moderation_model,
            image_model,
            prompts,
            output_root: output_root.into(),
        }
    }

    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    fn chain<'a>(
        &'a self,
        stage: Stage,
        model: &'a dyn ChatModel,
        temperature: f64,
    ) -> StageChain<'a> {
        StageChain::new(stage, model, temperature, self.prompts.as_ref())
    }

    pub async fn run_template_stage(
        &self,
        request: &StoryRequest,
    ) -> Result<StoryTemplate, AppError> {
        info!("Step 1: Generating story template...");
        let template: StoryTemplate = self
            .chain(Stage::Template, self.story_model.as_ref(), STORY_TEMPERATURE)
            .run_structured(prompt_vars([
                ("themes", request.themes.clone()),
                ("age", request.age.to_string()),
            ]))
            .await?;
        info!(
            "Template selected: {} ({})",
            template.theme, template.template_id
        );
        Ok(template)
    }

    pub async fn run_outline_stage(
        &self,
        request: &StoryRequest,
        template: &StoryTemplate,
    ) -> Result<StoryOutline, AppError> {
        info!("Step 2: Creating story outline...");
        let outline: StoryOutline = self
            .chain(Stage::Outline, self.story_model.as_ref(), STORY_TEMPERATURE)
            .run_structured(prompt_vars([
                ("theme", template.theme.clone()),
                ("beats", template.beats.join(", ")),
                ("child_name", request.child_name.clone()),
                ("reading_level", request.reading_level.clone()),
                ("length", request.length.to_string()),
                ("tone", request.tone.clone()),
            ]))
            .await?;

        if outline.beats.len() != request.length as usize {
            warn!(
                "Outline has {} beats but {} were requested; using the outline as-is",
                outline.beats.len(),
                request.length
            );
        }
        info!(
            "Outline created: {} ({} beats)",
            outline.title,
            outline.beats.len()
        );
        Ok(outline)
    }

    pub async fn run_draft_stage(
        &self,
        request: &StoryRequest,
        outline: &StoryOutline,
    ) -> Result<String, AppError> {
        info!("Step 3: Writing draft...");
        self.chain(Stage::Draft, self.story_model.as_ref(), STORY_TEMPERATURE)
            .run_text(prompt_vars([
                ("title", outline.title.clone()),
                ("beats", outline.beats_as_lines()),
                ("child_name", request.child_name.clone()),
                ("length", request.length.to_string()),
                ("reading_level", request.reading_level.clone()),
            ]))
            .await
    }

    pub async fn run_polish_stage(
        &self,
        request: &StoryRequest,
        draft: &str,
    ) -> Result<String, AppError> {
        info!("Step 4: Polishing story...");
        self.chain(Stage::Polish, self.polish_model.as_ref(), POLISH_TEMPERATURE)
            .run_text(prompt_vars([
                ("draft", draft.to_string()),
                ("reading_level", request.reading_level.clone()),
                ("tone", request.tone.clone()),
            ]))
            .await
    }

    /// Fails the run with `ModerationRejected` unless the story is safe.
    pub async fn run_moderation_gate(&self, polished: &str) -> Result<ModerationResult, AppError> {
        info!("Step 5: Running content moderation...");
        let verdict: ModerationResult = self
            .chain(
                Stage::Moderation,
                self.moderation_model.as_ref(),
                MODERATION_TEMPERATURE,
            )
            .run_structured(prompt_vars([("story", polished.to_string())]))
            .await?;

        if !verdict.is_safe {
            let reason = verdict.reason_or_default().to_string();
            warn!("Story failed moderation: {}", reason);
            return Err(AppError::ModerationRejected { reason });
        }
        info!("Story passed moderation");
        Ok(verdict)
    }

    pub async fn run_illustration_prompt_stage(
        &self,
        request: &StoryRequest,
        polished: &str,
        outline: &StoryOutline,
    ) -> Result<IllustrationPrompts, AppError> {
        info!("Step 6: Generating illustration prompts...");
        let prompts: IllustrationPrompts = self
            .chain(
                Stage::IllustrationPrompts,
                self.story_model.as_ref(),
                STORY_TEMPERATURE,
            )
            .run_structured(prompt_vars([
                ("story", polished.to_string()),
                ("style", request.style.clone()),
                ("num_pages", outline.beats.len().to_string()),
            ]))
            .await?;
        Ok(IllustrationPrompts {
            prompts: keep_known_pages(prompts.prompts, outline),
        })
    }

    /// Runs the whole pipeline in a fresh run workspace under the output root.
    pub async fn generate_story(&self, request: &StoryRequest) -> Result<StoryOutput, AppError> {
        let workspace = RunWorkspace::new(&self.output_root);
        self.generate_story_in(request, &workspace).await
    }

    pub async fn generate_story_in(
        &self,
        request: &StoryRequest,
        workspace: &RunWorkspace,
    ) -> Result<StoryOutput, AppError> {
        request.validate()?;
        info!(
            "Starting story run {} (themes: {}, {} pages)",
            workspace.run_id(),
            request.themes,
            request.length
        );

        let template = self.run_template_stage(request).await?;
        let outline = self.run_outline_stage(request, &template).await?;
        let draft = self.run_draft_stage(request, &outline).await?;
        let polished = self.run_polish_stage(request, &draft).await?;
        self.run_moderation_gate(&polished).await?;
        let prompts = self
            .run_illustration_prompt_stage(request, &polished, &outline)
            .await?;

        info!("Step 6b: Generating illustration images...");
        let report = generate_illustrations(
            self.image_model.as_ref(),
            &prompts.prompts,
            &outline.summary(),
            workspace,
        )
        .await?;

        let audio = if request.generate_tts {
            info!("Step 7 ({}): attaching narration placeholder", Stage::Audio);
            Some(TTS_PLACEHOLDER_URI.to_string())
        } else {
            None
        };

        let metadata = StoryMetadata {
            theme: Some(template.theme),
            tone: Some(request.tone.clone()),
            reading_level: Some(request.reading_level.clone()),
            length: Some(request.length),
            illustration_prompts: prompts
                .prompts
                .into_iter()
                .map(|p| (p.page, p.prompt))
                .collect(),
            skipped_illustrations: report.skipped,
            run_id: Some(workspace.run_id().to_string()),
            extra: request.extra_metadata(),
        };

        info!("Story generation complete: {}", outline.title);
        Ok(StoryOutput {
            title: outline.title.clone(),
            outline,
            draft,
            story_final: polished,
            illustrations: report.illustrations,
            audio,
            metadata,
        })
    }
}

/// Drops prompts whose page is not in the outline (page 0 included) and
/// repeats of a page already seen. The first prompt for a page wins.
fn keep_known_pages(
    prompts: Vec<IllustrationPrompt>,
    outline: &StoryOutline,
) -> Vec<IllustrationPrompt> {
    let mut seen = BTreeSet::new();
    prompts
        .into_iter()
        .filter(|p| {
            if !outline.has_page(p.page) {
                warn!(
                    "Dropping illustration prompt for page {} (outline has {} pages)",
                    p.page,
                    outline.beats.len()
                );
                return false;
            }
            if !seen.insert(p.page) {
                warn!("Dropping duplicate illustration prompt for page {}", p.page);
                return false;
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::illustrations::resolve_artifact_uri;
    use crate::llm_client::fakes::{ScriptedChatModel, ScriptedImageModel};
    use crate::llm_client::image::ImageResponse;
    use crate::llm_client::LlmError;
    use crate::prompt_store::{PromptRole, StaticPromptStore};

    const TEMPLATE_JSON: &str =
        r#"{"theme": "courage", "template_id": "brave-lantern", "beats": ["lost", "search", "found"]}"#;

    fn outline_json(pages: u32) -> String {
        let beats: Vec<String> = (1..=pages)
            .map(|p| format!(r#"{{"page": {p}, "summary": "Beat {p}"}}"#))
            .collect();
        format!(
            r#"{{"title": "Mia and the Lantern", "beats": [{}], "vocabulary_targets": ["glow"]}}"#,
            beats.join(", ")
        )
    }

    fn prompts_json(pages: &[u32]) -> String {
        let prompts: Vec<String> = pages
            .iter()
            .map(|p| format!(r#"{{"page": {p}, "prompt": "Picture {p}"}}"#))
            .collect();
        format!(r#"{{"prompts": [{}]}}"#, prompts.join(", "))
    }

    fn png(tag: u8) -> Result<ImageResponse, LlmError> {
        Ok(ImageResponse::with_image("image/png", vec![0x89, b'P', tag]))
    }

    struct Harness {
        story: Arc<ScriptedChatModel>,
        polish: Arc<ScriptedChatModel>,
        moderation: Arc<ScriptedChatModel>,
        image: Arc<ScriptedImageModel>,
        pipeline: StoryPipeline,
        tmp: tempfile::TempDir,
    }

    fn harness_with(
        story_replies: Vec<String>,
        moderation_reply: &str,
        images: Vec<Result<ImageResponse, LlmError>>,
        prompts: StaticPromptStore,
    ) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let story = Arc::new(ScriptedChatModel::new(
            "story",
            story_replies.into_iter().map(Ok).collect(),
        ));
        let polish = Arc::new(ScriptedChatModel::replying("polish", &["Polished story."]));
        let moderation = Arc::new(ScriptedChatModel::replying("moderation", &[moderation_reply]));
        let image = Arc::new(ScriptedImageModel::new(images));

        let pipeline = StoryPipeline::new(
            story.clone(),
            polish.clone(),
            moderation.clone(),
            image.clone(),
            Arc::new(prompts),
            tmp.path(),
        );
        Harness {
            story,
            polish,
            moderation,
            image,
            pipeline,
            tmp,
        }
    }

    fn harness(pages: u32, moderation_reply: &str) -> Harness {
        let all: Vec<u32> = (1..=pages).collect();
        harness_with(
            vec![
                TEMPLATE_JSON.to_string(),
                outline_json(pages),
                "Draft story.".to_string(),
                prompts_json(&all),
            ],
            moderation_reply,
            (1..=pages).map(|p| png(p as u8)).collect(),
            StaticPromptStore::builtin(),
        )
    }

    fn request(length: u32) -> StoryRequest {
        StoryRequest {
            themes: "courage, friendship".to_string(),
            child_name: "Mia".to_string(),
            age: 6,
            length,
            ..StoryRequest::default()
        }
    }

    const SAFE: &str = r#"{"is_safe": true, "reason": null}"#;

    #[tokio::test]
    async fn test_full_run_assembles_story_output() {
        let h = harness(3, SAFE);
        let mut req = request(3);
        req.culture = Some("Nordic".to_string());
        req.moral = Some("Be brave".to_string());

        let story = h.pipeline.generate_story(&req).await.unwrap();

        assert_eq!(story.title, "Mia and the Lantern");
        assert_eq!(story.draft, "Draft story.");
        assert_eq!(story.story_final, "Polished story.");
        assert_eq!(story.audio, None);
        assert_eq!(story.illustrations.len(), 3);
        assert!(story.outline.vocabulary_targets.contains("glow"));

        let meta = &story.metadata;
        assert_eq!(meta.theme.as_deref(), Some("courage"));
        assert_eq!(meta.tone.as_deref(), Some("warm"));
        assert_eq!(meta.reading_level.as_deref(), Some("beginner"));
        assert_eq!(meta.length, Some(3));
        assert_eq!(meta.illustration_prompts[&2], "Picture 2");
        assert!(meta.skipped_illustrations.is_empty());
        assert_eq!(meta.extra["culture"], Value::String("Nordic".to_string()));
        assert_eq!(meta.extra["moral"], Value::String("Be brave".to_string()));

        let run_id = meta.run_id.clone().unwrap();
        let run_dir = h.tmp.path().join("runs").join(&run_id);
        for uri in story.illustrations.values() {
            assert!(uri.starts_with("image://"));
            assert!(resolve_artifact_uri(uri).starts_with(&run_dir));
        }

        assert_eq!(h.story.call_count(), 4);
        assert_eq!(h.polish.call_count(), 1);
        assert_eq!(h.moderation.call_count(), 1);
        assert_eq!(h.image.call_count(), 3);
    }

    #[tokio::test]
    async fn test_stage_temperatures_and_wiring() {
        let h = harness(2, SAFE);
        h.pipeline.generate_story(&request(2)).await.unwrap();

        let story_reqs = h.story.requests.lock().unwrap();
        assert!(story_reqs
            .iter()
            .all(|r| (r.temperature - STORY_TEMPERATURE).abs() < f64::EPSILON));
        // outline receives comma-joined template beats
        assert!(story_reqs[1].user.contains("lost, search, found"));
        // draft receives "Page N: summary" lines
        assert!(story_reqs[2].user.contains("Page 1: Beat 1\nPage 2: Beat 2"));
        // illustration prompts are sized from the outline
        assert!(story_reqs[3].user.contains("Number of pages: 2"));
        assert!(story_reqs[3].user.contains("Polished story."));

        let polish_reqs = h.polish.requests.lock().unwrap();
        assert!((polish_reqs[0].temperature - POLISH_TEMPERATURE).abs() < f64::EPSILON);
        assert!(polish_reqs[0].user.contains("Draft story."));

        let moderation_reqs = h.moderation.requests.lock().unwrap();
        assert_eq!(moderation_reqs[0].temperature, MODERATION_TEMPERATURE);
        assert!(moderation_reqs[0].user.contains("Polished story."));
    }

    #[tokio::test]
    async fn test_outline_length_matches_request() {
        for length in [1, 5, 12] {
            let h = harness(length, SAFE);
            let story = h.pipeline.generate_story(&request(length)).await.unwrap();
            assert_eq!(story.outline.beats.len(), length as usize);
            let pages: Vec<u32> = story.outline.beats.iter().map(|b| b.page).collect();
            assert_eq!(pages, (1..=length).collect::<Vec<_>>());

            let story_reqs = h.story.requests.lock().unwrap();
            assert!(story_reqs[1].user.contains(&format!("exactly {length} beats")));
        }
    }

    #[tokio::test]
    async fn test_moderation_rejection_stops_run() {
        let h = harness(3, r#"{"is_safe": false, "reason": "violence"}"#);

        let err = h.pipeline.generate_story(&request(3)).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("failed moderation"));
        assert!(msg.contains("violence"));
        assert!(err.is_moderation_rejection());

        // no illustration prompts, no images
        assert_eq!(h.story.call_count(), 3);
        assert_eq!(h.image.call_count(), 0);
        assert!(!h.tmp.path().join("runs").exists());
    }

    #[tokio::test]
    async fn test_malformed_outline_is_stage_attributed() {
        let h = harness_with(
            vec![TEMPLATE_JSON.to_string(), "not json at all".to_string()],
            SAFE,
            vec![],
            StaticPromptStore::builtin(),
        );

        let err = h.pipeline.generate_story(&request(3)).await.unwrap_err();
        assert!(matches!(err, AppError::Schema { stage: Stage::Outline, .. }));
        assert_eq!(h.polish.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_prompt_fails_before_any_model_call() {
        let h = harness_with(
            vec![TEMPLATE_JSON.to_string()],
            SAFE,
            vec![],
            StaticPromptStore::builtin().without(PromptRole::System, "template"),
        );

        let err = h.pipeline.generate_story(&request(3)).await.unwrap_err();
        assert!(matches!(err, AppError::PromptNotFound { .. }));
        assert_eq!(h.story.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let h = harness(3, SAFE);
        let mut req = request(3);
        req.age = 1;

        let err = h.pipeline.generate_story(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(h.story.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_image_is_recorded_as_skipped() {
        let h = harness_with(
            vec![
                TEMPLATE_JSON.to_string(),
                outline_json(3),
                "Draft story.".to_string(),
                prompts_json(&[1, 2, 3]),
            ],
            SAFE,
            vec![png(1), Err(LlmError::EmptyContent), png(3)],
            StaticPromptStore::builtin(),
        );

        let story = h.pipeline.generate_story(&request(3)).await.unwrap();
        assert_eq!(story.illustrations.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(story.metadata.skipped_illustrations.len(), 1);
        assert_eq!(story.metadata.skipped_illustrations[0].page, 2);
    }

    #[tokio::test]
    async fn test_prompts_for_unknown_pages_are_dropped() {
        let h = harness_with(
            vec![
                TEMPLATE_JSON.to_string(),
                outline_json(2),
                "Draft story.".to_string(),
                prompts_json(&[1, 2, 7]),
            ],
            SAFE,
            vec![png(1), png(2)],
            StaticPromptStore::builtin(),
        );

        let story = h.pipeline.generate_story(&request(2)).await.unwrap();
        assert_eq!(h.image.call_count(), 2);
        assert!(!story.metadata.illustration_prompts.contains_key(&7));
        assert!(story.illustrations.keys().all(|p| story.outline.has_page(*p)));
    }

    #[tokio::test]
    async fn test_page_zero_and_duplicate_prompts_are_dropped() {
        let prompts = r#"{"prompts": [
            {"page": 0, "prompt": "Cover art"},
            {"page": 1, "prompt": "Picture 1"},
            {"page": 2, "prompt": "Picture 2"},
            {"page": 2, "prompt": "Second take on 2"}
        ]}"#;
        let h = harness_with(
            vec![
                TEMPLATE_JSON.to_string(),
                outline_json(2),
                "Draft story.".to_string(),
                prompts.to_string(),
            ],
            SAFE,
            vec![png(1), png(2)],
            StaticPromptStore::builtin(),
        );

        let story = h.pipeline.generate_story(&request(2)).await.unwrap();
        assert_eq!(h.image.call_count(), 2);
        let kept = &story.metadata.illustration_prompts;
        assert_eq!(kept.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(kept[&2], "Picture 2");
        assert_eq!(story.illustrations.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_tts_sets_placeholder_audio() {
        let h = harness(1, SAFE);
        let mut req = request(1);
        req.generate_tts = true;

        let story = h.pipeline.generate_story(&req).await.unwrap();
        assert_eq!(story.audio.as_deref(), Some(TTS_PLACEHOLDER_URI));
    }

    #[tokio::test]
    async fn test_model_failure_in_polish_is_attributed() {
        let tmp = tempfile::tempdir().unwrap();
        let story = Arc::new(ScriptedChatModel::new(
            "story",
            vec![
                Ok(TEMPLATE_JSON.to_string()),
                Ok(outline_json(2)),
                Ok("Draft".to_string()),
            ],
        ));
        let polish = Arc::new(ScriptedChatModel::new(
            "polish",
            vec![Err(LlmError::RateLimited { retries: 3 })],
        ));
        let moderation = Arc::new(ScriptedChatModel::replying("moderation", &[SAFE]));
        let pipeline = StoryPipeline::new(
            story,
            polish,
            moderation.clone(),
            Arc::new(ScriptedImageModel::new(vec![])),
            Arc::new(StaticPromptStore::builtin()),
            tmp.path(),
        );

        let err = pipeline.generate_story(&request(2)).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Polish));
        assert_eq!(moderation.call_count(), 0);
    }

    #[test]
    fn test_request_validation_bounds() {
        assert!(request(5).validate().is_ok());
        assert!(request(20).validate().is_ok());
        assert!(request(0).validate().is_err());
        assert!(request(21).validate().is_err());

        let mut req = request(5);
        req.age = 13;
        assert!(req.validate().is_err());

        let mut req = request(5);
        req.themes = "   ".to_string();
        assert!(req.validate().is_err());

        let mut req = request(5);
        req.child_name = "x".repeat(51);
        assert!(req.validate().is_err());
    }
}
