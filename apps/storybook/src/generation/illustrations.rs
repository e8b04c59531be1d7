//! Illustration Consistency Generator.
//!
//! Pages are illustrated one at a time in ascending page order. The last two
//! successful images ride along with every later request so recurring
//! characters keep their look. A page that yields no image is skipped; only a
//! broken run directory stops the loop.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{AppError, StageOutcome};
use crate::generation::prompts::CONSISTENCY_DIRECTIVE;
use crate::generation::schemas::{IllustrationPrompt, SkippedPage};
use crate::generation::stage::Stage;
use crate::llm_client::image::{ContentPart, ImageModel};

/// Scheme prefix for artifact URIs recorded in `StoryOutput::illustrations`.
pub const IMAGE_URI_SCHEME: &str = "image://";

/// Number of recent images fed back into each request.
pub const CONSISTENCY_WINDOW_SIZE: usize = 2;

// ────────────────────────────────────────────────────────────────────────────
// Run workspace
// ────────────────────────────────────────────────────────────────────────────

/// Artifact location for one run: `<output_root>/runs/<run_id>/`.
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    run_id: String,
    dir: PathBuf,
}

impl RunWorkspace {
    /// Fresh workspace with a `YYYYmmdd_HHMMSS_<uuid>` run id.
    pub fn new(output_root: &Path) -> Self {
        let run_id = format!(
            "{}_{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            Uuid::new_v4()
        );
        Self::with_run_id(output_root, run_id)
    }

    pub fn with_run_id(output_root: &Path, run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let dir = output_root.join("runs").join(&run_id);
        Self { run_id, dir }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn illustrations_dir(&self) -> PathBuf {
        self.dir.join("illustrations")
    }

    /// Creates the run directory tree if it is missing.
    pub async fn prepare(&self) -> Result<PathBuf, AppError> {
        let dir = self.illustrations_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Storage(format!(
                "Cannot create illustration directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(dir)
    }
}

pub fn image_uri(path: &Path) -> String {
    format!("{IMAGE_URI_SCHEME}{}", path.display())
}

/// Maps an artifact URI (`image://<path>` or a plain path) to a file path.
pub fn resolve_artifact_uri(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix(IMAGE_URI_SCHEME).unwrap_or(uri))
}

// ────────────────────────────────────────────────────────────────────────────
// Consistency window
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct WindowEntry {
    pub page: u32,
    pub path: PathBuf,
    pub mime_type: String,
    pub data: Bytes,
}

/// The most recent successful artifacts, oldest first. Bounded; pushing past
/// capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct ConsistencyWindow {
    capacity: usize,
    entries: VecDeque<WindowEntry>,
}

impl Default for ConsistencyWindow {
    fn default() -> Self {
        Self::with_capacity(CONSISTENCY_WINDOW_SIZE)
    }
}

impl ConsistencyWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, entry: WindowEntry) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pages(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.page).collect()
    }

    /// Inline image parts for the window, oldest first.
    pub fn image_parts(&self) -> Vec<ContentPart> {
        self.entries
            .iter()
            .map(|e| ContentPart::Image {
                mime_type: e.mime_type.clone(),
                data: e.data.clone(),
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation loop
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IllustrationReport {
    /// Page → `image://` URI.
    pub illustrations: BTreeMap<u32, String>,
    pub skipped: Vec<SkippedPage>,
}

/// Text sent with every page request.
pub fn composite_instruction(story_summary: &str, page_prompt: &str) -> String {
    [
        "High-level story summary:",
        story_summary,
        "",
        "Current page illustration instructions:",
        page_prompt,
        "",
        CONSISTENCY_DIRECTIVE,
    ]
    .join("\n")
}

/// Illustrates every prompt in ascending page order.
pub async fn generate_illustrations(
    model: &dyn ImageModel,
    prompts: &[IllustrationPrompt],
    story_summary: &str,
    workspace: &RunWorkspace,
) -> Result<IllustrationReport, AppError> {
    let dir = workspace.prepare().await?;

    let mut ordered: Vec<&IllustrationPrompt> = prompts.iter().collect();
    ordered.sort_by_key(|p| p.page);

    let mut window = ConsistencyWindow::default();
    let mut report = IllustrationReport::default();

    for prompt in ordered {
        match illustrate_page(model, prompt, story_summary, &window, &dir).await {
            StageOutcome::Ok(entry) => {
                report
                    .illustrations
                    .insert(entry.page, image_uri(&entry.path));
                window.push(entry);
            }
            StageOutcome::PageSkipped { page, detail } => {
                warn!("Skipping illustration for page {}: {}", page, detail);
                report.skipped.push(SkippedPage {
                    page,
                    reason: detail,
                });
            }
            StageOutcome::Fatal { stage, detail } => {
                warn!("Stage {} aborted: {}", stage, detail);
                return Err(AppError::Storage(detail));
            }
        }
    }

    info!(
        "Illustrations done: {} generated, {} skipped",
        report.illustrations.len(),
        report.skipped.len()
    );
    Ok(report)
}

async fn illustrate_page(
    model: &dyn ImageModel,
    prompt: &IllustrationPrompt,
    story_summary: &str,
    window: &ConsistencyWindow,
    dir: &Path,
) -> StageOutcome<WindowEntry> {
    let mut parts = window.image_parts();
    parts.push(ContentPart::Text(composite_instruction(
        story_summary,
        &prompt.prompt,
    )));

    if window.is_empty() {
        debug!(
            "Illustrating page {} without reference images via {}",
            prompt.page,
            model.model_name()
        );
    } else {
        debug!(
            "Illustrating page {} with {} reference image(s) from pages {:?} via {}",
            prompt.page,
            window.len(),
            window.pages(),
            model.model_name()
        );
    }

    let response = match model.generate(&parts).await {
        Ok(response) => response,
        Err(e) => {
            return StageOutcome::PageSkipped {
                page: prompt.page,
                detail: format!("image model call failed: {e}"),
            }
        }
    };

    let Some(inline) = response.first_inline_image() else {
        return StageOutcome::PageSkipped {
            page: prompt.page,
            detail: "no image payload in response".to_string(),
        };
    };

    let path = dir.join(format!("page_{}.png", prompt.page));
    if let Err(e) = tokio::fs::write(&path, &inline.data).await {
        return StageOutcome::Fatal {
            stage: Stage::Illustrations,
            detail: format!("Cannot write {}: {e}", path.display()),
        };
    }

    info!(
        "Saved illustration for page {} ({} bytes) to {}",
        prompt.page,
        inline.data.len(),
        path.display()
    );

    StageOutcome::Ok(WindowEntry {
        page: prompt.page,
        path,
        mime_type: inline.mime_type.clone(),
        data: inline.data.clone(),
    })
}
