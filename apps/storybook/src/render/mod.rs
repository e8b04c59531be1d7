//! Document Renderer: `StoryOutput` → fixed-layout PDF.
//!
//! Page 1 is the cover; pages 2..=N+1 carry beats 1..=N. Artwork problems never
//! fail a render: any page whose illustration is absent, unreadable or
//! undecodable gets the red placeholder instead.

pub mod artwork;
pub mod pdf;

use std::path::{Path, PathBuf};

use lopdf::content::Operation;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::schemas::{StoryBeat, StoryOutput};
use crate::layout::{letter_page, wrap_text, FontFace, PageGeometry, PT_PER_IN};
use crate::render::artwork::{load_artwork, Artwork};
use crate::render::pdf::{draw_image, fill_rect, fill_rgb, text_lines, PdfWriter};

pub const TITLE_SIZE: f32 = 22.0;
pub const HEADING_SIZE: f32 = 16.0;
pub const BODY_SIZE: f32 = 12.0;
pub const PLACEHOLDER_SIZE: f32 = 18.0;
pub const PLACEHOLDER_TEXT: &str = "ILLUSTRATION MISSING";

/// Line spacing relative to font size.
const LEADING: f32 = 1.2;

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    page: PageGeometry,
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(letter_page())
    }
}

impl DocumentRenderer {
    pub fn new(page: PageGeometry) -> Self {
        Self { page }
    }

    /// Renders the story to PDF bytes.
    pub fn render(&self, story: &StoryOutput) -> Result<Vec<u8>, AppError> {
        let mut writer = PdfWriter::new(self.page);
        writer.add_page(self.cover_operations(story), None)?;

        let mut beats: Vec<&StoryBeat> = story.outline.beats.iter().collect();
        beats.sort_by_key(|b| b.page);

        let mut missing = 0usize;
        for beat in beats {
            let art = story
                .illustrations
                .get(&beat.page)
                .and_then(|uri| load_artwork(beat.page, uri));
            if art.is_none() {
                missing += 1;
                warn!(
                    "No usable illustration for page {}; drawing placeholder",
                    beat.page
                );
            }
            writer.add_page(self.beat_operations(beat, art.as_ref()), art.as_ref())?;
        }

        let pages = writer.page_count();
        let bytes = writer.finish()?;
        info!(
            "Rendered \"{}\": {} pages, {} placeholder(s), {} bytes",
            story.title,
            pages,
            missing,
            bytes.len()
        );
        Ok(bytes)
    }

    pub fn render_to_file(&self, story: &StoryOutput, path: &Path) -> Result<(), AppError> {
        let bytes = self.render(story)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Render(format!("Cannot create {}: {e}", parent.display()))
            })?;
        }
        std::fs::write(path, bytes)
            .map_err(|e| AppError::Render(format!("Cannot write {}: {e}", path.display())))
    }

    fn cover_operations(&self, story: &StoryOutput) -> Vec<Operation> {
        let margin = self.page.margin;
        let mut y = self.page.top() - 0.5 * PT_PER_IN;

        let title = wrap_text(
            &story.title,
            FontFace::HelveticaBold,
            TITLE_SIZE,
            self.page.content_width(),
        );
        let mut ops = vec![fill_rgb(0.0, 0.0, 0.0)];
        ops.extend(text_lines(
            FontFace::HelveticaBold,
            TITLE_SIZE,
            TITLE_SIZE * LEADING,
            margin,
            y,
            &title,
        ));
        y -= TITLE_SIZE * LEADING * (title.len() as f32 - 1.0) + 0.5 * PT_PER_IN;

        let meta = cover_meta_lines(story);
        if !meta.is_empty() {
            ops.extend(text_lines(
                FontFace::Helvetica,
                BODY_SIZE,
                0.25 * PT_PER_IN,
                margin,
                y,
                &meta,
            ));
        }
        ops
    }

    fn beat_operations(&self, beat: &StoryBeat, art: Option<&Artwork>) -> Vec<Operation> {
        let region = self.page.illustration_region();
        let mut ops = Vec::new();

        match art {
            Some(art) => {
                ops.extend(draw_image(region.fit(art.width as f32, art.height as f32)));
            }
            None => {
                ops.push(Operation::new("q", vec![]));
                ops.push(fill_rgb(1.0, 0.0, 0.0));
                ops.extend(fill_rect(region));
                ops.push(fill_rgb(1.0, 1.0, 1.0));
                let label_width = FontFace::HelveticaBold
                    .metrics()
                    .width_pt(PLACEHOLDER_TEXT, PLACEHOLDER_SIZE);
                ops.extend(text_lines(
                    FontFace::HelveticaBold,
                    PLACEHOLDER_SIZE,
                    PLACEHOLDER_SIZE * LEADING,
                    self.page.width / 2.0 - label_width / 2.0,
                    region.y + region.height / 2.0,
                    &[PLACEHOLDER_TEXT.to_string()],
                ));
                ops.push(Operation::new("Q", vec![]));
            }
        }

        let margin = self.page.margin;
        let heading_y = self.page.top();
        ops.push(fill_rgb(0.0, 0.0, 0.0));
        ops.extend(text_lines(
            FontFace::HelveticaBold,
            HEADING_SIZE,
            HEADING_SIZE * LEADING,
            margin,
            heading_y,
            &[format!("Page {}", beat.page)],
        ));

        let body = wrap_text(
            &beat.summary,
            FontFace::Helvetica,
            BODY_SIZE,
            self.page.content_width(),
        );
        ops.extend(text_lines(
            FontFace::Helvetica,
            BODY_SIZE,
            BODY_SIZE * LEADING,
            margin,
            heading_y - 0.4 * PT_PER_IN,
            &body,
        ));
        ops
    }
}

/// `Theme:`, `Tone:`, `Reading level:`, `Pages (target):` for whichever
/// metadata values are present.
pub fn cover_meta_lines(story: &StoryOutput) -> Vec<String> {
    let meta = &story.metadata;
    let mut lines = Vec::new();
    if let Some(theme) = &meta.theme {
        lines.push(format!("Theme: {theme}"));
    }
    if let Some(tone) = &meta.tone {
        lines.push(format!("Tone: {tone}"));
    }
    if let Some(level) = &meta.reading_level {
        lines.push(format!("Reading level: {level}"));
    }
    if let Some(length) = meta.length {
        lines.push(format!("Pages (target): {length}"));
    }
    lines
}

/// Renders on the blocking pool and writes the PDF to `path`.
pub async fn render_story_pdf(story: StoryOutput, path: PathBuf) -> Result<PathBuf, AppError> {
    tokio::task::spawn_blocking(move || {
        DocumentRenderer::default().render_to_file(&story, &path)?;
        Ok::<_, AppError>(path)
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
}
