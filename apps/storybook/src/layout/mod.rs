// Page Layout
// Implements: static font metrics, greedy word-wrap, page geometry for the story PDF.
// Pure and CPU-bound; callers in async code go through tokio::task::spawn_blocking.

pub mod font_metrics;
pub mod wrap;

pub use font_metrics::FontFace;
pub use wrap::wrap_text;

/// Points per inch.
pub const PT_PER_IN: f32 = 72.0;

/// Fixed page geometry, in points with the origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Fraction of the page height given to the illustration region.
    pub illustration_fraction: f32,
}

/// US Letter, 0.75" margins.
pub fn letter_page() -> PageGeometry {
    PageGeometry {
        width: 8.5 * PT_PER_IN,
        height: 11.0 * PT_PER_IN,
        margin: 0.75 * PT_PER_IN,
        illustration_fraction: 0.8,
    }
}

/// Axis-aligned rectangle; `(x, y)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Baseline y of the first text line below the top margin.
    pub fn top(&self) -> f32 {
        self.height - self.margin
    }

    /// Illustration region: full content width, anchored at the bottom margin.
    pub fn illustration_region(&self) -> Rect {
        Rect {
            x: self.margin,
            y: self.margin,
            width: self.content_width(),
            height: self.height * self.illustration_fraction,
        }
    }
}

impl Rect {
    /// Largest rectangle with the given aspect ratio that fits inside `self`,
    /// anchored at its bottom-left corner.
    pub fn fit(&self, src_width: f32, src_height: f32) -> Rect {
        if src_width <= 0.0 || src_height <= 0.0 {
            return *self;
        }
        let scale = (self.width / src_width).min(self.height / src_height);
        Rect {
            x: self.x,
            y: self.y,
            width: src_width * scale,
            height: src_height * scale,
        }
    }
}
