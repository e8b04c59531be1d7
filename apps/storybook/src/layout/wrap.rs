//! Greedy word-wrap against the static font metrics.
//!
//! Words are never split or hyphenated: a single word wider than the line gets
//! a line of its own and overflows.

use crate::layout::font_metrics::FontFace;

/// Breaks `text` into lines no wider than `max_width_pt` at `size_pt`.
///
/// Whitespace runs collapse to single spaces. Empty input yields one empty line.
pub fn wrap_text(text: &str, face: FontFace, size_pt: f32, max_width_pt: f32) -> Vec<String> {
    let metrics = face.metrics();
    let mut words = text.split_whitespace();

    let Some(first) = words.next() else {
        return vec![String::new()];
    };

    let mut lines = Vec::new();
    let mut current = first.to_string();

    for word in words {
        let candidate = format!("{current} {word}");
        if metrics.width_pt(&candidate, size_pt) <= max_width_pt {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);
    lines
}
