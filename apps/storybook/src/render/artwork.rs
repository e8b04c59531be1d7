//! Artwork loading for the renderer. Every failure is soft: the caller gets
//! `None` plus a warning and draws the placeholder instead.

use std::path::Path;

use tracing::{debug, warn};

use crate::generation::illustrations::resolve_artifact_uri;

/// Decoded artwork ready to embed as a DeviceRGB image.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, 8 bits per component.
    pub rgb: Vec<u8>,
}

impl Artwork {
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Self {
            width,
            height,
            rgb: rgb.into_raw(),
        })
    }
}

/// Resolves `uri` and decodes the file behind it.
pub fn load_artwork(page: u32, uri: &str) -> Option<Artwork> {
    let path = resolve_artifact_uri(uri);
    load_from_path(page, &path)
}

fn load_from_path(page: u32, path: &Path) -> Option<Artwork> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                "Illustration for page {} not readable at {}: {}",
                page,
                path.display(),
                e
            );
            return None;
        }
    };

    match Artwork::decode(&bytes) {
        Ok(art) => {
            debug!(
                "Loaded illustration for page {} ({}x{})",
                page, art.width, art.height
            );
            Some(art)
        }
        Err(e) => {
            warn!(
                "Illustration for page {} at {} could not be decoded: {}",
                page,
                path.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
