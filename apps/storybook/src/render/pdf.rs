//! Minimal PDF assembly on top of `lopdf`: shared Type1 fonts, one content
//! stream per page, optional image XObject per page.
//!
//! Output carries no timestamps or generated IDs; identical input gives
//! identical bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::errors::AppError;
use crate::layout::{FontFace, PageGeometry, Rect};
use crate::render::artwork::Artwork;

/// Resource name of the single image a page may carry.
const IMAGE_RESOURCE: &str = "Im1";

pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    fonts: Dictionary,
    page_ids: Vec<ObjectId>,
    geometry: PageGeometry,
}

impl PdfWriter {
    pub fn new(geometry: PageGeometry) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for face in [FontFace::Helvetica, FontFace::HelveticaBold] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => face.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(face.resource_name(), font_id);
        }

        Self {
            doc,
            pages_id,
            fonts,
            page_ids: Vec::new(),
            geometry,
        }
    }

    /// Appends a page. When `image` is given it is available to the content
    /// stream as `/Im1`.
    pub fn add_page(
        &mut self,
        operations: Vec<Operation>,
        image: Option<&Artwork>,
    ) -> Result<(), AppError> {
        let mut resources = dictionary! {
            "Font" => self.fonts.clone(),
        };
        if let Some(art) = image {
            let image_id = self.doc.add_object(image_stream(art));
            resources.set(
                "XObject",
                dictionary! {
                    IMAGE_RESOURCE => image_id,
                },
            );
        }

        let content = Content { operations }
            .encode()
            .map_err(|e| AppError::Render(format!("Cannot encode page content: {e}")))?;
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(self.geometry.width),
                Object::Real(self.geometry.height),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Finishes the page tree and serializes the document.
    pub fn finish(mut self) -> Result<Vec<u8>, AppError> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| AppError::Render(format!("Cannot serialize PDF: {e}")))?;
        Ok(bytes)
    }
}

fn image_stream(art: &Artwork) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(art.width),
            "Height" => i64::from(art.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        art.rgb.clone(),
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Content-stream helpers
// ────────────────────────────────────────────────────────────────────────────

/// Encodes text for a WinAnsi font. Characters with no WinAnsi code become `?`.
pub fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2026}' => 0x85,
            _ => b'?',
        })
        .collect()
}

pub fn fill_rgb(r: f32, g: f32, b: f32) -> Operation {
    Operation::new("rg", vec![number(r), number(g), number(b)])
}

/// Filled rectangle in the current fill colour.
pub fn fill_rect(rect: Rect) -> Vec<Operation> {
    vec![
        Operation::new(
            "re",
            vec![
                number(rect.x),
                number(rect.y),
                number(rect.width),
                number(rect.height),
            ],
        ),
        Operation::new("f", vec![]),
    ]
}

/// Text lines starting at baseline `(x, y)`, each `leading` below the last.
pub fn text_lines(
    face: FontFace,
    size: f32,
    leading: f32,
    x: f32,
    y: f32,
    lines: &[String],
) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![face.resource_name().into(), number(size)]),
        Operation::new("TL", vec![number(leading)]),
        Operation::new("Td", vec![number(x), number(y)]),
    ];
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi_bytes(line), StringFormat::Literal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

/// Draws `/Im1` into `rect`.
pub fn draw_image(rect: Rect) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                number(rect.width),
                0.into(),
                0.into(),
                number(rect.height),
                number(rect.x),
                number(rect.y),
            ],
        ),
        Operation::new("Do", vec![IMAGE_RESOURCE.into()]),
        Operation::new("Q", vec![]),
    ]
}

/// Whole numbers as integers, everything else as reals.
fn number(value: f32) -> Object {
    if value.fract() == 0.0 && value.abs() < i32::MAX as f32 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value)
    }
}
