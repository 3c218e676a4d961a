// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark overlay - stamp translucent, rotated text over the centre of every
// page of a parsed document. The existing page content is wrapped in q/Q so
// its graphics state cannot leak into the overlay.

use blattwerk_core::error::{BlattwerkError, Result, Stage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, instrument};

use crate::pdf::tree;

pub const WATERMARK_FONT_SIZE: f32 = 60.0;
pub const WATERMARK_OPACITY: f32 = 0.3;
pub const WATERMARK_ANGLE_DEG: f32 = 45.0;
/// Light grey, RGB(200, 200, 200).
pub const WATERMARK_GRAY: f32 = 200.0 / 255.0;

const FONT_RESOURCE: &str = "BwWatermarkFont";
const STATE_RESOURCE: &str = "BwWatermarkGS";

/// Helvetica advance widths for WinAnsi codes 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];
const HELVETICA_DEFAULT_WIDTH: u16 = 556;

/// Text overlay parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub text: String,
    pub font_size: f32,
    pub opacity: f32,
    pub angle_deg: f32,
    pub gray: f32,
}

impl Watermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: WATERMARK_FONT_SIZE,
            opacity: WATERMARK_OPACITY,
            angle_deg: WATERMARK_ANGLE_DEG,
            gray: WATERMARK_GRAY,
        }
    }

    /// The text as WinAnsi bytes; characters outside Latin-1 become `?`.
    pub fn encoded_text(&self) -> Vec<u8> {
        self.text
            .chars()
            .map(|c| match c as u32 {
                0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
                0x09 | 0x0A | 0x0D => b' ',
                _ => b'?',
            })
            .collect()
    }

    /// Rendered text width in points.
    pub fn text_width(&self) -> f32 {
        let units: u32 = self
            .encoded_text()
            .iter()
            .map(|&byte| match byte {
                32..=126 => HELVETICA_WIDTHS[(byte - 32) as usize] as u32,
                _ => HELVETICA_DEFAULT_WIDTH as u32,
            })
            .sum();
        units as f32 * self.font_size / 1000.0
    }

    /// Content stream drawing the text centred on (`cx`, `cy`).
    fn overlay(&self, cx: f32, cy: f32) -> Result<Vec<u8>> {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(STATE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("g", vec![Object::Real(self.gray)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                    Object::Real(self.font_size),
                ],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Real(cos),
                    Object::Real(sin),
                    Object::Real(-sin),
                    Object::Real(cos),
                    Object::Real(cx),
                    Object::Real(cy),
                ],
            ),
            Operation::new(
                "Td",
                vec![Object::Real(-self.text_width() / 2.0), Object::Real(0.0)],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(self.encoded_text(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ];
        Content { operations }
            .encode()
            .map_err(|err| BlattwerkError::build(Stage::Watermark, err))
    }
}

/// Stamp `watermark` on every page of `doc`, returning the number of pages
/// stamped.
#[instrument(skip_all, fields(text = %watermark.text))]
pub fn stamp_all_pages(doc: &mut Document, watermark: &Watermark) -> Result<usize> {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let state_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(watermark.opacity),
        "CA" => Object::Real(watermark.opacity),
    });

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut stamped = 0;
    for page_id in page_ids {
        let [llx, lly, urx, ury] = tree::media_box(doc, page_id);
        let overlay = watermark.overlay((llx + urx) / 2.0, (lly + ury) / 2.0)?;
        register_resources(doc, page_id, font_id, state_id)?;
        wrap_contents(doc, page_id, overlay)?;
        stamped += 1;
    }

    debug!(stamped, "Watermark applied");
    Ok(stamped)
}

/// Give the page its own resource dictionary carrying the overlay's font and
/// graphics state alongside whatever it already had, inherited or not.
fn register_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    state_id: ObjectId,
) -> Result<()> {
    let mut resources = tree::page_attribute(doc, page_id, b"Resources")
        .and_then(|object| tree::owned_dictionary(doc, &object))
        .unwrap_or_default();

    let mut fonts = sub_dictionary(doc, &resources, b"Font");
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", fonts);

    let mut states = sub_dictionary(doc, &resources, b"ExtGState");
    states.set(STATE_RESOURCE, Object::Reference(state_id));
    resources.set("ExtGState", states);

    page_dictionary_mut(doc, page_id)?.set("Resources", resources);
    Ok(())
}

fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|object| tree::owned_dictionary(doc, object))
        .unwrap_or_default()
}

/// Replace the page's /Contents with `[q, ...existing, Q overlay]`.
fn wrap_contents(doc: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> Result<()> {
    let existing = match page_dictionary_mut(doc, page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut closing = b"\nQ\n".to_vec();
    closing.extend_from_slice(&overlay);
    let close_id = doc.add_object(Stream::new(Dictionary::new(), closing));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(close_id));

    page_dictionary_mut(doc, page_id)?.set("Contents", contents);
    Ok(())
}

fn page_dictionary_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| BlattwerkError::build(Stage::Watermark, format!("page {page_id:?}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_page_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let shared_resources = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let mut kids = Vec::new();
        for body in [&b"BT /F1 12 Tf (one) Tj ET"[..], &b"0 0 m 10 10 l S"[..]] {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), body.to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
                "Resources" => shared_resources,
                "MediaBox" => vec![0.into(), 0.into(), 600.into(), 800.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn non_latin_characters_become_question_marks() {
        let mark = Watermark::new("Café ✓");
        assert_eq!(mark.encoded_text(), b"Caf\xE9 ?".to_vec());
    }

    #[test]
    fn text_width_uses_helvetica_metrics() {
        let mark = Watermark::new("Hi");
        // H = 722, i = 222 at 60pt.
        assert!((mark.text_width() - (944.0 * 60.0 / 1000.0)).abs() < 1e-3);
    }

    #[test]
    fn every_page_is_stamped() {
        let mut doc = two_page_document();
        let stamped = stamp_all_pages(&mut doc, &Watermark::new("DRAFT")).unwrap();
        assert_eq!(stamped, 2);

        for page_id in doc.get_pages().into_values() {
            let content = doc.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content);
            assert!(text.starts_with("q\n"));
            assert!(text.contains("(DRAFT) Tj"));
        }
    }

    #[test]
    fn inherited_fonts_survive_the_overlay() {
        let mut doc = two_page_document();
        stamp_all_pages(&mut doc, &Watermark::new("COPY")).unwrap();

        let first = *doc.get_pages().get(&1).unwrap();
        let resources = doc
            .get_dictionary(first)
            .unwrap()
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(FONT_RESOURCE.as_bytes()));
        let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        assert!(states.has(STATE_RESOURCE.as_bytes()));
    }

    #[test]
    fn overlay_is_centred_on_the_media_box() {
        let mut doc = two_page_document();
        stamp_all_pages(&mut doc, &Watermark::new("X")).unwrap();
        let first = *doc.get_pages().get(&1).unwrap();
        let content = Content::decode(&doc.get_page_content(first).unwrap()).unwrap();
        let tm = content
            .operations
            .iter()
            .find(|op| op.operator == "Tm")
            .unwrap();
        assert_eq!(tm.operands[4].as_float().unwrap(), 300.0);
        assert_eq!(tm.operands[5].as_float().unwrap(), 400.0);
    }
}
