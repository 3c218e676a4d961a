// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document inspection - page count and per-page geometry of an existing PDF.

use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::Document;
use serde::Serialize;

use crate::pdf::tree;

/// Size and rotation of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    /// 1-indexed page number.
    pub number: u32,
    pub width_pt: f32,
    pub height_pt: f32,
    pub rotation: i64,
}

/// Structural overview of a PDF.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub version: String,
    pub page_count: usize,
    pub pages: Vec<PageSummary>,
}

impl DocumentSummary {
    /// Parse `data` and summarise it; unreadable input is `UnsupportedFormat`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            BlattwerkError::UnsupportedFormat(format!("not a readable PDF: {err}"))
        })?;
        Ok(Self::from_document(&document))
    }

    pub fn from_document(document: &Document) -> Self {
        let pages: Vec<PageSummary> = document
            .get_pages()
            .into_iter()
            .map(|(number, page_id)| {
                let [llx, lly, urx, ury] = tree::media_box(document, page_id);
                PageSummary {
                    number,
                    width_pt: (urx - llx).abs(),
                    height_pt: (ury - lly).abs(),
                    rotation: tree::rotation(document, page_id),
                }
            })
            .collect();
        Self {
            version: document.version.clone(),
            page_count: pages.len(),
            pages,
        }
    }

    /// Page sizes as (width, height) pairs, in page order.
    pub fn page_sizes(&self) -> Vec<(f32, f32)> {
        self.pages
            .iter()
            .map(|page| (page.width_pt, page.height_pt))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_unsupported() {
        assert!(matches!(
            DocumentSummary::from_bytes(b"hello"),
            Err(BlattwerkError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn summary_serialises_in_camel_case() {
        let summary = DocumentSummary {
            version: "1.7".into(),
            page_count: 1,
            pages: vec![PageSummary {
                number: 1,
                width_pt: 612.0,
                height_pt: 792.0,
                rotation: 0,
            }],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["pageCount"], 1);
        assert_eq!(json["pages"][0]["widthPt"], 612.0);
    }
}
