// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document: Image-to-PDF assembly and PDF merging.
//
// Provides page geometry, image source resolution and decoding, the document
// builder (layout, watermark, compression), the merger (concatenate, reorder,
// extract), document inspection, and the async conversion pipeline.

pub mod convert;
pub mod geometry;
pub mod image;
pub mod ocr;
pub mod pdf;

// Re-export the primary entry points so callers can use
// `blattwerk_document::DocumentBuilder` etc.
pub use convert::{images_to_pdf, images_to_pdf_with, merge_files};
pub use geometry::{DEFAULT_MARGIN_MM, PageDimensions, Placement, dimensions_for, placement_for};
pub use self::image::{ImageEncoder, ImageProcessor};
pub use ocr::TextExtractor;
pub use pdf::{BuildReport, DocumentBuilder, DocumentMerger, DocumentSummary};
