// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR seam - text extraction is delegated to whatever engine the host
// provides. No engine ships with this crate.

use blattwerk_core::error::Result;
use blattwerk_core::{ImageSource, OcrResult};
use tracing::{instrument, warn};

/// A text-recognition engine.
pub trait TextExtractor {
    /// Recognise the text in `source`. `language` is an engine-specific code
    /// such as `"eng"`.
    fn extract_text(&self, source: &ImageSource, language: &str) -> Result<OcrResult>;
}

/// Run `extractor` over each source in order.
///
/// A failed image yields an empty, zero-confidence result at its position so
/// the output lines up with the input.
#[instrument(skip_all, fields(sources = sources.len(), language = %language))]
pub fn extract_many<E: TextExtractor + ?Sized>(
    extractor: &E,
    sources: &[ImageSource],
    language: &str,
) -> Vec<OcrResult> {
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            extractor.extract_text(source, language).unwrap_or_else(|err| {
                warn!(image = index + 1, error = %err, "Text extraction failed");
                OcrResult::empty(language)
            })
        })
        .collect()
}

/// Join the non-empty texts, separated by a blank line.
pub fn merge_texts(results: &[OcrResult]) -> String {
    results
        .iter()
        .map(|result| result.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
