// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion pipeline - async entry points that gather inputs one at a time
// and hand the CPU-bound PDF work to a blocking thread.

use std::path::PathBuf;

use blattwerk_core::error::{BlattwerkError, Result, Stage};
use blattwerk_core::{ConversionSettings, ImageInput, RasterPayload};
use tracing::{info, instrument, warn};

use crate::image::ImageEncoder;
use crate::pdf::{BuildReport, DocumentBuilder, DocumentMerger};

/// Encode `inputs` and build a PDF with the default margin.
pub async fn images_to_pdf(
    encoder: &ImageEncoder,
    inputs: &[ImageInput],
    settings: &ConversionSettings,
) -> Result<Vec<u8>> {
    let settings = settings.clone().validate()?;
    images_to_pdf_with(encoder, inputs, DocumentBuilder::new(settings))
        .await
        .map(|(bytes, _)| bytes)
}

/// Encode `inputs` and build a PDF with a preconfigured builder.
///
/// Inputs are encoded strictly in order. One that cannot be encoded still
/// gets its page, left empty, and shows up in the report.
#[instrument(skip_all, fields(inputs = inputs.len()))]
pub async fn images_to_pdf_with(
    encoder: &ImageEncoder,
    inputs: &[ImageInput],
    builder: DocumentBuilder,
) -> Result<(Vec<u8>, BuildReport)> {
    let mut payloads = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let payload = match encoder.encode_input(input).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    image = index + 1,
                    source = %input.source.describe(),
                    error = %err,
                    "Image skipped"
                );
                RasterPayload::default()
            }
        };
        payloads.push(payload);
    }

    let (bytes, report) = tokio::task::spawn_blocking(move || builder.build_with_report(&payloads))
        .await
        .map_err(|err| {
            BlattwerkError::build(Stage::Serialize, format!("build task failed: {err}"))
        })??;

    info!(
        pages = report.page_count,
        degraded = report.degraded_pages.len(),
        bytes = bytes.len(),
        "Conversion complete"
    );
    Ok((bytes, report))
}

/// Read the PDFs at `paths` in order and merge them.
///
/// Unreadable files are skipped; the merge fails only when none can be read.
#[instrument(skip_all, fields(files = paths.len()))]
pub async fn merge_files(paths: &[PathBuf]) -> Result<Vec<u8>> {
    if paths.is_empty() {
        return Err(BlattwerkError::NoSourcesProvided);
    }

    let mut sources = Vec::with_capacity(paths.len());
    let mut last_failure = None;
    for path in paths {
        match tokio::fs::read(path).await {
            Ok(bytes) => sources.push(bytes),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "PDF skipped");
                last_failure = Some(BlattwerkError::unavailable(path.display().to_string(), err));
            }
        }
    }

    if sources.is_empty() {
        return Err(last_failure.unwrap_or(BlattwerkError::NoSourcesProvided));
    }

    tokio::task::spawn_blocking(move || DocumentMerger::new().merge(&sources))
        .await
        .map_err(|err| {
            BlattwerkError::merge(Stage::Serialize, format!("merge task failed: {err}"))
        })?
}
