// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command handlers. Each returns data for `main` to print, so handlers stay
// testable without capturing stdout.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result, Stage};
use blattwerk_core::{
    ConversionSettings, ImageInput, ImageSource, NewProject, Orientation, PageSize, ProjectId,
    ProjectRecord,
};
use blattwerk_document::{
    DocumentBuilder, DocumentMerger, DocumentSummary, images_to_pdf_with, merge_files,
};
use blattwerk_store::{ProjectStats, StoredDocument};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::services::app_services::AppServices;

/// Options of `blattwerk build` after parsing.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub images: Vec<String>,
    pub output: PathBuf,
    pub page_size: Option<String>,
    pub orientation: Option<String>,
    pub quality: Option<u8>,
    pub no_compression: bool,
    pub watermark: Option<String>,
    pub project: Option<String>,
    pub share: bool,
}

/// What a command wrote.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Written {
    #[serde(flatten)]
    pub document: StoredDocument,
    pub page_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded_pages: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

// -- Build --------------------------------------------------------------------

/// Settings for a build: configured defaults, overridden by the request.
pub fn resolve_settings(
    defaults: &ConversionSettings,
    request: &BuildRequest,
) -> Result<ConversionSettings> {
    let mut settings = defaults.clone();
    if let Some(name) = &request.page_size {
        settings.page_size = PageSize::from_name(name);
    }
    if let Some(name) = &request.orientation {
        settings.orientation = Orientation::from_name(name);
    }
    if let Some(quality) = request.quality {
        settings.quality = quality;
    }
    if request.no_compression {
        settings.compression = false;
    }
    if request.watermark.is_some() {
        settings.watermark_text = request.watermark.clone();
    }
    settings.validate()
}

#[instrument(skip_all, fields(images = request.images.len(), output = %request.output.display()))]
pub async fn build(svc: &AppServices, request: BuildRequest) -> Result<Written> {
    if request.images.is_empty() {
        return Err(BlattwerkError::InvalidInput("no images given".into()));
    }
    let settings = resolve_settings(&svc.config().default_settings, &request)?;
    let (dir, name) = split_output(&request.output);

    let inputs: Vec<ImageInput> = request
        .images
        .iter()
        .map(|reference| ImageInput::new(ImageSource::parse(reference)))
        .collect();
    let builder = DocumentBuilder::new(settings.clone())
        .with_margin(svc.config().print_margin_mm)
        .with_title(name.trim_end_matches(".pdf"));

    let encoder = svc.encoder()?;
    let (bytes, report) = images_to_pdf_with(&encoder, &inputs, builder).await?;
    if !report.is_clean() {
        warn!(pages = ?report.degraded_pages, "Some pages were left empty");
    }

    let mut written = write_output(svc, dir, &name, &bytes)?;
    written.page_count = report.page_count;
    written.degraded_pages = report.degraded_pages;

    if let Some(project_name) = request.project {
        let record = svc.projects().save(NewProject {
            name: project_name,
            images: request.images,
            settings,
            pdf_path: Some(written.document.path.display().to_string()),
            notes: None,
        })?;
        written.project_id = Some(record.id);
    }
    if request.share {
        written.shared_to = share_output(svc, dir, &written.document.path);
    }
    Ok(written)
}

// -- Merge / extract ----------------------------------------------------------

#[instrument(skip_all, fields(inputs = inputs.len(), output = %output.display()))]
pub async fn merge(
    svc: &AppServices,
    inputs: &[PathBuf],
    output: &Path,
    order: Option<&[usize]>,
    share: bool,
) -> Result<Written> {
    let bytes = match order {
        None => merge_files(inputs).await?,
        Some(order) => merge_files(&reorder(inputs, order)?).await?,
    };
    let (dir, name) = split_output(output);
    let mut written = write_output(svc, dir, &name, &bytes)?;
    written.page_count = DocumentSummary::from_bytes(&bytes)?.page_count;
    if share {
        written.shared_to = share_output(svc, dir, &written.document.path);
    }
    Ok(written)
}

/// `inputs` rearranged by zero-based `order`. Every index must name an input.
fn reorder(inputs: &[PathBuf], order: &[usize]) -> Result<Vec<PathBuf>> {
    order
        .iter()
        .map(|&index| {
            inputs.get(index).cloned().ok_or_else(|| {
                BlattwerkError::InvalidInput(format!(
                    "order index {index} out of range for {} inputs",
                    inputs.len()
                ))
            })
        })
        .collect()
}

#[instrument(skip_all, fields(input = %input.display(), pages = ?pages))]
pub async fn extract(
    svc: &AppServices,
    input: &Path,
    pages: &[u32],
    output: &Path,
) -> Result<Written> {
    let source = tokio::fs::read(input)
        .await
        .map_err(|e| BlattwerkError::unavailable(input.display().to_string(), e))?;
    let pages_owned = pages.to_vec();
    let bytes = tokio::task::spawn_blocking(move || {
        DocumentMerger::new().extract_pages(&source, &pages_owned)
    })
    .await
    .map_err(|e| BlattwerkError::merge(Stage::Serialize, format!("extract task failed: {e}")))??;

    let (dir, name) = split_output(output);
    let mut written = write_output(svc, dir, &name, &bytes)?;
    written.page_count = pages.len();
    Ok(written)
}

pub async fn info(input: &Path) -> Result<DocumentSummary> {
    let bytes = tokio::fs::read(input)
        .await
        .map_err(|e| BlattwerkError::unavailable(input.display().to_string(), e))?;
    DocumentSummary::from_bytes(&bytes)
}

// -- Projects -----------------------------------------------------------------

pub fn list_projects(svc: &AppServices, recent_first: bool) -> Result<Vec<ProjectRecord>> {
    if recent_first {
        svc.projects().sorted_by_updated(true)
    } else {
        svc.projects().all()
    }
}

pub fn search_projects(svc: &AppServices, query: &str) -> Result<Vec<ProjectRecord>> {
    svc.projects().search(query)
}

pub fn delete_project(svc: &AppServices, id: &str) -> Result<ProjectId> {
    let id = ProjectId::parse(id)?;
    svc.projects().delete(&id)?;
    Ok(id)
}

pub fn clear_projects(svc: &AppServices) -> Result<usize> {
    svc.projects().delete_all()
}

pub fn project_stats(svc: &AppServices) -> Result<ProjectStats> {
    svc.projects().stats()
}

// -- Config -------------------------------------------------------------------

/// Write `config.json` unless it already exists (or `force` is set).
pub fn init_config(svc: &AppServices, force: bool) -> Result<PathBuf> {
    let path = svc.config_path();
    if path.exists() && !force {
        return Err(BlattwerkError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    svc.save_config()
}

// -- Helpers ------------------------------------------------------------------

/// Split `-o` into an explicit directory (if any) and a file name. A bare
/// name lands in the configured output directory.
fn split_output(output: &Path) -> (Option<&Path>, String) {
    let dir = output.parent().filter(|parent| !parent.as_os_str().is_empty());
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, name)
}

fn write_output(
    svc: &AppServices,
    dir: Option<&Path>,
    name: &str,
    bytes: &[u8],
) -> Result<Written> {
    let document = svc.output_store(dir)?.persist(bytes, Some(name))?;
    info!(path = %document.path.display(), "Output written");
    Ok(Written {
        document,
        page_count: 0,
        degraded_pages: Vec::new(),
        shared_to: None,
        project_id: None,
    })
}

/// Hand a written document to the share target. The document is already
/// stored, so a failed share is logged and reported as not shared.
fn share_output(svc: &AppServices, dir: Option<&Path>, path: &Path) -> Option<PathBuf> {
    match svc.output_store(dir).and_then(|store| store.share(path)) {
        Ok(shared_to) => shared_to,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Share failed, document kept");
            None
        }
    }
}
