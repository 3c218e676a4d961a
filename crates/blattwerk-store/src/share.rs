// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Share targets - hand a persisted document to something outside the
// application. Hosts without a share mechanism use `NoShare`.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use tracing::{info, instrument, warn};

/// A destination for finished documents beyond the output directory.
pub trait ShareTarget: Send + Sync {
    /// Offer the file at `path` to the target. Returns where it ended up, if
    /// the target keeps its own copy.
    fn share_file(&self, path: &Path, mime_type: &str) -> Result<Option<PathBuf>>;
}

/// The target for hosts with no share mechanism; always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShare;

impl ShareTarget for NoShare {
    fn share_file(&self, path: &Path, _mime_type: &str) -> Result<Option<PathBuf>> {
        warn!(path = %path.display(), "Share requested but no share target is configured");
        Err(BlattwerkError::ShareUnavailable)
    }
}

/// Copies shared files into an export directory, never overwriting an
/// existing export.
#[derive(Debug, Clone)]
pub struct ExportShare {
    export_dir: PathBuf,
}

impl ExportShare {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// First free name of the form `stem.ext`, `stem-1.ext`, `stem-2.ext`...
    fn free_destination(&self, file_name: &str) -> PathBuf {
        let candidate = self.export_dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, extension)) => (stem, format!(".{extension}")),
            None => (file_name, String::new()),
        };
        (1u32..)
            .map(|n| self.export_dir.join(format!("{stem}-{n}{extension}")))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}

impl ShareTarget for ExportShare {
    #[instrument(
        skip(self, path),
        fields(path = %path.display(), export_dir = %self.export_dir.display())
    )]
    fn share_file(&self, path: &Path, mime_type: &str) -> Result<Option<PathBuf>> {
        if !path.is_file() {
            return Err(BlattwerkError::StorageFailure(format!(
                "nothing to share at {}",
                path.display()
            )));
        }
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                BlattwerkError::StorageFailure(format!("no file name in {}", path.display()))
            })?;

        std::fs::create_dir_all(&self.export_dir).map_err(|e| {
            BlattwerkError::StorageFailure(format!("create {}: {e}", self.export_dir.display()))
        })?;
        let destination = self.free_destination(file_name);
        std::fs::copy(path, &destination).map_err(|e| {
            BlattwerkError::StorageFailure(format!("export to {}: {e}", destination.display()))
        })?;

        info!(destination = %destination.display(), "Document exported");
        Ok(Some(destination))
    }
}
