// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output store - write finished documents into the output directory.
//
// Bytes go to a temporary file beside the destination and are renamed into
// place only once fully written and synced, so a reader never sees a partial
// document under its final name.

use std::io::Write;
use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::integrity;
use crate::share::{NoShare, ShareTarget};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A document written by [`OutputStore::persist`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDocument {
    pub path: PathBuf,
    pub size: u64,
    /// Lowercase hex SHA-256 of the written bytes.
    pub sha256: String,
}

/// Persists documents under a root directory and forwards them to a share
/// target on request.
pub struct OutputStore {
    root: PathBuf,
    share_target: Box<dyn ShareTarget>,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>, share_target: Box<dyn ShareTarget>) -> Self {
        Self {
            root: root.into(),
            share_target,
        }
    }

    /// A store whose share requests always fail with `ShareUnavailable`.
    pub fn without_sharing(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Box::new(NoShare))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -- Persistence ----------------------------------------------------------

    /// Write `bytes` as `<sanitised name>.pdf` in the root directory,
    /// replacing any previous file of that name.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub fn persist(&self, bytes: &[u8], suggested_name: Option<&str>) -> Result<StoredDocument> {
        let file_name = sanitize_file_name(suggested_name.unwrap_or_default());
        let destination = self.root.join(&file_name);

        std::fs::create_dir_all(&self.root)
            .map_err(|e| storage(format!("create {}: {e}", self.root.display())))?;

        let mut staging = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| storage(format!("staging file in {}: {e}", self.root.display())))?;
        staging
            .write_all(bytes)
            .and_then(|()| staging.as_file().sync_all())
            .map_err(|e| storage(format!("write {file_name}: {e}")))?;
        debug!(staging = %staging.path().display(), "Staged document");

        staging
            .persist(&destination)
            .map_err(|e| storage(format!("rename into {}: {}", destination.display(), e.error)))?;

        let stored = StoredDocument {
            path: destination,
            size: bytes.len() as u64,
            sha256: integrity::hash_bytes(bytes),
        };
        info!(
            path = %stored.path.display(),
            size = stored.size,
            sha256 = %stored.sha256,
            "Document persisted"
        );
        Ok(stored)
    }

    /// Re-read a stored document and check it against its recorded digest.
    pub fn verify(&self, document: &StoredDocument) -> Result<()> {
        let bytes = std::fs::read(&document.path)
            .map_err(|e| storage(format!("read {}: {e}", document.path.display())))?;
        integrity::verify_hash(&bytes, &document.sha256)
    }

    // -- Transport ------------------------------------------------------------

    /// Hand the file to the configured share target.
    pub fn share(&self, path: &Path) -> Result<Option<PathBuf>> {
        if !path.is_file() {
            return Err(storage(format!("nothing to share at {}", path.display())));
        }
        self.share_target.share_file(path, PDF_MIME_TYPE)
    }

    pub fn remove(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|e| storage(format!("remove {}: {e}", path.display())))?;
        debug!(path = %path.display(), "Document removed");
        Ok(())
    }

    pub fn size_of(&self, path: &Path) -> Result<u64> {
        std::fs::metadata(path)
            .map(|meta| meta.len())
            .map_err(|e| storage(format!("stat {}: {e}", path.display())))
    }
}

/// Turn a caller-supplied name into a safe `.pdf` file name.
///
/// Characters outside `[A-Za-z0-9_-]` become `_`; a trailing `.pdf` is kept
/// as the extension. An empty name becomes `document-<unix millis>.pdf`.
pub fn sanitize_file_name(name: &str) -> String {
    let trimmed = name.trim();
    let has_pdf_suffix = |cut: usize| {
        trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".pdf")
    };
    let stem = match trimmed.len().checked_sub(4) {
        Some(cut) if has_pdf_suffix(cut) => &trimmed[..cut],
        _ => trimmed,
    };

    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        format!("document-{}.pdf", Utc::now().timestamp_millis())
    } else {
        format!("{cleaned}.pdf")
    }
}

fn storage(message: String) -> BlattwerkError {
    BlattwerkError::StorageFailure(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::ExportShare;

    #[test]
    fn names_are_sanitised() {
        assert_eq!(sanitize_file_name("Quarterly report"), "Quarterly_report.pdf");
        assert_eq!(sanitize_file_name("scan.PDF"), "scan.pdf");
        assert_eq!(sanitize_file_name("../etc/passwd"), "___etc_passwd.pdf");
        assert_eq!(sanitize_file_name("naïve"), "na_ve.pdf");
    }

    #[test]
    fn empty_name_gets_a_timestamp() {
        let name = sanitize_file_name("   ");
        assert!(name.starts_with("document-"));
        assert!(name.ends_with(".pdf"));
        let millis = &name["document-".len()..name.len() - 4];
        assert!(millis.parse::<i64>().is_ok());
    }

    #[test]
    fn persist_writes_hashes_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::without_sharing(dir.path().join("out"));
        let stored = store.persist(b"%PDF-1.7 body", Some("merged")).unwrap();

        assert_eq!(stored.path, dir.path().join("out").join("merged.pdf"));
        assert_eq!(stored.size, 13);
        assert_eq!(stored.sha256, integrity::hash_bytes(b"%PDF-1.7 body"));
        assert_eq!(store.size_of(&stored.path).unwrap(), 13);
        store.verify(&stored).unwrap();
    }

    #[test]
    fn persist_leaves_no_staging_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::without_sharing(dir.path());
        store.persist(b"one", Some("a")).unwrap();
        store.persist(b"two", Some("a")).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.pdf")]);
        assert_eq!(std::fs::read(dir.path().join("a.pdf")).unwrap(), b"two");
    }

    #[test]
    fn tampered_file_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::without_sharing(dir.path());
        let stored = store.persist(b"original", Some("doc")).unwrap();
        std::fs::write(&stored.path, b"changed").unwrap();
        assert!(matches!(
            store.verify(&stored),
            Err(BlattwerkError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn share_without_target_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::without_sharing(dir.path());
        let stored = store.persist(b"x", Some("doc")).unwrap();
        assert!(matches!(
            store.share(&stored.path),
            Err(BlattwerkError::ShareUnavailable)
        ));
    }

    #[test]
    fn share_through_export_target() {
        let dir = tempfile::tempdir().unwrap();
        let exports = dir.path().join("exports");
        let store = OutputStore::new(dir.path().join("out"), Box::new(ExportShare::new(&exports)));
        let stored = store.persist(b"x", Some("doc")).unwrap();
        let exported = store.share(&stored.path).unwrap();
        assert_eq!(exported, Some(exports.join("doc.pdf")));
    }

    #[test]
    fn missing_files_are_storage_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::without_sharing(dir.path());
        let ghost = dir.path().join("ghost.pdf");
        assert!(matches!(store.remove(&ghost), Err(BlattwerkError::StorageFailure(_))));
        assert!(matches!(store.size_of(&ghost), Err(BlattwerkError::StorageFailure(_))));
        assert!(matches!(store.share(&ghost), Err(BlattwerkError::StorageFailure(_))));
    }

    #[test]
    fn remove_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::without_sharing(dir.path());
        let stored = store.persist(b"x", None).unwrap();
        store.remove(&stored.path).unwrap();
        assert!(!stored.path.exists());
    }
}
