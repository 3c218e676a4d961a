// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use std::fmt;

use thiserror::Error;

/// The step of a build or merge that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolving geometry and laying out pages.
    Layout,
    /// Decoding and embedding raster images.
    Embed,
    /// Stamping the watermark overlay.
    Watermark,
    /// Parsing source documents.
    Parse,
    /// Copying pages into the destination document.
    CopyPages,
    /// Compressing and writing the finished byte stream.
    Serialize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Layout => "layout",
            Self::Embed => "image embedding",
            Self::Watermark => "watermark",
            Self::Parse => "parsing",
            Self::CopyPages => "page copy",
            Self::Serialize => "serialization",
        };
        f.write_str(name)
    }
}

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Input errors --
    #[error("source unavailable: {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Document errors --
    #[error("document build failed during {stage}: {cause}")]
    BuildFailed { stage: Stage, cause: String },

    #[error("no source documents provided for merge")]
    NoSourcesProvided,

    #[error("document merge failed during {stage}: {cause}")]
    MergeFailed { stage: Stage, cause: String },

    // -- Output / transport --
    #[error("sharing is not available on this host")]
    ShareUnavailable,

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- Project store --
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlattwerkError {
    /// Shorthand for a [`BlattwerkError::BuildFailed`] at `stage`.
    pub fn build(stage: Stage, cause: impl fmt::Display) -> Self {
        Self::BuildFailed {
            stage,
            cause: cause.to_string(),
        }
    }

    /// Shorthand for a [`BlattwerkError::MergeFailed`] at `stage`.
    pub fn merge(stage: Stage, cause: impl fmt::Display) -> Self {
        Self::MergeFailed {
            stage,
            cause: cause.to_string(),
        }
    }

    /// Shorthand for a [`BlattwerkError::SourceUnavailable`].
    pub fn unavailable(location: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failure_names_the_stage() {
        let err = BlattwerkError::build(Stage::Watermark, "page 3 has no dictionary");
        assert_eq!(
            err.to_string(),
            "document build failed during watermark: page 3 has no dictionary"
        );
    }

    #[test]
    fn unavailable_keeps_location() {
        let err = BlattwerkError::unavailable("/tmp/missing.png", "No such file");
        match err {
            BlattwerkError::SourceUnavailable { location, reason } => {
                assert_eq!(location, "/tmp/missing.png");
                assert_eq!(reason, "No such file");
            }
            other => panic!("unexpected error variant: {other}"),
        }
    }
}
