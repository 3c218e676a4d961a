// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to a plain sentence with a clear suggestion.
// The taxonomy uses three severity levels that drive presentation.

use crate::error::{BlattwerkError, Stage};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or busy disk - trying again may work.
    Transient,
    /// The user must change something (pick another file, fix a setting).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same operation can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `BlattwerkError` into a `HumanError`.
pub fn humanize_error(err: &BlattwerkError) -> HumanError {
    match err {
        BlattwerkError::SourceUnavailable { location, .. } => {
            let remote = location.starts_with("http://") || location.starts_with("https://");
            HumanError {
                message: "We couldn't open one of your files.".into(),
                suggestion: if remote {
                    format!(
                        "Check your internet connection and that the link still works. ({location})"
                    )
                } else {
                    format!("Make sure the file still exists and can be read. ({location})")
                },
                retriable: remote,
                severity: if remote {
                    Severity::Transient
                } else {
                    Severity::ActionRequired
                },
            }
        }

        BlattwerkError::UnsupportedFormat(detail) => HumanError {
            message: "This file isn't an image or PDF we can read.".into(),
            suggestion: format!("Try saving it as JPEG, PNG or PDF first. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::InvalidInput(detail) => HumanError {
            message: "Some of the settings aren't valid.".into(),
            suggestion: detail.clone(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::BuildFailed { stage, .. } => HumanError {
            message: "We couldn't create the PDF.".into(),
            suggestion: match stage {
                Stage::Layout => "Add at least one image, then try again.".into(),
                Stage::Embed => {
                    "None of the images could be read. Try different images.".into()
                }
                Stage::Watermark => "Try again without a watermark.".into(),
                _ => "Try again. If it keeps failing, try fewer or smaller images.".into(),
            },
            retriable: matches!(stage, Stage::Serialize),
            severity: Severity::Permanent,
        },

        BlattwerkError::NoSourcesProvided => HumanError {
            message: "No PDF files were chosen.".into(),
            suggestion: "Choose at least one PDF file to merge.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::MergeFailed { stage, .. } => HumanError {
            message: "We couldn't merge these PDF files.".into(),
            suggestion: match stage {
                Stage::Parse => {
                    "None of the files could be read as PDF. They may be damaged.".into()
                }
                _ => "Try again with fewer files.".into(),
            },
            retriable: !matches!(stage, Stage::Parse),
            severity: Severity::Permanent,
        },

        BlattwerkError::ShareUnavailable => HumanError {
            message: "Sharing isn't available on this device.".into(),
            suggestion: "Set an export folder in the settings, or copy the file manually.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::StorageFailure(_) | BlattwerkError::Io(_) => HumanError {
            message: "We couldn't save the file.".into(),
            suggestion: "Check there is enough free space and that the folder can be written to."
                .into(),
            retriable: true,
            severity: Severity::Transient,
        },

        BlattwerkError::IntegrityMismatch { .. } => HumanError {
            message: "The saved file does not match what was written.".into(),
            suggestion: "Build or merge the document again; the copy on disk may be damaged."
                .into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        BlattwerkError::ProjectNotFound(_) => HumanError {
            message: "That project no longer exists.".into(),
            suggestion: "It may have been removed to make room for newer projects.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        BlattwerkError::Database(_) | BlattwerkError::Serialization(_) => HumanError {
            message: "The project history couldn't be read.".into(),
            suggestion: "Try clearing the project history.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_source_is_transient() {
        let err = BlattwerkError::unavailable("https://example.com/a.jpg", "timed out");
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn missing_local_file_needs_action() {
        let err = BlattwerkError::unavailable("/home/me/a.jpg", "not found");
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn share_unavailable_is_action_required() {
        let human = humanize_error(&BlattwerkError::ShareUnavailable);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn unparsable_merge_is_permanent() {
        let err = BlattwerkError::merge(Stage::Parse, "0 of 3 sources parsed");
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.retriable);
    }
}
