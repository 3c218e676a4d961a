// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-store: where finished documents go: atomic persistence with
// SHA-256 fingerprints, hand-off to a share target, and the SQLite-backed
// project history.

pub mod integrity;
pub mod output;
pub mod projects;
pub mod share;

pub use output::{OutputStore, StoredDocument};
pub use projects::{ProjectStats, ProjectStore};
pub use share::{ExportShare, NoShare, ShareTarget};
