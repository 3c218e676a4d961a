// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module - building documents from images, merging, extraction, and
// inspection.

pub mod builder;
pub mod inspect;
pub mod merger;
pub(crate) mod tree;
pub mod watermark;

pub use builder::{BuildReport, DocumentBuilder};
pub use inspect::{DocumentSummary, PageSummary};
pub use merger::DocumentMerger;
pub use watermark::Watermark;
