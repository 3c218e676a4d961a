// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ConversionSettings;
use crate::error::{BlattwerkError, Result};

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Settings applied when a build request does not override them.
    pub default_settings: ConversionSettings,
    /// Where finished PDFs are written (defaults to `<data dir>/documents`).
    pub output_dir: Option<PathBuf>,
    /// Export target for sharing. Sharing is unavailable when unset.
    pub export_dir: Option<PathBuf>,
    /// Project history cap; the oldest project is evicted beyond this.
    pub max_projects: usize,
    /// Timeout for fetching remote images, in seconds.
    pub fetch_timeout_secs: u64,
    /// Margin on every side of the page, in millimetres.
    pub print_margin_mm: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_settings: ConversionSettings::default(),
            output_dir: None,
            export_dir: None,
            max_projects: 50,
            fetch_timeout_secs: 30,
            print_margin_mm: 5.0,
        }
    }
}

impl AppConfig {
    /// Reject settings no build could honour.
    ///
    /// The margin must leave a printable area on the default page size in
    /// either orientation.
    pub fn validate(self) -> Result<Self> {
        let margin = self.print_margin_mm;
        let (width, height) = self.default_settings.page_size.portrait_mm();
        let shortest = width.min(height);
        if !margin.is_finite() || margin < 0.0 || 2.0 * margin >= shortest {
            return Err(BlattwerkError::InvalidInput(format!(
                "print_margin_mm {margin} must be at least 0 and below {}",
                shortest / 2.0
            )));
        }
        Ok(self)
    }
}
