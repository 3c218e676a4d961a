// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};

const APP_DIR: &str = "blattwerk";

/// The application data directory, created if needed.
///
/// `$XDG_DATA_HOME/blattwerk`, else `~/.local/share/blattwerk`.
pub fn data_dir() -> Result<PathBuf> {
    let dir = base_dir(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
    .join(APP_DIR);
    ensure_dir(&dir)?;
    Ok(dir)
}

/// A subdirectory of `parent` (e.g. "documents"), created if needed.
pub fn subdir(parent: &Path, name: &str) -> Result<PathBuf> {
    let dir = parent.join(name);
    ensure_dir(&dir)?;
    Ok(dir)
}

fn base_dir(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    match (xdg_data_home, home) {
        (Some(xdg), _) if xdg.is_absolute() => xdg,
        (_, Some(home)) => home.join(".local").join("share"),
        // Last resort
        _ => std::env::temp_dir(),
    }
}

/// Create `dir` and its parents.
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| BlattwerkError::StorageFailure(format!("create {}: {e}", dir.display())))
}
