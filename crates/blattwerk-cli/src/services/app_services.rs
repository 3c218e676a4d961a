// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer - loads configuration, opens the project database,
// and hands out the encoder and output store the commands work with.

use std::path::{Path, PathBuf};
use std::time::Duration;

use blattwerk_core::AppConfig;
use blattwerk_core::error::Result;
use blattwerk_document::ImageEncoder;
use blattwerk_store::{ExportShare, OutputStore, ProjectStore, ShareTarget};
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";
const PROJECTS_DB: &str = "projects.db";
const DOCUMENTS_DIR: &str = "documents";

/// Everything a command needs, opened once per invocation.
pub struct AppServices {
    data_dir: PathBuf,
    config: AppConfig,
    projects: ProjectStore,
}

impl AppServices {
    /// Open services rooted at the standard data directory.
    pub fn init() -> Result<Self> {
        Self::open_in(data_dir::data_dir()?)
    }

    /// Open services rooted at `dir`.
    ///
    /// `dir` is created if missing. A missing or unreadable `config.json`
    /// falls back to defaults; an invalid one is rejected.
    pub fn open_in(dir: PathBuf) -> Result<Self> {
        info!(path = %dir.display(), "initialising app services");
        data_dir::ensure_dir(&dir)?;
        let config = match load_config(&dir) {
            Ok(Some(config)) => config,
            Ok(None) => AppConfig::default(),
            Err(e) => {
                warn!(error = %e, "config unreadable, using defaults");
                AppConfig::default()
            }
        };
        let config = config.validate()?;
        let projects = ProjectStore::open(dir.join(PROJECTS_DB), config.max_projects)?;
        Ok(Self {
            data_dir: dir,
            config,
            projects,
        })
    }

    /// Default config and an in-memory project history, for when the data
    /// directory cannot be used.
    pub fn fallback() -> Result<Self> {
        let config = AppConfig::default();
        let projects = ProjectStore::open_in_memory(config.max_projects)?;
        Ok(Self {
            data_dir: std::env::temp_dir().join("blattwerk"),
            config,
            projects,
        })
    }

    // -- Configuration --------------------------------------------------------

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Write the current configuration to `config.json`.
    pub fn save_config(&self) -> Result<PathBuf> {
        persist_config(&self.data_dir, &self.config)?;
        Ok(self.config_path())
    }

    // -- Backends -------------------------------------------------------------

    pub fn projects(&self) -> &ProjectStore {
        &self.projects
    }

    pub fn encoder(&self) -> Result<ImageEncoder> {
        ImageEncoder::new(Duration::from_secs(self.config.fetch_timeout_secs))
    }

    /// An output store rooted at `dir`, or at the configured output directory
    /// (`<data dir>/documents` by default).
    pub fn output_store(&self, dir: Option<&Path>) -> Result<OutputStore> {
        let root = match (dir, &self.config.output_dir) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(configured)) => configured.clone(),
            (None, None) => data_dir::subdir(&self.data_dir, DOCUMENTS_DIR)?,
        };
        Ok(match self.share_target() {
            Some(target) => OutputStore::new(root, target),
            None => OutputStore::without_sharing(root),
        })
    }

    fn share_target(&self) -> Option<Box<dyn ShareTarget>> {
        self.config
            .export_dir
            .as_ref()
            .map(|dir| Box::new(ExportShare::new(dir)) as Box<dyn ShareTarget>)
    }
}

// ---------------------------------------------------------------------------
// Config persistence
// ---------------------------------------------------------------------------

fn load_config(data_dir: &Path) -> Result<Option<AppConfig>> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&data)?))
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(data_dir.join(CONFIG_FILE), json)?;
    Ok(())
}
