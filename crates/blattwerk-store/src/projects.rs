// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Project history backed by SQLite.
//
// A project remembers the images, settings, and output of a conversion so it
// can be rebuilt later. The table is capped: saving beyond capacity evicts the
// oldest project by insertion order, in the same transaction as the insert.

use std::cell::Cell;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info, instrument};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{NewProject, ProjectId, ProjectRecord, ProjectUpdate};

/// Default number of projects kept.
pub const DEFAULT_MAX_PROJECTS: usize = 50;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS projects (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        images TEXT NOT NULL,
        settings TEXT NOT NULL,
        pdf_path TEXT,
        notes TEXT
    )
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, name, created_at, updated_at, images, settings, pdf_path, notes FROM projects";

/// Aggregate figures over the stored projects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub count: usize,
    pub total_images: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Capped project history.
///
/// Synchronous like `rusqlite` itself; wrap calls in
/// `tokio::task::spawn_blocking` from async code.
pub struct ProjectStore {
    conn: Connection,
    capacity: usize,
    /// Last timestamp handed out, so successive writes are strictly ordered.
    last_stamp: Cell<Option<DateTime<Utc>>>,
}

impl ProjectStore {
    /// Open (or create) the project database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), capacity))]
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| BlattwerkError::Database(format!("open: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| BlattwerkError::Database(format!("WAL pragma: {e}")))?;
        let store = Self::with_connection(conn, capacity)?;
        info!("project database opened");
        Ok(store)
    }

    /// An in-memory store, gone when dropped.
    pub fn open_in_memory(capacity: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BlattwerkError::Database(format!("open in-memory: {e}")))?;
        Self::with_connection(conn, capacity)
    }

    fn with_connection(conn: Connection, capacity: usize) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| BlattwerkError::Database(format!("create table: {e}")))?;
        Ok(Self {
            conn,
            capacity: capacity.max(1),
            last_stamp: Cell::new(None),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // -- Writes ---------------------------------------------------------------

    /// Save a new project, evicting the oldest ones first if the store is full.
    #[instrument(skip_all, fields(name = %project.name))]
    pub fn save(&self, project: NewProject) -> Result<ProjectRecord> {
        let now = self.stamp();
        let record = ProjectRecord {
            id: ProjectId::new(),
            name: project.name,
            created_at: now,
            updated_at: now,
            images: project.images,
            settings: project.settings,
            pdf_path: project.pdf_path,
            notes: project.notes,
        };
        let images_json = serde_json::to_string(&record.images)
            .map_err(|e| BlattwerkError::Database(format!("serialize images: {e}")))?;
        let settings_json = serde_json::to_string(&record.settings)
            .map_err(|e| BlattwerkError::Database(format!("serialize settings: {e}")))?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| BlattwerkError::Database(format!("begin: {e}")))?;

        let count: i64 = tx
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
            .map_err(|e| BlattwerkError::Database(format!("count: {e}")))?;
        let excess = count + 1 - self.capacity as i64;
        if excess > 0 {
            let evicted = tx
                .execute(
                    "DELETE FROM projects WHERE seq IN
                     (SELECT seq FROM projects ORDER BY seq ASC LIMIT ?1)",
                    params![excess],
                )
                .map_err(|e| BlattwerkError::Database(format!("evict: {e}")))?;
            debug!(evicted, "oldest projects evicted");
        }

        tx.execute(
            "INSERT INTO projects
                 (id, name, created_at, updated_at, images, settings, pdf_path, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.to_string(),
                record.name,
                timestamp(&record.created_at),
                timestamp(&record.updated_at),
                images_json,
                settings_json,
                record.pdf_path,
                record.notes,
            ],
        )
        .map_err(|e| BlattwerkError::Database(format!("insert project: {e}")))?;

        tx.commit()
            .map_err(|e| BlattwerkError::Database(format!("commit: {e}")))?;

        info!(project_id = %record.id, "project saved");
        Ok(record)
    }

    /// Apply `update` to an existing project and bump its `updated_at`.
    #[instrument(skip(self, update), fields(project_id = %id))]
    pub fn update(&self, id: &ProjectId, update: ProjectUpdate) -> Result<ProjectRecord> {
        let mut record = self.require(id)?;
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(images) = update.images {
            record.images = images;
        }
        if let Some(settings) = update.settings {
            record.settings = settings;
        }
        if update.pdf_path.is_some() {
            record.pdf_path = update.pdf_path;
        }
        if update.notes.is_some() {
            record.notes = update.notes;
        }
        record.updated_at = self.stamp();

        let images_json = serde_json::to_string(&record.images)
            .map_err(|e| BlattwerkError::Database(format!("serialize images: {e}")))?;
        let settings_json = serde_json::to_string(&record.settings)
            .map_err(|e| BlattwerkError::Database(format!("serialize settings: {e}")))?;

        self.conn
            .execute(
                "UPDATE projects SET name = ?1, updated_at = ?2, images = ?3, settings = ?4,
                 pdf_path = ?5, notes = ?6 WHERE id = ?7",
                params![
                    record.name,
                    timestamp(&record.updated_at),
                    images_json,
                    settings_json,
                    record.pdf_path,
                    record.notes,
                    id.to_string(),
                ],
            )
            .map_err(|e| BlattwerkError::Database(format!("update project: {e}")))?;

        debug!("project updated");
        Ok(record)
    }

    /// Mark a project as used now, moving it to the front of
    /// [`sorted_by_updated`](Self::sorted_by_updated).
    #[instrument(skip(self), fields(project_id = %id))]
    pub fn touch(&self, id: &ProjectId) -> Result<ProjectRecord> {
        let mut record = self.require(id)?;
        record.updated_at = self.stamp();
        self.conn
            .execute(
                "UPDATE projects SET updated_at = ?1 WHERE id = ?2",
                params![timestamp(&record.updated_at), id.to_string()],
            )
            .map_err(|e| BlattwerkError::Database(format!("touch project: {e}")))?;
        Ok(record)
    }

    #[instrument(skip(self), fields(project_id = %id))]
    pub fn delete(&self, id: &ProjectId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])
            .map_err(|e| BlattwerkError::Database(format!("delete project: {e}")))?;
        if rows == 0 {
            return Err(BlattwerkError::ProjectNotFound(id.to_string()));
        }
        info!("project deleted");
        Ok(())
    }

    /// Remove every project, returning how many there were.
    pub fn delete_all(&self) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM projects", [])
            .map_err(|e| BlattwerkError::Database(format!("delete all: {e}")))?;
        info!(rows, "all projects deleted");
        Ok(rows)
    }

    // -- Reads ----------------------------------------------------------------

    pub fn get(&self, id: &ProjectId) -> Result<Option<ProjectRecord>> {
        self.conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.to_string()],
                row_to_project,
            )
            .optional()
            .map_err(|e| BlattwerkError::Database(format!("get project: {e}")))
    }

    /// All projects, oldest first.
    pub fn all(&self) -> Result<Vec<ProjectRecord>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY seq ASC"), [])
    }

    /// Projects whose name or notes contain `query`, ignoring case.
    pub fn search(&self, query: &str) -> Result<Vec<ProjectRecord>> {
        let needle = query.trim();
        if needle.is_empty() {
            return self.all();
        }
        self.query(
            &format!(
                "{SELECT_COLUMNS} WHERE instr(lower(name), lower(?1)) > 0
                 OR instr(lower(coalesce(notes, '')), lower(?1)) > 0
                 ORDER BY seq ASC"
            ),
            params![needle],
        )
    }

    /// Projects ordered by last update.
    pub fn sorted_by_updated(&self, descending: bool) -> Result<Vec<ProjectRecord>> {
        let order = if descending { "DESC" } else { "ASC" };
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY updated_at {order}, seq {order}"),
            [],
        )
    }

    pub fn stats(&self) -> Result<ProjectStats> {
        let projects = self.all()?;
        Ok(ProjectStats {
            count: projects.len(),
            total_images: projects.iter().map(|p| p.images.len()).sum(),
            oldest: projects.iter().map(|p| p.created_at).min(),
            newest: projects.iter().map(|p| p.created_at).max(),
        })
    }

    // -- Helpers --------------------------------------------------------------

    fn require(&self, id: &ProjectId) -> Result<ProjectRecord> {
        self.get(id)?
            .ok_or_else(|| BlattwerkError::ProjectNotFound(id.to_string()))
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<ProjectRecord>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| BlattwerkError::Database(format!("prepare: {e}")))?;
        let projects = stmt
            .query_map(params, row_to_project)
            .map_err(|e| BlattwerkError::Database(format!("query: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BlattwerkError::Database(format!("collect rows: {e}")))?;
        debug!(count = projects.len(), "projects retrieved");
        Ok(projects)
    }

    /// Current time at microsecond precision, strictly after the previous
    /// stamp from this handle.
    fn stamp(&self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let stamp = match self.last_stamp.get() {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_stamp.set(Some(stamp));
        stamp
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Fixed-width RFC 3339 so that text order is time order.
fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_failure<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_failure(column, e))
}

/// Column order must match [`SELECT_COLUMNS`].
fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRecord> {
    let id_str: String = row.get(0)?;
    let created_at_str: String = row.get(2)?;
    let updated_at_str: String = row.get(3)?;
    let images_json: String = row.get(4)?;
    let settings_json: String = row.get(5)?;

    let id = uuid::Uuid::parse_str(&id_str).map_err(|e| conversion_failure(0, e))?;

    Ok(ProjectRecord {
        id: ProjectId(id),
        name: row.get(1)?,
        created_at: parse_timestamp(2, &created_at_str)?,
        updated_at: parse_timestamp(3, &updated_at_str)?,
        images: serde_json::from_str(&images_json).map_err(|e| conversion_failure(4, e))?,
        settings: serde_json::from_str(&settings_json).map_err(|e| conversion_failure(5, e))?,
        pdf_path: row.get(6)?,
        notes: row.get(7)?,
    })
}
