//! SQLite-based local working store for collaboration records and projects.
//!
//! The database lives at `~/.rebatedesk/rebatedesk.db`. It mirrors the
//! upstream collaboration source so the reconciliation desk can run against a
//! local copy, and implements the same `CollaborationSource` / `ProjectLookup`
//! seams as the remote client.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::RemoteError;
use crate::source::{CollaborationSource, ProjectLookup};
use crate::types::{CollaborationRecord, Project, RecordPatch, RecordQuery};

pub mod projects;
pub mod records;
pub mod types;
pub use types::*;

pub struct RebateDb {
    /// rusqlite::Connection is Send but not Sync; the async seams need both.
    conn: Mutex<Connection>,
}

impl RebateDb {
    /// Run a closure against the connection.
    pub fn with_conn<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Connection) -> T,
    {
        let guard = self.conn.lock();
        f(&guard)
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let guard = self.conn.lock();
        guard.execute_batch("BEGIN IMMEDIATE")?;
        match f(&guard) {
            Ok(val) => {
                guard.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = guard.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at `~/.rebatedesk/rebatedesk.db` and apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        log::debug!("Opened rebate store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".rebatedesk").join("rebatedesk.db"))
    }
}

#[async_trait]
impl CollaborationSource for RebateDb {
    async fn list_records(
        &self,
        query: &RecordQuery,
    ) -> Result<Vec<CollaborationRecord>, RemoteError> {
        Ok(self.query_records(query)?)
    }

    async fn get_record(&self, id: &str) -> Result<Option<CollaborationRecord>, RemoteError> {
        Ok(self.get_collaboration(id)?)
    }

    async fn patch_record(&self, id: &str, patch: &RecordPatch) -> Result<(), RemoteError> {
        if self.patch_collaboration(id, patch)? {
            Ok(())
        } else {
            Err(RemoteError::NotFound(id.to_string()))
        }
    }
}

#[async_trait]
impl ProjectLookup for RebateDb {
    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError> {
        Ok(self.get_all_projects()?)
    }
}

// =============================================================================
// Test utilities
// =============================================================================
