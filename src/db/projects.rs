use chrono::Utc;
use rusqlite::params;

use super::*;

impl RebateDb {
    // =========================================================================
    // Projects
    // =========================================================================

    /// Insert or update a project's display name.
    pub fn upsert_project(&self, project: &Project) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, name, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    updated_at = excluded.updated_at",
                params![project.id, project.name, Utc::now().to_rfc3339()],
            )
        })?;
        Ok(())
    }

    /// Get all projects, ordered by name.
    pub fn get_all_projects(&self) -> Result<Vec<Project>, DbError> {
        self.with_conn(|conn| -> Result<Vec<Project>, DbError> {
            let mut stmt = conn.prepare("SELECT id, name FROM projects ORDER BY name")?;
            let rows = stmt.query_map([], |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}
