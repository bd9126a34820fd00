use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::*;
use crate::types::{CollaborationStatus, TalentSource};

const RECORD_COLUMNS: &str = "id, project_id, talent_id, talent_name, talent_source, status,
    publish_date, rebate_receivable, actual_rebate, recovery_date,
    discrepancy_reason, discrepancy_reason_updated_at, evidence_urls";

/// Raw column values before enum/date/JSON decoding.
struct RawRecord {
    id: String,
    project_id: String,
    talent_id: String,
    talent_name: String,
    talent_source: String,
    status: String,
    publish_date: Option<String>,
    rebate_receivable: Option<f64>,
    actual_rebate: Option<f64>,
    recovery_date: Option<String>,
    discrepancy_reason: Option<String>,
    discrepancy_reason_updated_at: Option<String>,
    evidence_urls: String,
}

fn map_raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        talent_id: row.get(2)?,
        talent_name: row.get(3)?,
        talent_source: row.get(4)?,
        status: row.get(5)?,
        publish_date: row.get(6)?,
        rebate_receivable: row.get(7)?,
        actual_rebate: row.get(8)?,
        recovery_date: row.get(9)?,
        discrepancy_reason: row.get(10)?,
        discrepancy_reason_updated_at: row.get(11)?,
        evidence_urls: row.get(12)?,
    })
}

fn parse_date_column(id: &str, value: Option<String>) -> Result<Option<NaiveDate>, DbError> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|e| DbError::CorruptRow {
                id: id.to_string(),
                detail: format!("bad date {}: {}", v, e),
            })
        })
        .transpose()
}

impl RawRecord {
    fn decode(self) -> Result<CollaborationRecord, DbError> {
        let corrupt = |detail: String| DbError::CorruptRow {
            id: self.id.clone(),
            detail,
        };
        let talent_source = TalentSource::parse(&self.talent_source)
            .ok_or_else(|| corrupt(format!("unknown talent source {}", self.talent_source)))?;
        let status = CollaborationStatus::parse(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status {}", self.status)))?;
        let evidence_urls: Vec<String> = serde_json::from_str(&self.evidence_urls)
            .map_err(|e| corrupt(format!("bad evidence list: {}", e)))?;
        let reason_updated_at = self
            .discrepancy_reason_updated_at
            .as_deref()
            .map(|v| {
                DateTime::parse_from_rfc3339(v)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| corrupt(format!("bad timestamp {}: {}", v, e)))
            })
            .transpose()?;

        Ok(CollaborationRecord {
            publish_date: parse_date_column(&self.id, self.publish_date)?,
            recovery_date: parse_date_column(&self.id, self.recovery_date)?,
            id: self.id,
            project_id: self.project_id,
            talent_id: self.talent_id,
            talent_name: self.talent_name,
            talent_source,
            status,
            rebate_receivable: self.rebate_receivable,
            actual_rebate: self.actual_rebate,
            discrepancy_reason: self.discrepancy_reason,
            discrepancy_reason_updated_at: reason_updated_at,
            evidence_urls,
        })
    }
}

fn select_one(conn: &Connection, id: &str) -> Result<Option<CollaborationRecord>, DbError> {
    let sql = format!("SELECT {} FROM collaborations WHERE id = ?1", RECORD_COLUMNS);
    let raw = conn
        .query_row(&sql, params![id], map_raw_row)
        .optional()?;
    raw.map(RawRecord::decode).transpose()
}

fn write_record(conn: &Connection, record: &CollaborationRecord) -> Result<(), DbError> {
    let evidence = serde_json::to_string(&record.evidence_urls).map_err(|e| {
        DbError::CorruptRow {
            id: record.id.clone(),
            detail: e.to_string(),
        }
    })?;
    conn.execute(
        "INSERT INTO collaborations (
            id, project_id, talent_id, talent_name, talent_source, status,
            publish_date, rebate_receivable, actual_rebate, recovery_date,
            discrepancy_reason, discrepancy_reason_updated_at, evidence_urls, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
            project_id = excluded.project_id,
            talent_id = excluded.talent_id,
            talent_name = excluded.talent_name,
            talent_source = excluded.talent_source,
            status = excluded.status,
            publish_date = excluded.publish_date,
            rebate_receivable = excluded.rebate_receivable,
            actual_rebate = excluded.actual_rebate,
            recovery_date = excluded.recovery_date,
            discrepancy_reason = excluded.discrepancy_reason,
            discrepancy_reason_updated_at = excluded.discrepancy_reason_updated_at,
            evidence_urls = excluded.evidence_urls,
            updated_at = excluded.updated_at",
        params![
            record.id,
            record.project_id,
            record.talent_id,
            record.talent_name,
            record.talent_source.as_str(),
            record.status.as_str(),
            record.publish_date.map(|d| d.format("%Y-%m-%d").to_string()),
            record.rebate_receivable,
            record.actual_rebate,
            record.recovery_date.map(|d| d.format("%Y-%m-%d").to_string()),
            record.discrepancy_reason,
            record.discrepancy_reason_updated_at.map(|t| t.to_rfc3339()),
            evidence,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl RebateDb {
    // =========================================================================
    // Collaborations
    // =========================================================================

    /// Insert or replace a collaboration record. Existing rows keep their
    /// position in list order.
    pub fn upsert_collaboration(&self, record: &CollaborationRecord) -> Result<(), DbError> {
        self.with_conn(|conn| write_record(conn, record))
    }

    pub fn get_collaboration(&self, id: &str) -> Result<Option<CollaborationRecord>, DbError> {
        self.with_conn(|conn| select_one(conn, id))
    }

    /// List records in insertion order, narrowed by the query hints.
    pub fn query_records(&self, query: &RecordQuery) -> Result<Vec<CollaborationRecord>, DbError> {
        let sql = format!(
            "SELECT {} FROM collaborations
             WHERE (?1 IS NULL OR talent_source = ?1)
               AND (?2 IS NULL OR status = ?2)
             ORDER BY rowid",
            RECORD_COLUMNS
        );
        let raws = self.with_conn(|conn| -> Result<Vec<RawRecord>, DbError> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![
                    query.talent_source.map(|s| s.as_str()),
                    query.status.map(|s| s.as_str()),
                ],
                map_raw_row,
            )?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;
        raws.into_iter().map(RawRecord::decode).collect()
    }

    /// Apply a partial update. Returns `false` when no such record exists.
    pub fn patch_collaboration(&self, id: &str, patch: &RecordPatch) -> Result<bool, DbError> {
        self.with_transaction(|conn| {
            let Some(mut record) = select_one(conn, id)? else {
                return Ok(false);
            };
            patch.apply_to(&mut record);
            write_record(conn, &record)?;
            Ok(true)
        })
    }
}
