//! Fixture builders shared by unit tests.

use crate::types::{CollaborationRecord, CollaborationStatus, RebateTask, TalentSource};

/// A published wild-talent collaboration with no recovery recorded yet.
pub fn record(id: &str, project_id: &str, talent_name: &str, receivable: f64) -> CollaborationRecord {
    CollaborationRecord {
        id: id.to_string(),
        project_id: project_id.to_string(),
        talent_id: format!("t-{}", id),
        talent_name: talent_name.to_string(),
        talent_source: TalentSource::WildTalent,
        status: CollaborationStatus::Published,
        publish_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 5),
        rebate_receivable: Some(receivable),
        actual_rebate: None,
        recovery_date: None,
        discrepancy_reason: None,
        discrepancy_reason_updated_at: None,
        evidence_urls: Vec::new(),
    }
}

pub fn task(id: &str, project_id: &str, talent_name: &str, receivable: f64) -> RebateTask {
    RebateTask {
        id: id.to_string(),
        project_id: project_id.to_string(),
        project_name: None,
        talent_id: format!("t-{}", id),
        talent_name: talent_name.to_string(),
        publish_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 5),
        rebate_receivable: receivable,
        actual_rebate: None,
        recovery_date: None,
        discrepancy_reason: None,
        discrepancy_reason_updated_at: None,
        evidence_urls: Vec::new(),
    }
}

/// A task already marked recovered with `actual`.
pub fn recovered_task(id: &str, receivable: f64, actual: f64) -> RebateTask {
    let mut t = task(id, "p1", "Mia", receivable);
    t.actual_rebate = Some(actual);
    t.recovery_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1);
    t
}
