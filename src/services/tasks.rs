// Task aggregator: projects eligible collaboration records into rebate tasks.
// The list is rebuilt in full on every reload; nothing is diffed.

use std::collections::HashMap;

use crate::types::{CollaborationRecord, CollaborationStatus, RebateTask, TalentSource};

/// Only published wild-talent collaborations with a positive receivable owe a rebate.
pub fn is_rebate_eligible(record: &CollaborationRecord) -> bool {
    record.talent_source == TalentSource::WildTalent
        && record.status == CollaborationStatus::Published
        && record.rebate_receivable.is_some_and(|v| v.is_finite() && v > 0.0)
}

/// Build the task list. Input order is preserved; duplicate talent names are fine.
pub fn build_tasks(
    records: &[CollaborationRecord],
    project_names: &HashMap<String, String>,
) -> Vec<RebateTask> {
    records
        .iter()
        .filter(|r| is_rebate_eligible(r))
        .map(|r| RebateTask {
            id: r.id.clone(),
            project_id: r.project_id.clone(),
            project_name: project_names.get(&r.project_id).cloned(),
            talent_id: r.talent_id.clone(),
            talent_name: r.talent_name.clone(),
            publish_date: r.publish_date,
            rebate_receivable: r.rebate_receivable.unwrap_or_default(),
            actual_rebate: r.actual_rebate,
            recovery_date: r.recovery_date,
            discrepancy_reason: r.discrepancy_reason.clone(),
            discrepancy_reason_updated_at: r.discrepancy_reason_updated_at,
            evidence_urls: r.evidence_urls.clone(),
        })
        .collect()
}
