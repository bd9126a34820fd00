// Batch recovery orchestrator: bulk full recovery over a selection.
// Every eligible selected task gets exactly one outcome; a failure never aborts the rest.

use std::collections::HashSet;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::services::recovery::full_recovery_patch;
use crate::source::CollaborationSource;
use crate::types::{BatchReport, RebateTask};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    #[default]
    Off,
    On,
}

/// Ids eligible for "select all": not-yet-recovered tasks among those given
/// (the caller passes the current page only).
pub fn eligible_ids<'a>(tasks: impl IntoIterator<Item = &'a RebateTask>) -> HashSet<String> {
    tasks
        .into_iter()
        .filter(|t| !t.state().is_recovered())
        .map(|t| t.id.clone())
        .collect()
}

/// Re-check a possibly stale selection against the current task list.
/// Unknown ids and already-recovered tasks drop out; task-list order is kept.
pub fn eligible_selection<'a>(
    tasks: &'a [RebateTask],
    selection: &HashSet<String>,
) -> Vec<&'a RebateTask> {
    tasks
        .iter()
        .filter(|t| selection.contains(&t.id) && !t.state().is_recovered())
        .collect()
}

/// Mark every eligible selected task as recovered in full on `today`.
///
/// Writes run with up to `concurrency` in flight. Returns the count summary;
/// `nothing_to_recover` is set (and nothing written) when no selected task is eligible.
pub async fn batch_full_recovery(
    source: &dyn CollaborationSource,
    tasks: &[RebateTask],
    selection: &HashSet<String>,
    today: NaiveDate,
    concurrency: usize,
) -> BatchReport {
    let eligible = eligible_selection(tasks, selection);
    if eligible.is_empty() {
        log::info!(
            "Batch recovery: nothing to recover ({} selected)",
            selection.len()
        );
        return BatchReport {
            nothing_to_recover: true,
            ..Default::default()
        };
    }

    let skipped = selection.len().saturating_sub(eligible.len());
    let outcomes: Vec<bool> = stream::iter(eligible)
        .map(|task| async move {
            let patch = full_recovery_patch(task, today);
            match source.patch_record(&task.id, &patch).await {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Batch recovery failed for {}: {}", task.id, e);
                    false
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let success_count = outcomes.iter().filter(|ok| **ok).count();
    let report = BatchReport {
        success_count,
        failed_count: outcomes.len() - success_count,
        nothing_to_recover: false,
    };
    log::info!(
        "Batch recovery finished: {} succeeded, {} failed, {} skipped as ineligible",
        report.success_count,
        report.failed_count,
        skipped
    );
    report
}
