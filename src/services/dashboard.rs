// Dashboard aggregator: summary figures over the filtered (pre-pagination) set.

use crate::classifier::RecoveryState;
use crate::types::{DashboardSummary, RebateTask};

/// Fold the filtered tasks into the dashboard figures.
///
/// `recovery_rate` is a ratio (1.0 = fully recovered) and is exactly 0 when
/// nothing is receivable.
pub fn summarize(filtered: &[&RebateTask]) -> DashboardSummary {
    let mut summary = filtered
        .iter()
        .fold(DashboardSummary::default(), |mut acc, task| {
            acc.total_receivable += task.rebate_receivable;
            match task.recovered_amount() {
                Some(amount) => acc.total_recovered += amount,
                None => acc.todo_count += 1,
            }
            if task.state() == RecoveryState::RecoveredWithDiscrepancy {
                acc.discrepancy_count += 1;
            }
            acc
        });

    summary.recovery_rate = if summary.total_receivable > 0.0 {
        summary.total_recovered / summary.total_receivable
    } else {
        0.0
    };
    summary
}
