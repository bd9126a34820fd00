//! Reconciliation state classifier.
//!
//! Settlement state is always derived from `actual_rebate` vs
//! `rebate_receivable` and never stored, so it cannot drift from the fields
//! it describes.

use serde::Serialize;

use crate::types::RebateTask;

/// Amounts within one cent of each other are considered equal. Fixed contract.
pub const RECOVERY_TOLERANCE: f64 = 0.01;

/// Slack for binary float representation, so 999.99 vs 1000.00 is still
/// within one cent.
const FLOAT_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryState {
    NotRecovered,
    RecoveredMatched,
    RecoveredWithDiscrepancy,
}

impl RecoveryState {
    pub fn is_recovered(&self) -> bool {
        !matches!(self, RecoveryState::NotRecovered)
    }
}

/// True when `actual` differs from `receivable` by more than the tolerance.
pub fn is_discrepancy(actual: f64, receivable: f64) -> bool {
    (actual - receivable).abs() > RECOVERY_TOLERANCE + FLOAT_SLACK
}

pub fn classify(task: &RebateTask) -> RecoveryState {
    match task.recovered_amount() {
        None => RecoveryState::NotRecovered,
        Some(actual) if is_discrepancy(actual, task.rebate_receivable) => {
            RecoveryState::RecoveredWithDiscrepancy
        }
        Some(_) => RecoveryState::RecoveredMatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::task;

    #[test]
    fn test_null_actual_is_not_recovered() {
        let t = task("c1", "p1", "Mia", 1000.0);
        assert_eq!(classify(&t), RecoveryState::NotRecovered);
        assert!(!classify(&t).is_recovered());
    }

    #[test]
    fn test_exact_match() {
        let mut t = task("c1", "p1", "Mia", 1000.0);
        t.actual_rebate = Some(1000.0);
        assert_eq!(classify(&t), RecoveryState::RecoveredMatched);
        assert!(classify(&t).is_recovered());
    }

    #[test]
    fn test_one_cent_either_side_is_matched() {
        let mut t = task("c1", "p1", "Mia", 1000.0);
        t.actual_rebate = Some(999.99);
        assert_eq!(classify(&t), RecoveryState::RecoveredMatched);
        t.actual_rebate = Some(1000.01);
        assert_eq!(classify(&t), RecoveryState::RecoveredMatched);
    }

    #[test]
    fn test_beyond_tolerance_is_discrepancy() {
        let mut t = task("c1", "p1", "Mia", 1000.0);
        t.actual_rebate = Some(999.98);
        assert_eq!(classify(&t), RecoveryState::RecoveredWithDiscrepancy);
        t.actual_rebate = Some(950.0);
        assert_eq!(classify(&t), RecoveryState::RecoveredWithDiscrepancy);
        t.actual_rebate = Some(1200.0);
        assert_eq!(classify(&t), RecoveryState::RecoveredWithDiscrepancy);
    }

    #[test]
    fn test_non_finite_actual_counts_as_not_recovered() {
        let mut t = task("c1", "p1", "Mia", 1000.0);
        t.actual_rebate = Some(f64::NAN);
        assert_eq!(classify(&t), RecoveryState::NotRecovered);
    }
}
