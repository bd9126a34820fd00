// Recovery command processor: single-task save, delete and quick full recovery.
// Validation runs to completion before anything reaches the collaboration source.

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::classifier::is_discrepancy;
use crate::error::{RebateResult, ValidationError};
use crate::source::{BlobStore, CollaborationSource};
use crate::types::{RebateTask, RecordPatch};
use crate::util::{non_blank, parse_date, parse_money};

/// Fields as entered in the recovery form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecoveryRequest {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Evidence list to persist. `None` keeps the task's current evidence.
    #[serde(default)]
    pub evidence: Option<Vec<String>>,
}

/// Result of a delete, for the caller's toast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    /// False when the task had nothing recorded and no write happened.
    pub cleared: bool,
    /// Evidence blobs that could not be removed and may now be orphaned.
    pub orphaned_blobs: usize,
}

/// Validate a save request against the task and build the patch to persist.
///
/// Checks, in order: amount/date supplied together, amount numeric, reason
/// present on discrepancy, evidence present on discrepancy.
pub fn validate_recovery(
    task: &RebateTask,
    request: &SaveRecoveryRequest,
) -> Result<RecordPatch, ValidationError> {
    let amount_raw = non_blank(request.amount.as_deref());
    let date_raw = non_blank(request.date.as_deref());

    let (amount, date): (Option<f64>, Option<NaiveDate>) = match (amount_raw, date_raw) {
        (None, None) => (None, None),
        (Some(_), None) | (None, Some(_)) => {
            return Err(ValidationError::InvalidInput(
                "amount and recovery date must be entered together".to_string(),
            ))
        }
        (Some(amount), Some(date)) => {
            let amount = parse_money(amount).ok_or_else(|| {
                ValidationError::InvalidInput(format!("amount is not a number: {}", amount))
            })?;
            let date = parse_date(date).ok_or_else(|| {
                ValidationError::InvalidInput(format!("recovery date is not YYYY-MM-DD: {}", date))
            })?;
            (Some(amount), Some(date))
        }
    };

    let reason = non_blank(request.reason.as_deref()).map(str::to_string);
    let evidence = request
        .evidence
        .clone()
        .unwrap_or_else(|| task.evidence_urls.clone());

    let discrepancy = amount.is_some_and(|a| is_discrepancy(a, task.rebate_receivable));
    if discrepancy && reason.is_none() {
        return Err(ValidationError::MissingReason);
    }
    if discrepancy && evidence.is_empty() {
        return Err(ValidationError::MissingEvidence);
    }
    if evidence.len() > crate::types::MAX_EVIDENCE {
        return Err(ValidationError::InvalidInput(format!(
            "at most {} evidence screenshots are allowed",
            crate::types::MAX_EVIDENCE
        )));
    }

    let reason_updated_at = if reason == task.discrepancy_reason {
        None
    } else if reason.is_some() {
        Some(Some(Utc::now()))
    } else {
        Some(None)
    };

    Ok(RecordPatch {
        actual_rebate: Some(amount),
        recovery_date: Some(date),
        discrepancy_reason: Some(reason),
        discrepancy_reason_updated_at: reason_updated_at,
        evidence_urls: Some(evidence),
    })
}

/// Validate and persist a recovery. The caller reloads afterwards.
pub async fn save_recovery(
    source: &dyn CollaborationSource,
    task: &RebateTask,
    request: &SaveRecoveryRequest,
) -> RebateResult<()> {
    let patch = validate_recovery(task, request)?;
    source.patch_record(&task.id, &patch).await?;
    log::info!(
        "Saved recovery for {} ({:?})",
        task.id,
        patch.actual_rebate.flatten()
    );
    Ok(())
}

/// Patch that marks a task recovered in full today. Evidence is left untouched.
pub fn full_recovery_patch(task: &RebateTask, today: NaiveDate) -> RecordPatch {
    let mut patch = RecordPatch {
        actual_rebate: Some(Some(task.rebate_receivable)),
        recovery_date: Some(Some(today)),
        discrepancy_reason: Some(None),
        ..Default::default()
    };
    if task.discrepancy_reason_updated_at.is_some() {
        patch.discrepancy_reason_updated_at = Some(None);
    }
    patch
}

/// Mark a single not-yet-recovered task as recovered in full.
///
/// Returns `Ok(false)` without writing when the task already has a recovery.
pub async fn quick_full_recovery(
    source: &dyn CollaborationSource,
    task: &RebateTask,
    today: NaiveDate,
) -> RebateResult<bool> {
    if task.state().is_recovered() {
        log::debug!("Quick recovery skipped for {}: already recovered", task.id);
        return Ok(false);
    }
    source
        .patch_record(&task.id, &full_recovery_patch(task, today))
        .await?;
    log::info!("Quick full recovery for {}", task.id);
    Ok(true)
}

/// Delete every evidence blob, settling all of them. Returns how many failed.
pub async fn delete_blobs(blobs: &dyn BlobStore, urls: &[String]) -> usize {
    let results = join_all(urls.iter().map(|url| blobs.delete(url))).await;
    let mut failed = 0;
    for (url, result) in urls.iter().zip(results) {
        if let Err(e) = result {
            failed += 1;
            log::warn!("Failed to delete evidence blob {}: {}", url, e);
        }
    }
    failed
}

/// Clear a task's recovery.
///
/// Phase 1 removes evidence blobs best-effort; phase 2 clears the record
/// whether or not phase 1 succeeded. A task with nothing recorded is a no-op.
pub async fn delete_recovery(
    source: &dyn CollaborationSource,
    blobs: &dyn BlobStore,
    task: &RebateTask,
) -> RebateResult<DeleteOutcome> {
    if !task.state().is_recovered() {
        return Ok(DeleteOutcome::default());
    }

    let orphaned_blobs = delete_blobs(blobs, &task.evidence_urls).await;
    if orphaned_blobs > 0 {
        log::warn!(
            "{} evidence blob(s) for {} may be orphaned",
            orphaned_blobs,
            task.id
        );
    }

    let patch = RecordPatch {
        actual_rebate: Some(None),
        recovery_date: Some(None),
        discrepancy_reason: Some(None),
        discrepancy_reason_updated_at: Some(None),
        evidence_urls: Some(Vec::new()),
    };
    source.patch_record(&task.id, &patch).await?;
    log::info!("Cleared recovery for {}", task.id);

    Ok(DeleteOutcome {
        cleared: true,
        orphaned_blobs,
    })
}
