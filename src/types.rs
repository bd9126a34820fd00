//! Shared domain types: collaboration records, derived rebate tasks, filters,
//! pagination views and the configuration file shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::classifier::RecoveryState;

/// Default page size when the user has never picked one.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 15;

/// Upper bound accepted for the per-user page size preference.
pub const MAX_ITEMS_PER_PAGE: usize = 100;

/// Maximum number of evidence screenshots attached to one collaboration.
pub const MAX_EVIDENCE: usize = 5;

// =============================================================================
// Collaboration records (owned by the upstream execution workflow)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TalentSource {
    WildTalent,
    AgencyTalent,
}

impl TalentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TalentSource::WildTalent => "wildTalent",
            TalentSource::AgencyTalent => "agencyTalent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wildTalent" => Some(TalentSource::WildTalent),
            "agencyTalent" => Some(TalentSource::AgencyTalent),
            _ => None,
        }
    }
}

/// Execution status of a collaboration. Only `Published` collaborations
/// produce rebate tasks; the rest are carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollaborationStatus {
    Pending,
    Scheduled,
    Published,
    Cancelled,
}

impl CollaborationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollaborationStatus::Pending => "pending",
            CollaborationStatus::Scheduled => "scheduled",
            CollaborationStatus::Published => "published",
            CollaborationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(CollaborationStatus::Pending),
            "scheduled" => Some(CollaborationStatus::Scheduled),
            "published" => Some(CollaborationStatus::Published),
            "cancelled" => Some(CollaborationStatus::Cancelled),
            _ => None,
        }
    }
}

/// A collaboration as returned by the collaboration source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationRecord {
    pub id: String,
    pub project_id: String,
    pub talent_id: String,
    pub talent_name: String,
    pub talent_source: TalentSource,
    pub status: CollaborationStatus,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    /// Precomputed by the upstream metrics step.
    #[serde(default, deserialize_with = "lenient_money")]
    pub rebate_receivable: Option<f64>,
    #[serde(default, deserialize_with = "lenient_money")]
    pub actual_rebate: Option<f64>,
    #[serde(default)]
    pub recovery_date: Option<NaiveDate>,
    #[serde(default)]
    pub discrepancy_reason: Option<String>,
    #[serde(default)]
    pub discrepancy_reason_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub evidence_urls: Vec<String>,
}

/// Accepts a JSON number, a numeric string, or null. Anything non-numeric
/// (including NaN/inf) is read as "no amount recorded".
fn lenient_money<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(serde_json::Value::String(s)) => crate::util::parse_money(&s),
        _ => None,
    })
}

/// Partial update sent to the collaboration source.
///
/// The outer `Option` means "field not touched"; the inner one carries an
/// explicit null. Only touched fields are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_rebate: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy_reason: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy_reason_updated_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_urls: Option<Vec<String>>,
}

impl RecordPatch {
    /// Apply the touched fields onto a record in place.
    pub fn apply_to(&self, record: &mut CollaborationRecord) {
        if let Some(v) = self.actual_rebate {
            record.actual_rebate = v;
        }
        if let Some(v) = self.recovery_date {
            record.recovery_date = v;
        }
        if let Some(ref v) = self.discrepancy_reason {
            record.discrepancy_reason = v.clone();
        }
        if let Some(v) = self.discrepancy_reason_updated_at {
            record.discrepancy_reason_updated_at = v;
        }
        if let Some(ref v) = self.evidence_urls {
            record.evidence_urls = v.clone();
        }
    }
}

/// Server-side narrowing hint for `list_records`. Sources may ignore it; the
/// task aggregator re-applies the eligibility predicate either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub talent_source: Option<TalentSource>,
    pub status: Option<CollaborationStatus>,
}

impl RecordQuery {
    /// The narrowest query that still returns every rebate-eligible record.
    pub fn rebate_candidates() -> Self {
        Self {
            talent_source: Some(TalentSource::WildTalent),
            status: Some(CollaborationStatus::Published),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Derived views
// =============================================================================

/// A "rebate owed" row. Rebuilt from scratch on every reload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebateTask {
    pub id: String,
    pub project_id: String,
    pub project_name: Option<String>,
    pub talent_id: String,
    pub talent_name: String,
    pub publish_date: Option<NaiveDate>,
    pub rebate_receivable: f64,
    pub actual_rebate: Option<f64>,
    pub recovery_date: Option<NaiveDate>,
    pub discrepancy_reason: Option<String>,
    pub discrepancy_reason_updated_at: Option<DateTime<Utc>>,
    pub evidence_urls: Vec<String>,
}

impl RebateTask {
    /// Recovered amount, if one is recorded and numeric.
    pub fn recovered_amount(&self) -> Option<f64> {
        self.actual_rebate.filter(|v| v.is_finite())
    }

    pub fn state(&self) -> RecoveryState {
        crate::classifier::classify(self)
    }
}

/// Row shape handed to the presentation layer: the task plus its derived state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    #[serde(flatten)]
    pub task: RebateTask,
    pub state: RecoveryState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Pending,
    Recovered,
    Discrepancy,
}

impl StatusClass {
    pub fn matches(&self, state: RecoveryState) -> bool {
        matches!(
            (self, state),
            (StatusClass::Pending, RecoveryState::NotRecovered)
                | (StatusClass::Recovered, RecoveryState::RecoveredMatched)
                | (StatusClass::Discrepancy, RecoveryState::RecoveredWithDiscrepancy)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    /// `None` (or `"all"`) means every project.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub status_class: Option<StatusClass>,
    #[serde(default)]
    pub talent_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationCursor {
    pub current_page: usize,
    pub items_per_page: usize,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            current_page: 1,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

/// Result of `getFilteredPage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<TaskRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total_count: usize,
}

/// Result of `getDashboard`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_receivable: f64,
    pub total_recovered: f64,
    pub recovery_rate: f64,
    pub todo_count: usize,
    pub discrepancy_count: usize,
}

/// Outcome of a bulk full recovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub success_count: usize,
    pub failed_count: usize,
    /// True when the selection held no eligible task and nothing was written.
    pub nothing_to_recover: bool,
}

/// A screenshot handed over by the caller for upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl EvidenceFile {
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }
}

// =============================================================================
// Configuration (~/.rebatedesk/config.json)
// =============================================================================

fn default_user_key() -> String {
    "default".to_string()
}

fn default_batch_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEndpoint {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Key under which per-user preferences are stored.
    #[serde(default = "default_user_key")]
    pub user_key: String,
    /// Local SQLite working store. Defaults to `~/.rebatedesk/rebatedesk.db`.
    #[serde(default)]
    pub db_path: Option<String>,
    /// Local evidence directory. Defaults to `~/.rebatedesk/evidence`.
    #[serde(default)]
    pub blob_dir: Option<String>,
    /// Remote collaboration-records API. When unset the local store is used.
    #[serde(default)]
    pub api: Option<RemoteEndpoint>,
    /// Remote blob store. When unset evidence lives under `blob_dir`.
    #[serde(default)]
    pub blob_api: Option<RemoteEndpoint>,
    /// Upper bound on concurrent writes during a batch recovery.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_key: default_user_key(),
            db_path: None,
            blob_dir: None,
            api: None,
            blob_api: None,
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_lenient_money() {
        let json = r#"{
            "id": "c1",
            "projectId": "p1",
            "talentId": "t1",
            "talentName": "Mia",
            "talentSource": "wildTalent",
            "status": "published",
            "publishDate": "2024-01-05",
            "rebateReceivable": "1000.00",
            "actualRebate": "n/a",
            "evidenceUrls": ["a", "b"]
        }"#;
        let record: CollaborationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.rebate_receivable, Some(1000.0));
        assert_eq!(record.actual_rebate, None);
        assert_eq!(record.recovery_date, None);
        assert_eq!(record.evidence_urls, vec!["a", "b"]);
    }

    #[test]
    fn test_patch_serializes_only_touched_fields() {
        let patch = RecordPatch {
            actual_rebate: Some(None),
            evidence_urls: Some(vec![]),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "actualRebate": null, "evidenceUrls": [] })
        );
    }

    #[test]
    fn test_status_class_maps_onto_states() {
        assert!(StatusClass::Pending.matches(RecoveryState::NotRecovered));
        assert!(StatusClass::Recovered.matches(RecoveryState::RecoveredMatched));
        assert!(StatusClass::Discrepancy.matches(RecoveryState::RecoveredWithDiscrepancy));
        assert!(!StatusClass::Recovered.matches(RecoveryState::RecoveredWithDiscrepancy));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.batch_concurrency, 4);
    }
}
