//! Recovery session: the single controller owning the task list, filter,
//! pagination cursor, selection and batch mode.
//!
//! Every command takes `&mut self`, so commands on one session never overlap.
//! Each write is followed by a full reload from the collaboration source.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{RebateError, RebateResult};
use crate::services::batch::{self, BatchMode};
use crate::services::recovery::{self, DeleteOutcome, SaveRecoveryRequest};
use crate::services::{dashboard, evidence, filter, tasks};
use crate::state::{Collaborators, PreferenceStore};
use crate::source::{BlobStore, CollaborationSource, ProjectLookup};
use crate::types::{
    BatchReport, DashboardSummary, EvidenceFile, FilterCriteria, PaginationCursor, RebateTask,
    RecordQuery, TaskPage,
};

pub struct RecoverySession {
    source: Arc<dyn CollaborationSource>,
    projects: Arc<dyn ProjectLookup>,
    blobs: Arc<dyn BlobStore>,
    preferences: PreferenceStore,
    user_key: String,
    batch_concurrency: usize,

    tasks: Vec<RebateTask>,
    filter: FilterCriteria,
    cursor: PaginationCursor,
    selection: HashSet<String>,
    batch_mode: BatchMode,
}

impl RecoverySession {
    /// Create a session. The task list is empty until the first `reload`.
    pub fn new(
        collaborators: Collaborators,
        preferences: PreferenceStore,
        user_key: &str,
        batch_concurrency: usize,
    ) -> Self {
        let items_per_page = preferences.load_items_per_page(user_key);
        Self {
            source: collaborators.source,
            projects: collaborators.projects,
            blobs: collaborators.blobs,
            preferences,
            user_key: user_key.to_string(),
            batch_concurrency: batch_concurrency.max(1),
            tasks: Vec::new(),
            filter: FilterCriteria::default(),
            cursor: PaginationCursor {
                current_page: 1,
                items_per_page,
            },
            selection: HashSet::new(),
            batch_mode: BatchMode::Off,
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Rebuild the task list from scratch and clamp the cursor.
    ///
    /// A failed project lookup degrades to tasks without project names; a
    /// failed record listing leaves the previous list in place.
    pub async fn reload(&mut self) -> RebateResult<()> {
        let records = self
            .source
            .list_records(&RecordQuery::rebate_candidates())
            .await?;
        let names = match self.projects.project_names().await {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Project lookup failed, showing tasks without names: {}", e);
                Default::default()
            }
        };

        self.tasks = tasks::build_tasks(&records, &names);
        self.clamp_page();
        log::debug!(
            "Reloaded {} rebate task(s) from {} record(s)",
            self.tasks.len(),
            records.len()
        );
        Ok(())
    }

    /// Reload once a write has landed. The write stands even if the reload
    /// fails, so the failure is logged and the previous list kept.
    async fn reload_after_write(&mut self, command: &str) {
        if let Err(e) = self.reload().await {
            log::warn!("Reload after {} failed, showing the previous list: {}", command, e);
        }
    }

    fn filtered(&self) -> Vec<&RebateTask> {
        filter::filter_tasks(&self.tasks, &self.filter)
    }

    fn clamp_page(&mut self) {
        let total = filter::total_pages(self.filtered().len(), self.cursor.items_per_page);
        self.cursor.current_page = filter::clamp_page(self.cursor.current_page, total);
    }

    fn task(&self, task_id: &str) -> RebateResult<&RebateTask> {
        self.tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| RebateError::TaskNotFound(task_id.to_string()))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_filtered_page(&self) -> TaskPage {
        filter::page_window(&self.filtered(), &self.cursor)
    }

    /// Dashboard over the filtered set, not just the visible page.
    pub fn get_dashboard(&self) -> DashboardSummary {
        dashboard::summarize(&self.filtered())
    }

    pub fn tasks(&self) -> &[RebateTask] {
        &self.tasks
    }

    pub fn filter(&self) -> &FilterCriteria {
        &self.filter
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.cursor
    }

    pub fn selection(&self) -> &HashSet<String> {
        &self.selection
    }

    pub fn batch_mode(&self) -> BatchMode {
        self.batch_mode
    }

    // =========================================================================
    // View commands
    // =========================================================================

    /// Replace the filter. The current page is kept if still valid, else clamped.
    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        self.filter = criteria;
        self.clamp_page();
    }

    pub fn set_page(&mut self, page: usize) {
        self.cursor.current_page = page;
        self.clamp_page();
    }

    /// Change and persist the page size, then return to page 1.
    pub fn set_items_per_page(&mut self, items_per_page: usize) -> RebateResult<()> {
        let items_per_page = filter::validate_items_per_page(items_per_page)?;
        self.cursor.items_per_page = items_per_page;
        self.cursor.current_page = 1;
        // The in-memory size applies even if it cannot be saved.
        self.preferences
            .save_items_per_page(&self.user_key, items_per_page)
    }

    pub fn enter_batch_mode(&mut self) {
        self.batch_mode = BatchMode::On;
    }

    /// Leave batch mode. The selection is kept.
    pub fn exit_batch_mode(&mut self) {
        self.batch_mode = BatchMode::Off;
    }

    /// Flip `task_id` in the selection. Returns whether it is now selected.
    pub fn toggle_selection(&mut self, task_id: &str) -> bool {
        if self.selection.remove(task_id) {
            false
        } else {
            self.selection.insert(task_id.to_string());
            true
        }
    }

    /// Replace the selection with the not-yet-recovered tasks on the current page.
    pub fn select_all_eligible(&mut self) -> usize {
        let page = self.get_filtered_page();
        self.selection = batch::eligible_ids(page.tasks.iter().map(|row| &row.task));
        self.selection.len()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // =========================================================================
    // Write commands
    // =========================================================================

    pub async fn save_recovery(
        &mut self,
        task_id: &str,
        request: &SaveRecoveryRequest,
    ) -> RebateResult<()> {
        let task = self.task(task_id)?;
        recovery::save_recovery(self.source.as_ref(), task, request).await?;
        self.reload_after_write("save recovery").await;
        Ok(())
    }

    /// Clear a task's recovery. Callers must have confirmed.
    pub async fn delete_recovery(&mut self, task_id: &str) -> RebateResult<DeleteOutcome> {
        let task = self.task(task_id)?;
        let outcome =
            recovery::delete_recovery(self.source.as_ref(), self.blobs.as_ref(), task).await?;
        if outcome.cleared {
            self.reload_after_write("delete recovery").await;
        }
        Ok(outcome)
    }

    /// Returns false when the task was already recovered and nothing was written.
    pub async fn quick_full_recovery(&mut self, task_id: &str) -> RebateResult<bool> {
        let task = self.task(task_id)?;
        let written =
            recovery::quick_full_recovery(self.source.as_ref(), task, crate::util::today())
                .await?;
        if written {
            self.reload_after_write("quick full recovery").await;
        }
        Ok(written)
    }

    /// Recover the current selection in full.
    ///
    /// Per-task failures are counted, not raised. Unless there was nothing to
    /// recover, batch mode is switched off and the list reloaded. A failed
    /// reload is logged; the report still stands.
    pub async fn batch_full_recovery(&mut self) -> BatchReport {
        let report = batch::batch_full_recovery(
            self.source.as_ref(),
            &self.tasks,
            &self.selection,
            crate::util::today(),
            self.batch_concurrency,
        )
        .await;

        if !report.nothing_to_recover {
            self.batch_mode = BatchMode::Off;
            self.reload_after_write("batch recovery").await;
        }
        report
    }

    pub async fn add_evidence(
        &mut self,
        task_id: &str,
        files: &[EvidenceFile],
    ) -> RebateResult<Vec<String>> {
        self.task(task_id)?;
        let urls =
            evidence::add_evidence(self.source.as_ref(), self.blobs.as_ref(), task_id, files)
                .await?;
        self.reload_after_write("add evidence").await;
        Ok(urls)
    }

    /// Remove one screenshot. Callers must have confirmed.
    pub async fn remove_evidence(
        &mut self,
        task_id: &str,
        index: usize,
    ) -> RebateResult<Vec<String>> {
        self.task(task_id)?;
        let urls =
            evidence::remove_evidence(self.source.as_ref(), self.blobs.as_ref(), task_id, index)
                .await?;
        self.reload_after_write("remove evidence").await;
        Ok(urls)
    }
}
