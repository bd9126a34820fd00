//! Typed command bus between the presentation layer and a `RecoverySession`.
//!
//! Commands arrive as `{"command": "...", "args": {...}}`. Destructive
//! commands must carry `confirmed: true` or they are refused before any
//! remote call.

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, RebateError};
use crate::services::recovery::{DeleteOutcome, SaveRecoveryRequest};
use crate::session::RecoverySession;
use crate::types::{BatchReport, DashboardSummary, EvidenceFile, FilterCriteria, TaskPage};

#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "command",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    GetFilteredPage,
    GetDashboard,
    SetFilter(FilterCriteria),
    SetPage {
        page: usize,
    },
    SetItemsPerPage {
        items_per_page: usize,
    },
    EnterBatchMode,
    ExitBatchMode,
    ToggleSelection {
        task_id: String,
    },
    SelectAllEligible,
    ClearSelection,
    SaveRecovery {
        task_id: String,
        request: SaveRecoveryRequest,
    },
    DeleteRecovery {
        task_id: String,
        #[serde(default)]
        confirmed: bool,
    },
    BatchFullRecovery,
    QuickFullRecovery {
        task_id: String,
    },
    AddEvidence {
        task_id: String,
        files: Vec<EvidenceFile>,
    },
    RemoveEvidence {
        task_id: String,
        index: usize,
        #[serde(default)]
        confirmed: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetFilteredPage => "getFilteredPage",
            Command::GetDashboard => "getDashboard",
            Command::SetFilter(_) => "setFilter",
            Command::SetPage { .. } => "setPage",
            Command::SetItemsPerPage { .. } => "setItemsPerPage",
            Command::EnterBatchMode => "enterBatchMode",
            Command::ExitBatchMode => "exitBatchMode",
            Command::ToggleSelection { .. } => "toggleSelection",
            Command::SelectAllEligible => "selectAllEligible",
            Command::ClearSelection => "clearSelection",
            Command::SaveRecovery { .. } => "saveRecovery",
            Command::DeleteRecovery { .. } => "deleteRecovery",
            Command::BatchFullRecovery => "batchFullRecovery",
            Command::QuickFullRecovery { .. } => "quickFullRecovery",
            Command::AddEvidence { .. } => "addEvidence",
            Command::RemoveEvidence { .. } => "removeEvidence",
        }
    }
}

/// Result of a dispatched command.
#[derive(Debug, Clone, Serialize)]
#[allow(clippy::large_enum_variant)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CommandOutcome {
    Ok,
    Page(TaskPage),
    Dashboard(DashboardSummary),
    Saved,
    Deleted(DeleteOutcome),
    QuickRecovered { written: bool },
    Batch(BatchReport),
    EvidenceAdded { urls: Vec<String> },
    EvidenceRemoved { urls: Vec<String> },
    SelectionChanged { count: usize },
}

fn require_confirmation(confirmed: bool) -> Result<(), RebateError> {
    if confirmed {
        Ok(())
    } else {
        Err(RebateError::ConfirmationRequired)
    }
}

impl RecoverySession {
    /// Route one command to the session.
    pub async fn dispatch(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        let name = command.name();
        log::debug!("Dispatching {}", name);
        self.run(command).await.map_err(|e| {
            log::warn!("{} failed: {}", name, e);
            CommandError::from(&e)
        })
    }

    async fn run(&mut self, command: Command) -> Result<CommandOutcome, RebateError> {
        let outcome = match command {
            Command::GetFilteredPage => CommandOutcome::Page(self.get_filtered_page()),
            Command::GetDashboard => CommandOutcome::Dashboard(self.get_dashboard()),
            Command::SetFilter(criteria) => {
                self.set_filter(criteria);
                CommandOutcome::Ok
            }
            Command::SetPage { page } => {
                self.set_page(page);
                CommandOutcome::Ok
            }
            Command::SetItemsPerPage { items_per_page } => {
                self.set_items_per_page(items_per_page)?;
                CommandOutcome::Ok
            }
            Command::EnterBatchMode => {
                self.enter_batch_mode();
                CommandOutcome::Ok
            }
            Command::ExitBatchMode => {
                self.exit_batch_mode();
                CommandOutcome::Ok
            }
            Command::ToggleSelection { task_id } => {
                self.toggle_selection(&task_id);
                CommandOutcome::SelectionChanged {
                    count: self.selection().len(),
                }
            }
            Command::SelectAllEligible => CommandOutcome::SelectionChanged {
                count: self.select_all_eligible(),
            },
            Command::ClearSelection => {
                self.clear_selection();
                CommandOutcome::SelectionChanged { count: 0 }
            }
            Command::SaveRecovery { task_id, request } => {
                self.save_recovery(&task_id, &request).await?;
                CommandOutcome::Saved
            }
            Command::DeleteRecovery { task_id, confirmed } => {
                require_confirmation(confirmed)?;
                CommandOutcome::Deleted(self.delete_recovery(&task_id).await?)
            }
            Command::BatchFullRecovery => CommandOutcome::Batch(self.batch_full_recovery().await),
            Command::QuickFullRecovery { task_id } => CommandOutcome::QuickRecovered {
                written: self.quick_full_recovery(&task_id).await?,
            },
            Command::AddEvidence { task_id, files } => CommandOutcome::EvidenceAdded {
                urls: self.add_evidence(&task_id, &files).await?,
            },
            Command::RemoveEvidence {
                task_id,
                index,
                confirmed,
            } => {
                require_confirmation(confirmed)?;
                CommandOutcome::EvidenceRemoved {
                    urls: self.remove_evidence(&task_id, index).await?,
                }
            }
        };
        Ok(outcome)
    }
}
