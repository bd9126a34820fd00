//! Rebate reconciliation and recovery tracking for wild-talent collaborations.
//!
//! Published collaborations that owe a platform rebate are projected into
//! rebate tasks. A `RecoverySession` filters and pages them, summarizes them
//! on the dashboard, and records recoveries (single, batch, or with evidence)
//! back to the collaboration source.

pub mod classifier;
pub mod commands;
pub mod db;
pub mod error;
mod migrations;
pub mod services;
pub mod session;
pub mod source;
pub mod state;
pub mod types;
pub mod util;

pub use commands::{Command, CommandOutcome};
pub use error::{CommandError, RebateError, RebateResult};
pub use session::RecoverySession;
