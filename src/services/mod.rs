//! Reconciliation services.
//!
//! Pure projections (tasks, filter, dashboard) and the write paths
//! (recovery, batch, evidence) that go through the collaboration source
//! and blob store seams.

pub mod batch;
pub mod dashboard;
pub mod evidence;
pub mod filter;
pub mod recovery;
pub mod tasks;

#[cfg(test)]
pub mod test_utils;
