//! Seams to the systems this crate consumes but does not own: the
//! collaboration-records API, the project directory, and the blob store.
//!
//! Every call is async and is a suspension point for the session. Adapters:
//! - `rest`: `reqwest` clients for the remote records API and blob store
//! - `blob`: a local filesystem blob store
//! - `crate::db::RebateDb`: the local SQLite working store

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{CollaborationRecord, EvidenceFile, Project, RecordPatch, RecordQuery};

pub mod blob;
pub mod rest;

#[cfg(test)]
pub mod test_utils;

pub use blob::FsBlobStore;
pub use rest::{HttpBlobStore, RestCollaborationClient};

/// Read/patch access to collaboration records.
#[async_trait]
pub trait CollaborationSource: Send + Sync {
    /// List records, optionally narrowed server-side. Order is preserved by
    /// every downstream stage.
    async fn list_records(&self, query: &RecordQuery)
        -> Result<Vec<CollaborationRecord>, RemoteError>;

    async fn get_record(&self, id: &str) -> Result<Option<CollaborationRecord>, RemoteError>;

    /// Apply a partial update. Last writer wins.
    async fn patch_record(&self, id: &str, patch: &RecordPatch) -> Result<(), RemoteError>;
}

/// Project id → display name join.
#[async_trait]
pub trait ProjectLookup: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError>;

    async fn project_names(&self) -> Result<HashMap<String, String>, RemoteError> {
        Ok(self
            .list_projects()
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect())
    }
}

/// Proof-of-payment screenshot storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a file and return the URL it can be fetched from.
    async fn upload(&self, file: &EvidenceFile) -> Result<String, RemoteError>;

    /// Delete a previously uploaded object. Deleting an unknown URL is an ack.
    async fn delete(&self, url: &str) -> Result<(), RemoteError>;
}
