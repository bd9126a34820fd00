//! In-memory fakes for the remote seams, with failure and latency injection.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BlobStore, CollaborationSource, ProjectLookup};
use crate::error::RemoteError;
use crate::types::{CollaborationRecord, EvidenceFile, Project, RecordPatch, RecordQuery};

#[derive(Default)]
pub struct MemorySource {
    records: Mutex<Vec<CollaborationRecord>>,
    projects: Mutex<Vec<Project>>,
    failing_patches: Mutex<HashSet<String>>,
    patch_calls: Mutex<Vec<(String, RecordPatch)>>,
    list_calls: Mutex<usize>,
    lists_down: Mutex<bool>,
}

impl MemorySource {
    pub fn new(records: Vec<CollaborationRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn with_projects(self, projects: &[(&str, &str)]) -> Self {
        *self.projects.lock() = projects
            .iter()
            .map(|(id, name)| Project {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect();
        self
    }

    /// Make every patch against `id` fail with a 500.
    pub fn fail_patches_for(&self, id: &str) {
        self.failing_patches.lock().insert(id.to_string());
    }

    /// Make every later `list_records` call fail with a network error.
    pub fn fail_lists(&self) {
        *self.lists_down.lock() = true;
    }

    pub fn record(&self, id: &str) -> Option<CollaborationRecord> {
        self.records.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn patch_calls(&self) -> Vec<(String, RecordPatch)> {
        self.patch_calls.lock().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock()
    }
}

#[async_trait]
impl CollaborationSource for MemorySource {
    async fn list_records(
        &self,
        _query: &RecordQuery,
    ) -> Result<Vec<CollaborationRecord>, RemoteError> {
        *self.list_calls.lock() += 1;
        if *self.lists_down.lock() {
            return Err(RemoteError::Network("listing unavailable".to_string()));
        }
        Ok(self.records.lock().clone())
    }

    async fn get_record(&self, id: &str) -> Result<Option<CollaborationRecord>, RemoteError> {
        Ok(self.record(id))
    }

    async fn patch_record(&self, id: &str, patch: &RecordPatch) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        self.patch_calls
            .lock()
            .push((id.to_string(), patch.clone()));
        if self.failing_patches.lock().contains(id) {
            return Err(RemoteError::Status {
                code: 500,
                body: "injected failure".to_string(),
            });
        }
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        patch.apply_to(record);
        Ok(())
    }
}

#[async_trait]
impl ProjectLookup for MemorySource {
    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError> {
        Ok(self.projects.lock().clone())
    }
}

/// Blob store that hands out `mem://{file_name}` URLs.
#[derive(Default)]
pub struct FakeBlobStore {
    upload_delays: Mutex<HashMap<String, Duration>>,
    failing_uploads: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    completed_uploads: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    delete_attempts: Mutex<Vec<String>>,
}

impl FakeBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_for(file_name: &str) -> String {
        format!("mem://{}", file_name)
    }

    pub fn delay_upload(&self, file_name: &str, millis: u64) {
        self.upload_delays
            .lock()
            .insert(file_name.to_string(), Duration::from_millis(millis));
    }

    pub fn fail_upload(&self, file_name: &str) {
        self.failing_uploads.lock().insert(file_name.to_string());
    }

    pub fn fail_delete(&self, url: &str) {
        self.failing_deletes.lock().insert(url.to_string());
    }

    /// File names in the order their uploads finished.
    pub fn completed_uploads(&self) -> Vec<String> {
        self.completed_uploads.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn delete_attempts(&self) -> Vec<String> {
        self.delete_attempts.lock().clone()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn upload(&self, file: &EvidenceFile) -> Result<String, RemoteError> {
        let delay = self.upload_delays.lock().get(&file.file_name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_uploads.lock().contains(&file.file_name) {
            return Err(RemoteError::Network("injected upload failure".to_string()));
        }
        self.completed_uploads.lock().push(file.file_name.clone());
        Ok(Self::url_for(&file.file_name))
    }

    async fn delete(&self, url: &str) -> Result<(), RemoteError> {
        self.delete_attempts.lock().push(url.to_string());
        if self.failing_deletes.lock().contains(url) {
            return Err(RemoteError::Network("injected delete failure".to_string()));
        }
        self.deleted.lock().push(url.to_string());
        Ok(())
    }
}
