//! Local blob store for evidence screenshots.
//!
//! Objects live at `{root}/{yyyymmdd}-{uuid}.{ext}` and are addressed by
//! `file://` URLs. Every upload gets its own object, so deleting evidence from
//! one task never breaks another task that attached the same screenshot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use super::BlobStore;
use crate::error::RemoteError;
use crate::types::EvidenceFile;

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location: `~/.rebatedesk/evidence`.
    pub fn default_root() -> Result<PathBuf, RemoteError> {
        let home = dirs::home_dir()
            .ok_or_else(|| RemoteError::Io("Home directory not found".to_string()))?;
        Ok(home.join(".rebatedesk").join("evidence"))
    }

    fn object_path(&self, file: &EvidenceFile) -> PathBuf {
        let stem = format!(
            "{}-{}",
            chrono::Utc::now().format("%Y%m%d"),
            uuid::Uuid::new_v4().simple()
        );
        let ext = Path::new(&file.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(crate::util::sanitize_file_name);
        match ext {
            Some(ext) => self.root.join(format!("{}.{}", stem, ext.to_lowercase())),
            None => self.root.join(stem),
        }
    }

    /// Resolve a `file://` URL back to a path inside the store root.
    fn path_for_url(&self, url: &str) -> Result<PathBuf, RemoteError> {
        let parsed = Url::parse(url)
            .map_err(|e| RemoteError::Storage(format!("Invalid blob URL {}: {}", url, e)))?;
        let path = parsed
            .to_file_path()
            .map_err(|_| RemoteError::Storage(format!("Not a file URL: {}", url)))?;
        if !path.starts_with(&self.root) {
            return Err(RemoteError::Storage(format!(
                "Blob URL outside store root: {}",
                url
            )));
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, file: &EvidenceFile) -> Result<String, RemoteError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.object_path(file);
        tokio::fs::write(&path, &file.bytes).await?;
        let url = Url::from_file_path(&path)
            .map_err(|_| RemoteError::Storage(format!("Non-absolute path {}", path.display())))?;
        log::debug!("Stored evidence {} at {}", file.file_name, path.display());
        Ok(url.to_string())
    }

    async fn delete(&self, url: &str) -> Result<(), RemoteError> {
        let path = self.path_for_url(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str, bytes: &[u8]) -> EvidenceFile {
        EvidenceFile::new(name, "image/png", bytes.to_vec())
    }

    #[tokio::test]
    async fn test_upload_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        let url = store.upload(&png("Receipt.PNG", b"abc")).await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with(".png"));
        let path = store.path_for_url(&url).unwrap();
        assert!(path.exists());

        store.delete(&url).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ack() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let url = store.upload(&png("a.png", b"abc")).await.unwrap();
        store.delete(&url).await.unwrap();
        store.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_identical_content_gets_separate_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let a = store.upload(&png("a.png", b"same")).await.unwrap();
        let b = store.upload(&png("a.png", b"same")).await.unwrap();
        assert_ne!(a, b);

        store.delete(&a).await.unwrap();
        assert!(store.path_for_url(&b).unwrap().exists());
    }

    #[tokio::test]
    async fn test_delete_outside_root_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("store"));
        let outside = Url::from_file_path(dir.path().join("other.png")).unwrap();
        assert!(store.delete(outside.as_str()).await.is_err());
    }
}
