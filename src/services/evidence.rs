// Evidence manager: proof-of-payment screenshots.
// Every mutation writes the whole evidence list back, never a delta.

use futures::future::join_all;

use crate::error::{RebateError, RebateResult, ValidationError};
use crate::services::recovery::delete_blobs;
use crate::source::{BlobStore, CollaborationSource};
use crate::types::{CollaborationRecord, EvidenceFile, RecordPatch, MAX_EVIDENCE};

async fn load_record(
    source: &dyn CollaborationSource,
    task_id: &str,
) -> RebateResult<CollaborationRecord> {
    source
        .get_record(task_id)
        .await?
        .ok_or_else(|| RebateError::TaskNotFound(task_id.to_string()))
}

async fn write_evidence(
    source: &dyn CollaborationSource,
    task_id: &str,
    urls: &[String],
) -> RebateResult<()> {
    let patch = RecordPatch {
        evidence_urls: Some(urls.to_vec()),
        ..Default::default()
    };
    source.patch_record(task_id, &patch).await?;
    Ok(())
}

/// Upload `files` and append their URLs to the task's evidence, in the order given.
///
/// Uploads run concurrently; `join_all` keeps results in input order no
/// matter which finishes first. If any upload fails, the ones that succeeded
/// are deleted again and nothing is written. Returns the new evidence list.
pub async fn add_evidence(
    source: &dyn CollaborationSource,
    blobs: &dyn BlobStore,
    task_id: &str,
    files: &[EvidenceFile],
) -> RebateResult<Vec<String>> {
    if files.is_empty() {
        return Err(ValidationError::InvalidInput("no evidence files given".to_string()).into());
    }

    let record = load_record(source, task_id).await?;
    let current = record.evidence_urls;
    if current.len() + files.len() > MAX_EVIDENCE {
        return Err(ValidationError::InvalidInput(format!(
            "a task holds at most {} screenshots ({} attached, {} new)",
            MAX_EVIDENCE,
            current.len(),
            files.len()
        ))
        .into());
    }

    let results = join_all(files.iter().map(|file| blobs.upload(file))).await;

    let mut uploaded = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(url) => uploaded.push(url),
            Err(e) => {
                log::warn!("Evidence upload failed for {}: {}", file.file_name, e);
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        delete_blobs(blobs, &uploaded).await;
        return Err(e.into());
    }

    let mut urls = current;
    urls.extend(uploaded.iter().cloned());
    if let Err(e) = write_evidence(source, task_id, &urls).await {
        delete_blobs(blobs, &uploaded).await;
        return Err(e);
    }

    log::info!("Attached {} evidence file(s) to {}", uploaded.len(), task_id);
    Ok(urls)
}

/// Remove the screenshot at `index`.
///
/// The blob delete is attempted first, but the list update is written
/// whether or not it succeeded. Callers must have confirmed the removal.
/// Returns the new evidence list.
pub async fn remove_evidence(
    source: &dyn CollaborationSource,
    blobs: &dyn BlobStore,
    task_id: &str,
    index: usize,
) -> RebateResult<Vec<String>> {
    let record = load_record(source, task_id).await?;
    let mut urls = record.evidence_urls;
    if index >= urls.len() {
        return Err(ValidationError::InvalidInput(format!(
            "evidence index {} out of range ({} attached)",
            index,
            urls.len()
        ))
        .into());
    }

    let url = urls.remove(index);
    if let Err(e) = blobs.delete(&url).await {
        log::warn!("Failed to delete evidence blob {}: {}", url, e);
    }

    write_evidence(source, task_id, &urls).await?;
    log::info!("Removed evidence #{} from {}", index, task_id);
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::record;
    use crate::source::test_utils::{FakeBlobStore, MemorySource};

    fn png(name: &str) -> EvidenceFile {
        EvidenceFile::new(name, "image/png", name.as_bytes().to_vec())
    }

    fn with_evidence(urls: &[&str]) -> MemorySource {
        let mut rec = record("c1", "p1", "Mia", 1000.0);
        rec.evidence_urls = urls.iter().map(|u| u.to_string()).collect();
        MemorySource::new(vec![rec])
    }

    #[tokio::test]
    async fn test_order_follows_input_not_completion() {
        let source = with_evidence(&["mem://existing"]);
        let blobs = FakeBlobStore::new();
        blobs.delay_upload("first.png", 60);
        blobs.delay_upload("second.png", 20);

        let files = vec![png("first.png"), png("second.png"), png("third.png")];
        let urls = add_evidence(&source, &blobs, "c1", &files).await.unwrap();

        // first.png finished last...
        assert_eq!(
            blobs.completed_uploads(),
            vec!["third.png", "second.png", "first.png"]
        );
        // ...but is still appended first.
        assert_eq!(
            urls,
            vec![
                "mem://existing",
                "mem://first.png",
                "mem://second.png",
                "mem://third.png"
            ]
        );
        assert_eq!(source.record("c1").unwrap().evidence_urls, urls);
    }

    #[tokio::test]
    async fn test_over_limit_rejected_before_upload() {
        let source = with_evidence(&["a", "b", "c", "d"]);
        let blobs = FakeBlobStore::new();
        let err = add_evidence(&source, &blobs, "c1", &[png("x.png"), png("y.png")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RebateError::Validation(ValidationError::InvalidInput(_))
        ));
        assert!(blobs.completed_uploads().is_empty());
        assert!(source.patch_calls().is_empty());
    }

    #[tokio::test]
    async fn test_exactly_five_is_allowed() {
        let source = with_evidence(&["a", "b", "c", "d"]);
        let blobs = FakeBlobStore::new();
        let urls = add_evidence(&source, &blobs, "c1", &[png("x.png")])
            .await
            .unwrap();
        assert_eq!(urls.len(), MAX_EVIDENCE);
    }

    #[tokio::test]
    async fn test_failed_upload_rolls_back_blobs() {
        let source = with_evidence(&[]);
        let blobs = FakeBlobStore::new();
        blobs.fail_upload("bad.png");
        let err = add_evidence(&source, &blobs, "c1", &[png("ok.png"), png("bad.png")])
            .await
            .unwrap_err();
        assert!(matches!(err, RebateError::Remote(_)));
        assert_eq!(blobs.deleted(), vec!["mem://ok.png"]);
        assert!(source.patch_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let source = with_evidence(&[]);
        let blobs = FakeBlobStore::new();
        let err = add_evidence(&source, &blobs, "nope", &[png("a.png")])
            .await
            .unwrap_err();
        assert!(matches!(err, RebateError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_writes_even_if_blob_delete_fails() {
        let source = with_evidence(&["mem://a", "mem://b", "mem://c"]);
        let blobs = FakeBlobStore::new();
        blobs.fail_delete("mem://b");

        let urls = remove_evidence(&source, &blobs, "c1", 1).await.unwrap();
        assert_eq!(urls, vec!["mem://a", "mem://c"]);
        assert_eq!(blobs.delete_attempts(), vec!["mem://b"]);
        assert_eq!(source.record("c1").unwrap().evidence_urls, urls);
    }

    #[tokio::test]
    async fn test_remove_out_of_range() {
        let source = with_evidence(&["mem://a"]);
        let blobs = FakeBlobStore::new();
        let err = remove_evidence(&source, &blobs, "c1", 1).await.unwrap_err();
        assert!(matches!(err, RebateError::Validation(_)));
        assert!(blobs.delete_attempts().is_empty());
    }
}
