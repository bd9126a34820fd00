//! HTTP clients for the remote collaboration-records API and blob store.
//!
//! Both use reqwest with optional Bearer token auth. The records API is a
//! plain JSON REST surface:
//! - `GET    {base}/collaborations?talentSource=&status=`
//! - `GET    {base}/collaborations/{id}`
//! - `PATCH  {base}/collaborations/{id}`
//! - `GET    {base}/projects`

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use super::{BlobStore, CollaborationSource, ProjectLookup};
use crate::error::RemoteError;
use crate::types::{
    CollaborationRecord, EvidenceFile, Project, RecordPatch, RecordQuery, RemoteEndpoint,
};

/// Parse a base URL and make sure it ends in `/` so segments append instead
/// of replacing the last path component.
fn parse_base(base_url: &str) -> Result<Url, RemoteError> {
    let mut base = Url::parse(base_url)
        .map_err(|e| RemoteError::Network(format!("Invalid base URL {}: {}", base_url, e)))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| RemoteError::Network(format!("Base URL cannot be a base: {}", base)))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let code = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status { code, body })
}

pub struct RestCollaborationClient {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl RestCollaborationClient {
    pub fn new(endpoint: &RemoteEndpoint) -> Result<Self, RemoteError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base: parse_base(&endpoint.base_url)?,
            token: endpoint.token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl CollaborationSource for RestCollaborationClient {
    async fn list_records(
        &self,
        query: &RecordQuery,
    ) -> Result<Vec<CollaborationRecord>, RemoteError> {
        let mut url = endpoint(&self.base, &["collaborations"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(source) = query.talent_source {
                pairs.append_pair("talentSource", source.as_str());
            }
            if let Some(status) = query.status {
                pairs.append_pair("status", status.as_str());
            }
        }

        let resp = self.request(reqwest::Method::GET, url).send().await?;
        let records: Vec<CollaborationRecord> = error_for_status(resp).await?.json().await?;
        log::debug!("Fetched {} collaboration records", records.len());
        Ok(records)
    }

    async fn get_record(&self, id: &str) -> Result<Option<CollaborationRecord>, RemoteError> {
        let url = endpoint(&self.base, &["collaborations", id])?;
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record = error_for_status(resp).await?.json().await?;
        Ok(Some(record))
    }

    async fn patch_record(&self, id: &str, patch: &RecordPatch) -> Result<(), RemoteError> {
        let url = endpoint(&self.base, &["collaborations", id])?;
        let resp = self
            .request(reqwest::Method::PATCH, url)
            .json(patch)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        error_for_status(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectLookup for RestCollaborationClient {
    async fn list_projects(&self) -> Result<Vec<Project>, RemoteError> {
        let url = endpoint(&self.base, &["projects"])?;
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        Ok(error_for_status(resp).await?.json().await?)
    }
}

/// Evidence blobs behind a plain PUT/DELETE object API.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(endpoint: &RemoteEndpoint) -> Result<Self, RemoteError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base: parse_base(&endpoint.base_url)?,
            token: endpoint.token.clone(),
        })
    }

    fn object_url(&self, file: &EvidenceFile) -> Result<Url, RemoteError> {
        let key = format!(
            "{}-{}",
            uuid::Uuid::new_v4(),
            crate::util::sanitize_file_name(&file.file_name)
        );
        endpoint(&self.base, &["evidence", &key])
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, file: &EvidenceFile) -> Result<String, RemoteError> {
        let url = self.object_url(file)?;
        let resp = self
            .request(reqwest::Method::PUT, url.clone())
            .header(reqwest::header::CONTENT_TYPE, file.content_type.clone())
            .body(file.bytes.clone())
            .send()
            .await?;
        let text = error_for_status(resp).await?.text().await.unwrap_or_default();

        // Stores that rewrite the key report the final URL as `{"url": ...}`.
        let reported = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("url").and_then(|u| u.as_str()).map(str::to_string));
        Ok(reported.unwrap_or_else(|| url.to_string()))
    }

    async fn delete(&self, url: &str) -> Result<(), RemoteError> {
        let target = Url::parse(url)
            .map_err(|e| RemoteError::Network(format!("Invalid blob URL {}: {}", url, e)))?;
        let resp = self.request(reqwest::Method::DELETE, target).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        error_for_status(resp).await?;
        Ok(())
    }
}
