//! Process-level state on disk: `~/.rebatedesk/config.json`, the per-user
//! preference file, and wiring the configured collaborators.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::RebateDb;
use crate::error::{RebateError, RebateResult};
use crate::services::filter::validate_items_per_page;
use crate::source::{
    BlobStore, CollaborationSource, FsBlobStore, HttpBlobStore, ProjectLookup,
    RestCollaborationClient,
};
use crate::types::{Config, DEFAULT_ITEMS_PER_PAGE};

/// `~/.rebatedesk`
pub fn state_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".rebatedesk"))
}

pub fn config_path() -> Result<PathBuf, String> {
    Ok(state_dir()?.join("config.json"))
}

/// Load `~/.rebatedesk/config.json`. A missing file means defaults (local store).
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        log::info!(
            "No config at {}, using the local store",
            path.display()
        );
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    if config.batch_concurrency == 0 {
        return Err("batchConcurrency must be at least 1".to_string());
    }
    Ok(config)
}

// =============================================================================
// Preferences (~/.rebatedesk/preferences.json)
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items_per_page: Option<usize>,
    /// Keys written by other tools are carried through untouched.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    users: BTreeMap<String, UserPreferences>,
}

/// Per-user preferences that survive restarts, keyed by user key.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Result<PathBuf, String> {
        Ok(state_dir()?.join("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RebateResult<PreferencesFile> {
        if !self.path.exists() {
            return Ok(PreferencesFile::default());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| RebateError::Preference(format!("Failed to read preferences: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| RebateError::Preference(format!("Failed to parse preferences: {}", e)))
    }

    /// Stored page size for `user_key`, or the default when nothing usable is stored.
    pub fn load_items_per_page(&self, user_key: &str) -> usize {
        let stored = match self.read() {
            Ok(file) => file.users.get(user_key).and_then(|u| u.items_per_page),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        };
        match stored {
            Some(n) if validate_items_per_page(n).is_ok() => n,
            Some(n) => {
                log::warn!("Ignoring stored itemsPerPage {} for {}", n, user_key);
                DEFAULT_ITEMS_PER_PAGE
            }
            None => DEFAULT_ITEMS_PER_PAGE,
        }
    }

    /// Persist `items_per_page` for `user_key`. Other users' entries are kept.
    pub fn save_items_per_page(&self, user_key: &str, items_per_page: usize) -> RebateResult<()> {
        let items_per_page = validate_items_per_page(items_per_page)?;

        // A corrupt file is replaced rather than blocking the preference forever.
        let mut file = self.read().unwrap_or_else(|e| {
            log::warn!("{}; rewriting preferences", e);
            PreferencesFile::default()
        });
        file.users
            .entry(user_key.to_string())
            .or_default()
            .items_per_page = Some(items_per_page);

        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| RebateError::Preference(format!("Failed to serialize preferences: {}", e)))?;
        crate::util::atomic_write_str(&self.path, &content)
            .map_err(|e| RebateError::Preference(format!("Failed to write preferences: {}", e)))?;
        log::debug!("Saved itemsPerPage={} for {}", items_per_page, user_key);
        Ok(())
    }
}

// =============================================================================
// Collaborators
// =============================================================================

/// The three seams a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn CollaborationSource>,
    pub projects: Arc<dyn ProjectLookup>,
    pub blobs: Arc<dyn BlobStore>,
}

/// Wire collaborators from config: the remote API when `api` is set, else the
/// local SQLite store; the remote blob store when `blobApi` is set, else a
/// local evidence directory.
pub fn build_collaborators(config: &Config) -> Result<Collaborators, String> {
    let (source, projects): (Arc<dyn CollaborationSource>, Arc<dyn ProjectLookup>) =
        match &config.api {
            Some(endpoint) => {
                let client = Arc::new(
                    RestCollaborationClient::new(endpoint)
                        .map_err(|e| format!("Invalid api config: {}", e))?,
                );
                log::info!("Using collaboration API at {}", endpoint.base_url);
                let source: Arc<dyn CollaborationSource> = client.clone();
                (source, client as Arc<dyn ProjectLookup>)
            }
            None => {
                let db = match &config.db_path {
                    Some(path) => RebateDb::open_at(PathBuf::from(path)),
                    None => RebateDb::open(),
                }
                .map_err(|e| format!("Failed to open rebate store: {}", e))?;
                let db = Arc::new(db);
                let source: Arc<dyn CollaborationSource> = db.clone();
                (source, db as Arc<dyn ProjectLookup>)
            }
        };

    let blobs: Arc<dyn BlobStore> = match (&config.blob_api, &config.blob_dir) {
        (Some(endpoint), _) => Arc::new(
            HttpBlobStore::new(endpoint).map_err(|e| format!("Invalid blobApi config: {}", e))?,
        ),
        (None, Some(dir)) => Arc::new(FsBlobStore::new(dir)),
        (None, None) => Arc::new(FsBlobStore::new(
            FsBlobStore::default_root().map_err(|e| e.to_string())?,
        )),
    };

    Ok(Collaborators {
        source,
        projects,
        blobs,
    })
}
