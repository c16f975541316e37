//! Application configuration
//!
//! Read from a TOML file; every field has a default so an absent file or a
//! partial file both work:
//!
//! ```toml
//! data_dir = "/home/me/.local/share/donkeycards"
//!
//! [remote]
//! kind = "http"
//! base_url = "https://catalog.example.com/v1"
//! token = "..."
//!
//! [cache]
//! refresh_interval_secs = 21600
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::policy::{DEFAULT_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS};
use crate::cache::{Collections, RefreshPolicy};
use crate::remote::{DocumentStore, FileDocumentStore, HttpDocumentStore, RemoteError};
use crate::storage::{KvStore, StorageError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Remote store: {0}")]
    Remote(#[from] RemoteError),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which document store implementation to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// Collection exports in a local directory
    #[default]
    File,
    /// Collections served over HTTP
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub kind: RemoteKind,
    /// Export directory (file store)
    pub path: Option<PathBuf>,
    /// Service root (HTTP store)
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub cards_collection: String,
    pub languages_collection: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        let collections = Collections::default();
        Self {
            kind: RemoteKind::default(),
            path: None,
            base_url: None,
            token: None,
            timeout_secs: 30,
            cards_collection: collections.cards,
            languages_collection: collections.languages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub refresh_interval_secs: u64,
    pub refresh_floor_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS as u64,
            refresh_floor_secs: MIN_REFRESH_INTERVAL_SECS as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Where caches and progress live; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("donkeycards").join("config.toml"))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Load from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(KvStore::default_data_dir()?),
        }
    }

    /// The key/blob store under the data dir
    pub fn open_store(&self) -> Result<KvStore> {
        Ok(KvStore::open(self.data_dir()?.join("store"))?)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::from_secs(self.cache.refresh_interval_secs, self.cache.refresh_floor_secs)
    }

    pub fn collections(&self) -> Collections {
        Collections {
            cards: self.remote.cards_collection.clone(),
            languages: self.remote.languages_collection.clone(),
        }
    }

    /// Build the configured document store
    pub fn document_store(&self) -> Result<Arc<dyn DocumentStore>> {
        match self.remote.kind {
            RemoteKind::File => {
                let dir = match &self.remote.path {
                    Some(path) => path.clone(),
                    None => self.data_dir()?.join("export"),
                };
                Ok(Arc::new(FileDocumentStore::new(dir)?))
            }
            RemoteKind::Http => {
                let base_url = self.remote.base_url.clone().ok_or_else(|| {
                    RemoteError::Misconfigured("remote.base_url is required for kind = \"http\"".to_string())
                })?;
                Ok(Arc::new(HttpDocumentStore::new(
                    base_url,
                    self.remote.token.clone(),
                    Duration::from_secs(self.remote.timeout_secs),
                )?))
            }
        }
    }
}
