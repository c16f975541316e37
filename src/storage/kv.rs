//! Key/blob store on the local file system
//!
//! Directory structure:
//! ```text
//! {data_dir}/store/
//! ├── languages.json
//! ├── cards.EN.json
//! ├── deck_5fprogress.json
//! └── refreshed_5fat.catalog.json
//! ```
//!
//! Structured values are wrapped in an [`Envelope`] carrying a schema version.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bumped whenever a persisted record changes shape
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema version {found} does not match expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Versioned wrapper around every structured value
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub payload: T,
}

/// Persisted key -> blob mapping, one file per key
#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("donkeycards"))
            .ok_or(StorageError::DataDirNotFound)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a key to its file
    ///
    /// ASCII letters, digits, `.` and `-` pass through; every other byte
    /// (including `_`) is written as `_xx` hex, so distinct keys never share
    /// a file.
    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    /// Write a value; goes through a temp file so readers never see a partial write
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.key_path(key).exists()
    }

    /// Remove every stored key
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    // ==================== Typed Access ====================

    /// Read and unwrap a versioned value
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Envelope<T>>> {
        let Some(bytes) = self.get(key)? else {
            return Ok(None);
        };

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct VersionProbe {
            schema_version: u32,
        }

        let probe: VersionProbe = serde_json::from_slice(&bytes)?;
        if probe.schema_version != SCHEMA_VERSION {
            return Err(StorageError::SchemaMismatch {
                found: probe.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Wrap a value in an envelope and write it
    pub fn set_json<T: Serialize>(&self, key: &str, payload: &T, saved_at: DateTime<Utc>) -> Result<()> {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            saved_at,
            payload,
        };
        self.set(key, &serde_json::to_vec_pretty(&envelope)?)
    }

    pub fn get_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_timestamp(&self, key: &str, time: DateTime<Utc>) -> Result<()> {
        self.set(key, &serde_json::to_vec(&time)?)
    }
}

fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("_{:02x}", byte));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (KvStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = KvStore::open(temp_dir.path().join("store")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_set_get_remove() {
        let (store, _temp) = create_test_store();

        assert!(store.get("missing").unwrap().is_none());

        store.set("greeting", b"hello").unwrap();
        assert!(store.contains("greeting"));
        assert_eq!(store.get("greeting").unwrap().unwrap(), b"hello");

        store.remove("greeting").unwrap();
        assert!(!store.contains("greeting"));
    }

    #[test]
    fn test_keys_are_sanitized() {
        let (store, _temp) = create_test_store();

        store.set("cards.Inglês/Brasil", b"x").unwrap();
        assert_eq!(store.get("cards.Inglês/Brasil").unwrap().unwrap(), b"x");
        assert!(!store.dir().join("Brasil.json").exists());
    }

    #[test]
    fn test_similar_keys_do_not_collide() {
        let (store, _temp) = create_test_store();
        let keys = ["cards.pt_BR", "cards.pt BR", "cards.pt/BR", "cards.pt_20BR"];

        for (i, key) in keys.iter().enumerate() {
            store.set(key, i.to_string().as_bytes()).unwrap();
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(store.get(key).unwrap().unwrap(), i.to_string().as_bytes());
        }
        assert_eq!(encode_key("cards.EN"), "cards.EN");
        assert_eq!(encode_key("refreshed_at.catalog"), "refreshed_5fat.catalog");
    }

    #[test]
    fn test_json_envelope() {
        let (store, _temp) = create_test_store();
        let now = Utc::now();

        store.set_json("numbers", &vec![1, 2, 3], now).unwrap();
        let envelope: Envelope<Vec<i32>> = store.get_json("numbers").unwrap().unwrap();
        assert_eq!(envelope.schema_version, SCHEMA_VERSION);
        assert_eq!(envelope.saved_at, now);
        assert_eq!(envelope.payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_schema_mismatch_is_reported() {
        let (store, _temp) = create_test_store();

        store
            .set("old", br#"{"schemaVersion": 0, "savedAt": "2024-01-01T00:00:00Z", "payload": []}"#)
            .unwrap();
        let result: Result<Option<Envelope<Vec<i32>>>> = store.get_json("old");
        assert!(matches!(result, Err(StorageError::SchemaMismatch { found: 0, .. })));
    }

    #[test]
    fn test_corrupt_value_is_json_error() {
        let (store, _temp) = create_test_store();

        store.set("broken", b"{not json").unwrap();
        let result: Result<Option<Envelope<Vec<i32>>>> = store.get_json("broken");
        assert!(matches!(result, Err(StorageError::Json(_))));
    }

    #[test]
    fn test_timestamps_and_clear() {
        let (store, _temp) = create_test_store();
        let now = Utc::now();

        store.set_timestamp("refreshed_at.catalog", now).unwrap();
        assert_eq!(store.get_timestamp("refreshed_at.catalog").unwrap(), Some(now));

        store.clear().unwrap();
        assert_eq!(store.get_timestamp("refreshed_at.catalog").unwrap(), None);
    }
}
