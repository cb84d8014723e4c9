//! A small persisted key/value store for client-side state.
//!
//! One JSON object on disk, keyed like browser local storage: `darkMode`
//! holds the theme preference, `fileHistory` the list of past conversions.
//! Every write replaces the file atomically (temp file + rename), so a crash
//! mid-write leaves the previous state intact.

use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key for the dark-mode preference (`bool`).
pub const DARK_MODE_KEY: &str = "darkMode";

/// Key for the conversion history (array of `{name, url}`).
pub const FILE_HISTORY_KEY: &str = "fileHistory";

/// JSON-file-backed key/value store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Open the store at `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode `key`. `Ok(None)` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ClientError> {
        let mut map = self.load()?;
        match map.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| ClientError::StoreCorrupt {
                    path: self.path.clone(),
                    source: e,
                }),
        }
    }

    /// Encode and write `value` under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        let mut map = self.load()?;
        let v = serde_json::to_value(value).map_err(|e| ClientError::StoreCorrupt {
            path: self.path.clone(),
            source: e,
        })?;
        map.insert(key.to_string(), v);
        self.save(&map)
    }

    /// Delete `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> Result<bool, ClientError> {
        Ok(self.load()?.contains_key(key))
    }

    fn load(&self) -> Result<Map<String, Value>, ClientError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(ClientError::Store {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text).map_err(|e| ClientError::StoreCorrupt {
            path: self.path.clone(),
            source: e,
        })
    }

    fn save(&self, map: &Map<String, Value>) -> Result<(), ClientError> {
        let store_err = |e| ClientError::Store {
            path: self.path.clone(),
            source: e,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(store_err)?;

        let json = serde_json::to_vec_pretty(map).map_err(|e| ClientError::StoreCorrupt {
            path: self.path.clone(),
            source: e,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(store_err)?;
        tmp.write_all(&json).map_err(store_err)?;
        tmp.persist(&self.path).map_err(|e| store_err(e.error))?;

        debug!(path = %self.path.display(), keys = map.len(), "Store saved");
        Ok(())
    }
}
