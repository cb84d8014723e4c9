//! Conversion history kept by the client.
//!
//! Each entry records the name the PDF was offered under and a `url`
//! pointing at the saved file. The list is persisted under
//! [`FILE_HISTORY_KEY`] after every change, in insertion order. Because
//! entries reference real files rather than in-memory blobs, re-download and
//! the zip bundle keep working across restarts for as long as the files
//! exist.

use super::store::{LocalStore, FILE_HISTORY_KEY};
use crate::error::ClientError;
use crate::naming::unique_name;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Default file name for [`History::bundle`].
pub const BUNDLE_FILE_NAME: &str = "file-history.zip";

/// One past conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Display / download name, e.g. `report.pdf`.
    pub name: String,
    /// Location of the saved PDF (`file://` URL or plain path).
    pub url: String,
}

impl HistoryEntry {
    pub fn new(name: impl Into<String>, path: &Path) -> Self {
        Self {
            name: name.into(),
            url: path_to_url(path),
        }
    }

    /// Local path behind `url`. Entries holding a bare path are read as-is.
    pub fn path(&self) -> PathBuf {
        Url::parse(&self.url)
            .ok()
            .filter(|u| u.scheme() == "file")
            .and_then(|u| u.to_file_path().ok())
            .unwrap_or_else(|| PathBuf::from(&self.url))
    }
}

/// `file://` URL for `path`, falling back to the plain path when it cannot
/// be expressed as one.
fn path_to_url(path: &Path) -> String {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Url::from_file_path(&abs)
        .map(String::from)
        .unwrap_or_else(|()| abs.to_string_lossy().into_owned())
}

/// Ordered, persisted list of [`HistoryEntry`].
#[derive(Debug, Clone)]
pub struct History {
    store: LocalStore,
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Load the persisted history (empty when nothing was saved yet).
    pub fn load(store: LocalStore) -> Result<Self, ClientError> {
        let entries = store
            .get::<Vec<HistoryEntry>>(FILE_HISTORY_KEY)?
            .unwrap_or_default();
        Ok(Self { store, entries })
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&HistoryEntry, ClientError> {
        self.entries.get(index).ok_or(ClientError::NoSuchEntry {
            index,
            len: self.entries.len(),
        })
    }

    /// Append an entry and persist. The entry is dropped again when the
    /// store cannot be written.
    pub fn push(&mut self, entry: HistoryEntry) -> Result<(), ClientError> {
        self.entries.push(entry);
        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Remove the entry at `index` and persist. The saved file is left alone.
    pub fn remove(&mut self, index: usize) -> Result<HistoryEntry, ClientError> {
        if index >= self.entries.len() {
            return Err(ClientError::NoSuchEntry {
                index,
                len: self.entries.len(),
            });
        }
        let removed = self.entries.remove(index);
        self.persist()?;
        Ok(removed)
    }

    /// Forget every entry and delete the persisted key.
    pub fn clear(&mut self) -> Result<(), ClientError> {
        self.entries.clear();
        self.store.remove(FILE_HISTORY_KEY)
    }

    /// Whether the "download all" action makes sense.
    pub fn can_bundle(&self) -> bool {
        self.entries.len() > 1
    }

    /// Copy the PDF behind entry `index` into `dest_dir` under its display
    /// name, numbering it if that name is taken. Returns the new path.
    pub fn redownload(&self, index: usize, dest_dir: &Path) -> Result<PathBuf, ClientError> {
        let entry = self.get(index)?;
        let source = entry.path();

        std::fs::create_dir_all(dest_dir).map_err(|e| ClientError::io(dest_dir, e))?;
        let name = unique_name(&entry.name, |n| dest_dir.join(n).exists());
        let dest = dest_dir.join(name);

        std::fs::copy(&source, &dest).map_err(|e| ClientError::io(&source, e))?;
        info!(from = %source.display(), to = %dest.display(), "Re-downloaded");
        Ok(dest)
    }

    /// Write every available PDF into a zip archive at `dest`.
    ///
    /// Entries whose file has disappeared are skipped with a warning; the
    /// names actually written are returned in history order. Duplicate
    /// display names are numbered inside the archive.
    pub fn bundle(&self, dest: &Path) -> Result<Vec<String>, ClientError> {
        let archive_err = |detail: String| ClientError::Archive {
            path: dest.to_path_buf(),
            detail,
        };

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ClientError::io(parent, e))?;
        }
        let file = File::create(dest).map_err(|e| ClientError::io(dest, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default();

        let mut written: Vec<String> = Vec::with_capacity(self.entries.len());
        let mut used: HashSet<String> = HashSet::new();

        for entry in &self.entries {
            let source = entry.path();
            let bytes = match std::fs::read(&source) {
                Ok(b) => b,
                Err(e) => {
                    warn!(file = %source.display(), "Skipping history entry: {e}");
                    continue;
                }
            };

            let name = unique_name(&entry.name, |n| used.contains(n));
            zip.start_file(name.as_str(), options)
                .map_err(|e| archive_err(e.to_string()))?;
            zip.write_all(&bytes)
                .map_err(|e| archive_err(e.to_string()))?;
            used.insert(name.clone());
            written.push(name);
        }

        let mut inner = zip.finish().map_err(|e| archive_err(e.to_string()))?;
        inner.flush().map_err(|e| ClientError::io(dest, e))?;

        info!(archive = %dest.display(), files = written.len(), "History bundled");
        Ok(written)
    }

    fn persist(&self) -> Result<(), ClientError> {
        self.store.set(FILE_HISTORY_KEY, &self.entries)
    }
}
