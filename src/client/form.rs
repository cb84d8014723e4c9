//! Interactive upload form state.
//!
//! Holds what a user sees while converting a file: the current selection,
//! one status line, one error line, upload progress and the history list.
//! The phase moves `Idle → Uploading → Succeeded | Failed` and returns to
//! `Idle` on [`UploadForm::finish`].
//!
//! Status strings are the user-facing text and are part of the contract.

use super::history::{History, HistoryEntry};
use super::store::{LocalStore, DARK_MODE_KEY};
use super::ConvertClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::naming::{is_word_document, pdf_file_name, unique_name};
use crate::progress::{percent, ProgressCallback, UploadProgressCallback};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub const MSG_SELECT_FILE: &str = "Please select a file";
pub const MSG_SUCCESS: &str = "File Converted Successfully";
pub const MSG_GENERIC_FAILURE: &str = "An error occurred. Please try again.";
pub const BAD_REQUEST_PREFIX: &str = "Error occurred: ";

/// Where the form is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Uploading { progress: u8 },
    Succeeded,
    Failed,
}

/// A file accepted by [`UploadForm::select_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

/// Tracks the latest percentage and forwards events to the caller's sink.
struct FormProgress {
    percent: Arc<AtomicU8>,
    inner: Option<ProgressCallback>,
}

impl UploadProgressCallback for FormProgress {
    fn on_upload_start(&self, file_name: &str, total_bytes: u64) {
        self.percent.store(0, Ordering::Relaxed);
        if let Some(cb) = &self.inner {
            cb.on_upload_start(file_name, total_bytes);
        }
    }

    fn on_upload_progress(&self, sent: u64, total: u64) {
        self.percent.store(percent(sent, total), Ordering::Relaxed);
        if let Some(cb) = &self.inner {
            cb.on_upload_progress(sent, total);
        }
    }

    fn on_upload_complete(&self, total_bytes: u64) {
        if let Some(cb) = &self.inner {
            cb.on_upload_complete(total_bytes);
        }
    }

    fn on_response(&self, status: u16) {
        if let Some(cb) = &self.inner {
            cb.on_response(status);
        }
    }
}

/// Selection, submit and history state for one user.
pub struct UploadForm {
    client: ConvertClient,
    store: LocalStore,
    download_dir: PathBuf,
    max_file_bytes: u64,

    selected: Option<SelectedFile>,
    status: Option<String>,
    error: Option<String>,
    progress: Arc<AtomicU8>,
    phase: UploadPhase,

    history: History,
    dark_mode: bool,
}

impl UploadForm {
    /// Build the form and load persisted history and theme.
    pub fn open(config: &ClientConfig) -> Result<Self, ClientError> {
        let store = LocalStore::open(&config.store_path);
        let history = History::load(store.clone())?;
        let dark_mode = store.get::<bool>(DARK_MODE_KEY)?.unwrap_or(false);

        Ok(Self {
            client: ConvertClient::new(config)?,
            store,
            download_dir: config.download_dir.clone(),
            max_file_bytes: config.max_file_bytes,
            selected: None,
            status: None,
            error: None,
            progress: Arc::new(AtomicU8::new(0)),
            phase: UploadPhase::Idle,
            history,
            dark_mode,
        })
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Choose the file to convert.
    ///
    /// Files over the size cap are refused with the
    /// "File size exceeds the …MB limit" status and the selection cleared.
    pub fn select_file(&mut self, path: impl AsRef<Path>) -> Result<&SelectedFile, ClientError> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| ClientError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let rejection = if meta.len() > self.max_file_bytes {
            Some(ClientError::FileTooLarge {
                size: meta.len(),
                limit_bytes: self.max_file_bytes,
            })
        } else if !meta.is_file() || !is_word_document(&name) {
            Some(ClientError::UnsupportedType { name: name.clone() })
        } else {
            None
        };

        if let Some(err) = rejection {
            self.status = Some(err.to_string());
            self.selected = None;
            return Err(err);
        }

        self.progress.store(0, Ordering::Relaxed);
        self.status = None;
        self.error = None;
        Ok(&*self.selected.insert(SelectedFile {
            path: path.to_path_buf(),
            name,
            size: meta.len(),
        }))
    }

    // ── Submit ───────────────────────────────────────────────────────────

    /// Upload the selected file, save the PDF and record it in history.
    ///
    /// The outcome is always reflected in [`status`](Self::status) /
    /// [`error`](Self::error) as well as in the returned `Result`.
    pub async fn submit(
        &mut self,
        progress: Option<ProgressCallback>,
    ) -> Result<HistoryEntry, ClientError> {
        let Some(selected) = self.selected.clone() else {
            self.status = Some(MSG_SELECT_FILE.to_string());
            return Err(ClientError::NoFileSelected);
        };

        self.phase = UploadPhase::Uploading { progress: 0 };
        self.status = None;
        self.error = None;

        let sink: ProgressCallback = Arc::new(FormProgress {
            percent: Arc::clone(&self.progress),
            inner: progress,
        });

        let outcome = match self.client.convert_file(&selected.path, Some(sink)).await {
            Ok(pdf) => self.save(&selected, &pdf.bytes).await,
            Err(e) => Err(e),
        };
        let outcome = match outcome {
            Ok(entry) => self.record(entry).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(entry) => {
                self.selected = None;
                self.status = Some(MSG_SUCCESS.to_string());
                self.phase = UploadPhase::Succeeded;
                info!(name = %entry.name, "Saved converted PDF");
                Ok(entry)
            }
            Err(e) => {
                match &e {
                    ClientError::BadRequest { message } => {
                        self.error = Some(format!("{BAD_REQUEST_PREFIX}{message}"));
                    }
                    other => {
                        warn!("Conversion failed: {other}");
                        self.status = Some(MSG_GENERIC_FAILURE.to_string());
                    }
                }
                self.phase = UploadPhase::Failed;
                Err(e)
            }
        }
    }

    async fn save(&self, selected: &SelectedFile, bytes: &[u8]) -> Result<HistoryEntry, ClientError> {
        let dir = &self.download_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ClientError::io(dir, e))?;

        let offered = pdf_file_name(&selected.name);
        let target = dir.join(unique_name(&offered, |n| dir.join(n).exists()));
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| ClientError::io(&target, e))?;

        Ok(HistoryEntry::new(offered, &target))
    }

    /// Add a saved PDF to the history. When the history cannot be
    /// persisted the file is deleted again so nothing is left unlisted.
    async fn record(&mut self, entry: HistoryEntry) -> Result<HistoryEntry, ClientError> {
        if let Err(e) = self.history.push(entry.clone()) {
            let saved = entry.path();
            if let Err(rm) = tokio::fs::remove_file(&saved).await {
                warn!(file = %saved.display(), "Could not remove unrecorded PDF: {rm}");
            }
            return Err(e);
        }
        Ok(entry)
    }

    /// Return to `Idle` after an outcome has been shown.
    pub fn finish(&mut self) {
        self.phase = UploadPhase::Idle;
    }

    /// Clear selection, messages and progress.
    pub fn reset(&mut self) {
        self.selected = None;
        self.status = None;
        self.error = None;
        self.progress.store(0, Ordering::Relaxed);
        self.phase = UploadPhase::Idle;
    }

    // ── Theme ────────────────────────────────────────────────────────────

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn set_dark_mode(&mut self, on: bool) -> Result<(), ClientError> {
        self.store.set(DARK_MODE_KEY, &on)?;
        self.dark_mode = on;
        Ok(())
    }

    /// Flip the theme and persist it. Returns the new value.
    pub fn toggle_dark_mode(&mut self) -> Result<bool, ClientError> {
        self.set_dark_mode(!self.dark_mode)?;
        Ok(self.dark_mode)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Last reported upload percentage.
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn phase(&self) -> UploadPhase {
        match self.phase {
            UploadPhase::Uploading { .. } => UploadPhase::Uploading {
                progress: self.progress(),
            },
            other => other,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MB;

    fn form_in(dir: &Path) -> UploadForm {
        let config = ClientConfig::builder()
            .api_url("http://127.0.0.1:9")
            .store_path(dir.join("store.json"))
            .download_dir(dir.join("downloads"))
            .build()
            .unwrap();
        UploadForm::open(&config).unwrap()
    }

    #[test]
    fn oversize_selection_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let mut form = form_in(tmp.path());

        let small = tmp.path().join("ok.docx");
        std::fs::write(&small, b"PK").unwrap();
        form.select_file(&small).unwrap();

        let big = tmp.path().join("big.docx");
        let f = std::fs::File::create(&big).unwrap();
        f.set_len(20 * MB + 1).unwrap();

        let err = form.select_file(&big).unwrap_err();
        assert!(matches!(err, ClientError::FileTooLarge { .. }));
        assert_eq!(form.status(), Some("File size exceeds the 20MB limit"));
        assert!(form.selected().is_none());
    }

    #[test]
    fn exactly_at_limit_is_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut form = form_in(tmp.path());
        let path = tmp.path().join("edge.docx");
        std::fs::File::create(&path).unwrap().set_len(20 * MB).unwrap();

        let selected = form.select_file(&path).unwrap();
        assert_eq!(selected.name, "edge.docx");
        assert_eq!(form.status(), None);
        assert_eq!(form.progress(), 0);
    }

    #[test]
    fn non_word_selection_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let mut form = form_in(tmp.path());
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, b"hi").unwrap();
        assert!(matches!(
            form.select_file(&path),
            Err(ClientError::UnsupportedType { .. })
        ));
        assert!(form.selected().is_none());
    }

    #[tokio::test]
    async fn submit_without_selection() {
        let tmp = tempfile::tempdir().unwrap();
        let mut form = form_in(tmp.path());
        let err = form.submit(None).await.unwrap_err();
        assert!(matches!(err, ClientError::NoFileSelected));
        assert_eq!(form.status(), Some("Please select a file"));
        assert_eq!(form.phase(), UploadPhase::Idle);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_generic_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let mut form = form_in(tmp.path());
        let path = tmp.path().join("a.docx");
        std::fs::write(&path, b"PK").unwrap();
        form.select_file(&path).unwrap();

        assert!(form.submit(None).await.is_err());
        assert_eq!(form.status(), Some("An error occurred. Please try again."));
        assert_eq!(form.error(), None);
        assert_eq!(form.phase(), UploadPhase::Failed);
        assert!(form.history().is_empty());

        form.finish();
        assert_eq!(form.phase(), UploadPhase::Idle);
    }

    #[test]
    fn dark_mode_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let mut form = form_in(tmp.path());
        assert!(!form.dark_mode());
        assert!(form.toggle_dark_mode().unwrap());

        let reopened = form_in(tmp.path());
        assert!(reopened.dark_mode());
    }
}
