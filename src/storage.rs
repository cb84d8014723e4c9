//! Temporary storage area: inbound uploads and outbound PDFs.
//!
//! The two roots (`uploads/` and `files/`) are created once on startup.
//! Every request then claims its own namespace beneath both,
//!
//! ```text
//! <root>/uploads/<request-id>/report.docx
//! <root>/files/<request-id>/report.pdf
//! ```
//!
//! so two uploads of `report.docx` never see each other's files. The
//! [`RequestScratch`] guard owns both directories and removes them when it is
//! dropped: after the response body finishes, when the client disconnects
//! mid-stream, when the conversion times out, or when a handler returns early
//! with an error.

use crate::error::Docx2PdfError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Directory name for uploaded documents.
pub const INBOUND_DIR: &str = "uploads";

/// Directory name for converted PDFs.
pub const OUTBOUND_DIR: &str = "files";

/// The two storage roots shared by all requests.
#[derive(Debug, Clone)]
pub struct ScratchArea {
    inbound: PathBuf,
    outbound: PathBuf,
}

impl ScratchArea {
    /// Lay out the storage area beneath `root`. Nothing is created yet.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            inbound: root.join(INBOUND_DIR),
            outbound: root.join(OUTBOUND_DIR),
        }
    }

    pub fn inbound_root(&self) -> &Path {
        &self.inbound
    }

    pub fn outbound_root(&self) -> &Path {
        &self.outbound
    }

    /// Create both roots if they are absent.
    pub async fn ensure(&self) -> Result<(), Docx2PdfError> {
        for dir in [&self.inbound, &self.outbound] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Docx2PdfError::storage(dir, e))?;
        }
        debug!(
            inbound = %self.inbound.display(),
            outbound = %self.outbound.display(),
            "Storage area ready"
        );
        Ok(())
    }

    /// Claim a fresh per-request namespace.
    pub async fn open_request(&self) -> Result<RequestScratch, Docx2PdfError> {
        let id = Uuid::new_v4();
        let scratch = RequestScratch {
            id,
            inbound: self.inbound.join(id.to_string()),
            outbound: self.outbound.join(id.to_string()),
        };

        // From here on the guard owns whatever gets created.
        for dir in [&scratch.inbound, &scratch.outbound] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Docx2PdfError::storage(dir, e))?;
        }
        Ok(scratch)
    }
}

/// One request's inbound and outbound directories, removed on drop.
#[derive(Debug)]
pub struct RequestScratch {
    id: Uuid,
    inbound: PathBuf,
    outbound: PathBuf,
}

impl RequestScratch {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn inbound_dir(&self) -> &Path {
        &self.inbound
    }

    pub fn outbound_dir(&self) -> &Path {
        &self.outbound
    }

    /// Remove the inbound directory now; the upload is not needed once the
    /// PDF exists. The outbound side stays until the guard drops.
    pub async fn discard_inbound(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.inbound).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(request_id = %self.id, "Failed to remove upload dir: {e}");
            }
        }
    }
}

impl Drop for RequestScratch {
    fn drop(&mut self) {
        let id = self.id;
        let dirs = [
            std::mem::take(&mut self.inbound),
            std::mem::take(&mut self.outbound),
        ];
        let cleanup = move || {
            for dir in &dirs {
                remove_quietly(dir, id);
            }
            debug!(request_id = %id, "Scratch space removed");
        };

        // Inside a runtime the removal goes to the blocking pool so a large
        // tree never stalls an async worker.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(cleanup);
            }
            Err(_) => cleanup(),
        }
    }
}

/// Remove `dir` recursively; a missing directory counts as success.
fn remove_quietly(dir: &Path, id: Uuid) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(request_id = %id, "Failed to remove '{}': {e}", dir.display()),
    }
}
