//! Progress-callback trait for upload events.
//!
//! Inject an [`Arc<dyn UploadProgressCallback>`] into
//! [`crate::client::ConvertClient::convert_file`] or
//! [`crate::client::UploadForm::submit`] to receive events as the request
//! body is sent.
//!
//! # Example
//!
//! ```rust
//! use docx2pdf::UploadProgressCallback;
//! use std::sync::atomic::{AtomicU8, Ordering};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl UploadProgressCallback for LastPercent {
//!     fn on_upload_progress(&self, sent: u64, total: u64) {
//!         self.0.store(docx2pdf::progress::percent(sent, total), Ordering::SeqCst);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the client while a document is uploaded and converted.
///
/// Implementations must be `Send + Sync`: the body stream that fires
/// `on_upload_progress` runs inside reqwest's connection task. All methods
/// have default no-op implementations.
pub trait UploadProgressCallback: Send + Sync {
    /// Called once before the first byte is sent.
    fn on_upload_start(&self, file_name: &str, total_bytes: u64) {
        let _ = (file_name, total_bytes);
    }

    /// Called after each chunk of the file is handed to the transport.
    ///
    /// # Arguments
    /// * `sent`  — bytes of the file sent so far
    /// * `total` — file size in bytes
    fn on_upload_progress(&self, sent: u64, total: u64) {
        let _ = (sent, total);
    }

    /// Called when the whole file has been sent and the client is waiting
    /// for the server to convert it.
    fn on_upload_complete(&self, total_bytes: u64) {
        let _ = total_bytes;
    }

    /// Called once the server has answered (successfully or not).
    fn on_response(&self, status: u16) {
        let _ = status;
    }
}

/// Shared handle to a progress callback.
pub type ProgressCallback = Arc<dyn UploadProgressCallback>;

/// Integer percentage, rounded down: `floor(sent * 100 / total)`.
///
/// An empty file is 100% uploaded as soon as it starts.
pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) as u128 * 100) / total as u128) as u8
}
