//! Upload handling: persist the multipart `file` field to disk.
//!
//! The body is streamed chunk by chunk into the request's inbound directory,
//! so a 20 MB upload never sits in memory and an oversized one is rejected
//! as soon as the running total passes the cap.

use crate::error::Docx2PdfError;
use crate::naming::sanitize_upload_name;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Multipart field that carries the document.
pub const FILE_FIELD: &str = "file";

/// A document persisted to the inbound scratch directory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Sanitised original file name.
    pub original_name: String,
    /// Where the bytes were written.
    pub path: PathBuf,
    /// Number of bytes written.
    pub size: u64,
}

/// Read the multipart body until the `file` field is found and write it to
/// `dir`.
///
/// Text parts and parts under other names are skipped, as is a `file` part
/// with an empty file name (what a browser sends when nothing was chosen).
/// Anything after the first file part is left unread.
///
/// # Errors
/// - [`Docx2PdfError::NoFile`] when no file part exists
/// - [`Docx2PdfError::FileTooLarge`] when the part exceeds `max_bytes`
/// - [`Docx2PdfError::Multipart`] when the body is malformed
pub async fn receive_upload(
    multipart: &mut Multipart,
    dir: &Path,
    max_bytes: Option<u64>,
) -> Result<UploadedFile, Docx2PdfError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let raw_name = match field.file_name() {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => {
                debug!("Skipping '{FILE_FIELD}' part without a file name");
                continue;
            }
        };

        let original_name = sanitize_upload_name(&raw_name);
        let path = dir.join(&original_name);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| Docx2PdfError::storage(&path, e))?;

        let mut size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?
        {
            size += chunk.len() as u64;
            if let Some(limit) = max_bytes {
                if size > limit {
                    warn!(
                        file = %original_name,
                        size,
                        limit,
                        "Upload exceeds size limit, aborting"
                    );
                    return Err(Docx2PdfError::FileTooLarge { limit_bytes: limit });
                }
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| Docx2PdfError::storage(&path, e))?;
        }

        file.flush()
            .await
            .map_err(|e| Docx2PdfError::storage(&path, e))?;

        info!(file = %original_name, size, "Upload stored");
        return Ok(UploadedFile {
            original_name,
            path,
            size,
        });
    }

    Err(Docx2PdfError::NoFile)
}

/// Map a multipart parser error, recognising the body-limit rejection.
fn multipart_error(e: MultipartError, max_bytes: Option<u64>) -> Docx2PdfError {
    match (e.status(), max_bytes) {
        (StatusCode::PAYLOAD_TOO_LARGE, Some(limit)) => {
            Docx2PdfError::FileTooLarge { limit_bytes: limit }
        }
        _ => Docx2PdfError::Multipart(e.body_text()),
    }
}
