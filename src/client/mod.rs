//! Upload client for the conversion server.
//!
//! [`ConvertClient`] does one thing: send a Word file to `POST /convertFile`
//! as multipart field `file`, reporting upload progress, and hand back the
//! PDF bytes. [`UploadForm`] layers the interactive state on top (selection,
//! status messages, history, theme) and [`History`] / [`LocalStore`] keep
//! that state across runs.

pub mod form;
pub mod history;
pub mod store;

pub use form::{SelectedFile, UploadForm, UploadPhase};
pub use history::{History, HistoryEntry, BUNDLE_FILE_NAME};
pub use store::{LocalStore, DARK_MODE_KEY, FILE_HISTORY_KEY};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::naming::sanitize_upload_name;
use crate::pipeline::download::parse_content_disposition;
use crate::pipeline::upload::FILE_FIELD;
use crate::progress::ProgressCallback;
use crate::server::error::ErrorBody;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{header, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// Read size for the streamed upload body.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOC_MIME: &str = "application/msword";

/// A converted document as returned by the server.
#[derive(Debug, Clone)]
pub struct ConvertedPdf {
    /// Name from the response `Content-Disposition`, if any.
    pub server_file_name: Option<String>,
    /// The PDF itself.
    pub bytes: Vec<u8>,
}

/// HTTP client for `POST /convertFile`.
#[derive(Debug, Clone)]
pub struct ConvertClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ConvertClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/convertFile", config.api_url),
        })
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload `path` and wait for the PDF.
    ///
    /// A 400 answer becomes [`ClientError::BadRequest`] carrying the server's
    /// `message`; any other non-success status becomes
    /// [`ClientError::Server`].
    pub async fn convert_file(
        &self,
        path: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<ConvertedPdf, ClientError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ClientError::io(path, e))?;
        let total = file
            .metadata()
            .await
            .map_err(|e| ClientError::io(path, e))?
            .len();

        let file_name = path
            .file_name()
            .map(|n| sanitize_upload_name(&n.to_string_lossy()))
            .unwrap_or_else(|| sanitize_upload_name(""));

        if let Some(cb) = &progress {
            cb.on_upload_start(&file_name, total);
            // An empty body yields no chunks, so report it as sent up front.
            if total == 0 {
                cb.on_upload_progress(0, 0);
                cb.on_upload_complete(0);
            }
        }

        let mut sent: u64 = 0;
        let cb = progress.clone();
        let stream = ReaderStream::with_capacity(file, UPLOAD_CHUNK_BYTES).map(move |chunk| {
            if let (Ok(bytes), Some(cb)) = (&chunk, &cb) {
                sent += bytes.len() as u64;
                cb.on_upload_progress(sent, total);
                if sent >= total {
                    cb.on_upload_complete(total);
                }
            }
            chunk
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file_name.clone())
            .mime_str(mime_for(&file_name))?;
        let form = Form::new().part(FILE_FIELD, part);

        debug!(endpoint = %self.endpoint, file = %file_name, bytes = total, "Uploading");
        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();

        if let Some(cb) = &progress {
            cb.on_response(status.as_u16());
        }

        if status.is_success() {
            let server_file_name = response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_content_disposition);
            let bytes = response.bytes().await?.to_vec();
            info!(file = %file_name, pdf_bytes = bytes.len(), "Converted");
            return Ok(ConvertedPdf {
                server_file_name,
                bytes,
            });
        }

        let message = error_message(response).await;
        warn!(status = status.as_u16(), %message, "Conversion request failed");
        if status == StatusCode::BAD_REQUEST {
            Err(ClientError::BadRequest { message })
        } else {
            Err(ClientError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// `message` from a JSON error body, or the raw text when it is not JSON.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.message,
        Err(_) if !text.trim().is_empty() => text.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}

fn mime_for(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".doc") {
        DOC_MIME
    } else {
        DOCX_MIME
    }
}
