//! Error types for the docx2pdf library.
//!
//! Three types map onto the three places a conversion can go wrong:
//!
//! * [`Docx2PdfError`] — a server request failed. Each variant maps to one
//!   HTTP status (see [`crate::server::error`]): bad input is a 4xx, an
//!   engine failure or an internal fault is a 500.
//!
//! * [`ConversionError`] — the external engine failed, timed out, or did not
//!   produce a file. Carried inside [`Docx2PdfError::Conversion`]; its detail
//!   is logged for operators and never sent to the client.
//!
//! * [`ClientError`] — anything the upload client or its local history can
//!   report. Keeps the "bad request" case apart from every other failure so
//!   callers can show the server's message verbatim.

use std::path::PathBuf;
use thiserror::Error;

/// Bytes in one megabyte, as used for the upload size messages.
pub const MB: u64 = 1024 * 1024;

/// All errors a `POST /convertFile` request can end with.
#[derive(Debug, Error)]
pub enum Docx2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The multipart body carried no file under the `file` field.
    #[error("No file uploaded")]
    NoFile,

    /// The uploaded file exceeded the configured cap.
    #[error("File size exceeds the {}MB limit", .limit_bytes / MB)]
    FileTooLarge { limit_bytes: u64 },

    /// The multipart body could not be parsed.
    #[error("Invalid multipart request: {0}")]
    Multipart(String),

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The conversion engine failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, write or read the request scratch space.
    #[error("Scratch storage error at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Docx2PdfError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Failure of the external DOCX→PDF engine.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// No engine binary could be located.
    #[error("Conversion engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine process could not be started.
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but reported failure.
    #[error("Conversion engine exited with status {code:?}: {stderr}")]
    EngineFailed { code: Option<i32>, stderr: String },

    /// The engine reported success but the PDF is not where it should be.
    #[error("Conversion produced no output at '{path}'")]
    MissingOutput { path: PathBuf },

    /// The engine did not finish within the configured bound.
    #[error("Conversion timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Moving the produced file into place failed.
    #[error("I/O error while finalising '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by [`crate::client`].
#[derive(Debug, Error)]
pub enum ClientError {
    // ── Selection errors ──────────────────────────────────────────────────
    /// Submit was called with nothing selected.
    #[error("Please select a file")]
    NoFileSelected,

    /// The chosen file is over the client-side cap.
    #[error("File size exceeds the {}MB limit", .limit_bytes / MB)]
    FileTooLarge { size: u64, limit_bytes: u64 },

    /// The chosen file is not a Word document.
    #[error("Unsupported file '{name}': only .doc and .docx files can be converted")]
    UnsupportedType { name: String },

    // ── Server responses ──────────────────────────────────────────────────
    /// The server answered 400; `message` is its explanation.
    #[error("{message}")]
    BadRequest { message: String },

    /// The server answered with any other non-success status.
    #[error("Server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The request never completed.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    // ── Local state ───────────────────────────────────────────────────────
    /// Reading or writing the persisted store failed.
    #[error("Local store '{path}': {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted store is not valid JSON of the expected shape.
    #[error("Local store '{path}' is corrupt: {source}")]
    StoreCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A history index was out of range.
    #[error("History entry {index} does not exist ({len} entries)")]
    NoSuchEntry { index: usize, len: usize },

    /// Writing the history archive failed.
    #[error("Failed to build archive '{path}': {detail}")]
    Archive { path: PathBuf, detail: String },

    /// Any other file operation failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
