//! HTTP mapping for [`Docx2PdfError`].
//!
//! Clients only ever see a short fixed message in a `{"message": …}` body.
//! The full error, including engine stderr, goes to the log at a level that
//! matches who has to act on it.

use crate::error::Docx2PdfError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Message for engine failures and timeouts.
pub const CONVERSION_FAILED: &str = "Error converting docx to pdf";

/// Message for everything unexpected.
pub const INTERNAL_ERROR: &str = "Internal server error";

impl Docx2PdfError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Docx2PdfError::NoFile | Docx2PdfError::Multipart(_) => StatusCode::BAD_REQUEST,
            Docx2PdfError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Docx2PdfError::Conversion(_)
            | Docx2PdfError::Storage { .. }
            | Docx2PdfError::InvalidConfig(_)
            | Docx2PdfError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message safe to show a client.
    pub fn public_message(&self) -> String {
        match self {
            Docx2PdfError::NoFile
            | Docx2PdfError::Multipart(_)
            | Docx2PdfError::FileTooLarge { .. } => self.to_string(),
            Docx2PdfError::Conversion(_) => CONVERSION_FAILED.to_string(),
            _ => INTERNAL_ERROR.to_string(),
        }
    }
}

impl IntoResponse for Docx2PdfError {
    fn into_response(self) -> Response {
        match &self {
            Docx2PdfError::Conversion(e) => {
                tracing::error!("Conversion failed: {e}");
            }
            Docx2PdfError::Storage { .. }
            | Docx2PdfError::InvalidConfig(_)
            | Docx2PdfError::Internal(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Docx2PdfError::FileTooLarge { .. } => {
                tracing::info!("Upload rejected: {}", self);
            }
            Docx2PdfError::NoFile | Docx2PdfError::Multipart(_) => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(ErrorBody::new(self.public_message()))).into_response()
    }
}

/// Response for a handler panic, installed via `CatchPanicLayer`.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {detail}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(INTERNAL_ERROR)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConversionError, MB};

    #[test]
    fn statuses() {
        assert_eq!(Docx2PdfError::NoFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Docx2PdfError::FileTooLarge { limit_bytes: MB }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            Docx2PdfError::from(ConversionError::Timeout { secs: 1 }).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn engine_detail_is_not_exposed() {
        let e = Docx2PdfError::from(ConversionError::EngineFailed {
            code: Some(1),
            stderr: "/srv/secret/path: segfault".into(),
        });
        assert_eq!(e.public_message(), CONVERSION_FAILED);

        let e = Docx2PdfError::Internal("pool poisoned".into());
        assert_eq!(e.public_message(), INTERNAL_ERROR);
    }

    #[test]
    fn panic_payloads_become_500() {
        let resp = panic_response(Box::new("boom"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
