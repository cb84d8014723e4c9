//! Route handlers.

use super::AppState;
use crate::error::Docx2PdfError;
use crate::naming::pdf_file_name;
use crate::pipeline::{download, engine, upload};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Response;
use std::time::Duration;
use tracing::{info, instrument, Span};

/// Plain-text greeting served at `GET /`.
pub const WELCOME: &str = "Welcome to the File Conversion API";

/// `GET /`
pub async fn welcome() -> &'static str {
    WELCOME
}

/// `POST /convertFile`
///
/// upload → convert → stream back. The request scratch guard travels with
/// the response body; any early return drops it and cleans up. A request
/// that is not multipart at all is treated like one without a file.
#[instrument(skip_all, fields(request_id = tracing::field::Empty))]
pub async fn convert_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, Docx2PdfError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Not a multipart request: {rejection}");
        Docx2PdfError::NoFile
    })?;
    let scratch = state.storage.open_request().await?;
    Span::current().record("request_id", tracing::field::display(scratch.id()));

    let uploaded =
        upload::receive_upload(&mut multipart, scratch.inbound_dir(), state.config.max_upload_bytes)
            .await?;

    let pdf_name = pdf_file_name(&uploaded.original_name);
    let timeout = Duration::from_secs(state.config.conversion_timeout_secs);
    let output = engine::convert_with_timeout(
        state.engine.as_ref(),
        &uploaded.path,
        scratch.outbound_dir(),
        &pdf_name,
        timeout,
    )
    .await?;

    scratch.discard_inbound().await;
    info!(input = %uploaded.original_name, output = %pdf_name, "Converted");

    download::pdf_response(&output, &pdf_name, scratch).await
}
