//! Download responder: stream the converted PDF back to the caller.
//!
//! The response body owns the request's [`RequestScratch`]. When the body is
//! exhausted, or dropped early because the client went away, the guard drops
//! with it and deletes the PDF. The open file handle keeps the bytes
//! readable until then even if cleanup races ahead on some platforms.

use crate::error::Docx2PdfError;
use crate::storage::RequestScratch;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Build a streaming `200 application/pdf` response for `path`.
///
/// `scratch` is moved into the body and released with it.
pub async fn pdf_response(
    path: &Path,
    file_name: &str,
    scratch: RequestScratch,
) -> Result<Response, Docx2PdfError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Docx2PdfError::storage(path, e))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| Docx2PdfError::storage(path, e))?
        .len();

    let request_id = scratch.id();
    let stream = ReaderStream::new(file).map(move |chunk| {
        // Keeps the guard alive exactly as long as the body.
        let _owner = &scratch;
        chunk
    });

    debug!(%request_id, file = file_name, bytes = len, "Streaming PDF");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, len)
        .header(header::CONTENT_DISPOSITION, content_disposition(file_name))
        .body(Body::from_stream(stream))
        .map_err(|e| Docx2PdfError::Internal(format!("response build: {e}")))
}

/// `attachment; filename="…"; filename*=UTF-8''…`
///
/// The quoted form is ASCII-only for old clients; the RFC 5987 form carries
/// the exact UTF-8 name.
pub fn content_disposition(file_name: &str) -> HeaderValue {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for b in file_name.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{b:02X}"));
        }
    }

    let value = format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}");
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Pull the file name back out of a `Content-Disposition` header.
///
/// Prefers `filename*` (RFC 5987) and falls back to the quoted `filename`.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        if let Some(rest) = part.strip_prefix("filename*=") {
            let encoded = rest
                .split_once("''")
                .map(|(_, v)| v)
                .unwrap_or(rest);
            if let Some(decoded) = percent_decode(encoded) {
                return Some(decoded);
            }
        } else if let Some(rest) = part.strip_prefix("filename=") {
            plain = Some(rest.trim_matches('"').to_string());
        }
    }
    plain.filter(|s| !s.is_empty())
}

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_name_round_trips() {
        let v = content_disposition("report.pdf");
        assert_eq!(
            v.to_str().unwrap(),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
        assert_eq!(
            parse_content_disposition(v.to_str().unwrap()).as_deref(),
            Some("report.pdf")
        );
    }

    #[test]
    fn unicode_and_quotes_are_escaped() {
        let v = content_disposition("résumé \"v2\".pdf");
        let s = v.to_str().unwrap();
        assert!(s.contains("filename=\"r_sum_ _v2_.pdf\""), "got: {s}");
        assert_eq!(
            parse_content_disposition(s).as_deref(),
            Some("résumé \"v2\".pdf")
        );
    }

    #[test]
    fn plain_filename_fallback() {
        assert_eq!(
            parse_content_disposition("attachment; filename=\"old.pdf\"").as_deref(),
            Some("old.pdf")
        );
        assert_eq!(parse_content_disposition("inline"), None);
    }
}
