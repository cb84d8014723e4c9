//! Pipeline stages for a single DOCX-to-PDF request.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and the engine can be swapped without touching upload or download code.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ engine ──▶ download
//! (multipart)  (soffice)  (streamed body)
//! ```
//!
//! 1. [`upload`]   — persist the `file` field into the request's inbound dir,
//!    enforcing the size cap while streaming
//! 2. [`engine`]   — run the external converter under a timeout and move the
//!    result to its canonical name
//! 3. [`download`] — stream the PDF as the response; the scratch guard rides
//!    along inside the body so cleanup happens when the body is dropped

pub mod download;
pub mod engine;
pub mod upload;
