//! # docx2pdf
//!
//! Convert Word documents to PDF over HTTP.
//!
//! The crate has two halves that share naming rules and error types:
//!
//! * a **server** ([`server`]) exposing `POST /convertFile`, which stores the
//!   upload in a per-request scratch directory, hands it to an external
//!   [`ConversionEngine`] (LibreOffice by default), streams the PDF back and
//!   deletes everything it wrote;
//! * a **client** ([`client`]) that uploads files with progress reporting and
//!   keeps a local history of past conversions.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart upload
//!  │
//!  ├─ 1. Upload    persist field `file` under inbound/<request-id>/
//!  ├─ 2. Convert   external engine, bounded by a timeout
//!  ├─ 3. Download  stream outbound/<request-id>/<name>.pdf
//!  └─ 4. Cleanup   scratch guard removes both directories on drop
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docx2pdf::{Application, LibreOfficeEngine, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().port(3000).build()?;
//!     let app = Application::new(config, Arc::new(LibreOfficeEngine::new())).await?;
//!     app.serve(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docx2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod server;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ConvertClient, ConvertedPdf, History, HistoryEntry, LocalStore, UploadForm, UploadPhase};
pub use config::{ClientConfig, ClientConfigBuilder, CorsOrigin, ServerConfig, ServerConfigBuilder};
pub use error::{ClientError, ConversionError, Docx2PdfError};
pub use pipeline::engine::{convert_with_timeout, ConversionEngine, LibreOfficeEngine};
pub use progress::{ProgressCallback, UploadProgressCallback};
pub use server::{build_router, AppState, Application};
pub use storage::{RequestScratch, ScratchArea};
