//! HTTP server: router, middleware and lifecycle.
//!
//! | Route               | Behaviour                                   |
//! |---------------------|---------------------------------------------|
//! | `GET /`             | plain-text welcome message                  |
//! | `POST /convertFile` | multipart `file` in, `application/pdf` out  |
//!
//! CORS allows `GET`/`POST` from the configured origin. Handler panics are
//! turned into the generic 500 body rather than dropping the connection.

pub mod error;
pub mod handlers;

use crate::config::{CorsOrigin, ServerConfig};
use crate::error::Docx2PdfError;
use crate::pipeline::engine::ConversionEngine;
use crate::storage::ScratchArea;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

/// Multipart framing allowance on top of the file cap, so the body limit
/// never trips before the per-file check can report a clean 413.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<ScratchArea>,
    pub engine: Arc<dyn ConversionEngine>,
}

impl AppState {
    pub fn new(config: ServerConfig, engine: Arc<dyn ConversionEngine>) -> Self {
        let storage = ScratchArea::new(&config.storage_root);
        Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            engine,
        }
    }
}

/// Create the CORS layer from configuration.
fn create_cors_layer(origin: &CorsOrigin) -> Result<CorsLayer, Docx2PdfError> {
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    Ok(match origin {
        CorsOrigin::Any => cors.allow_origin(AllowOrigin::any()),
        CorsOrigin::Exact(url) => {
            let value = url.parse::<HeaderValue>().map_err(|e| {
                Docx2PdfError::InvalidConfig(format!("CORS origin '{url}': {e}"))
            })?;
            cors.allow_origin(value).allow_credentials(true)
        }
    })
}

/// Build the application router with all routes and middleware.
///
/// Does not touch the filesystem; call [`ScratchArea::ensure`] (or use
/// [`Application::new`]) before serving.
pub fn build_router(state: AppState) -> Result<Router, Docx2PdfError> {
    let body_limit = match state.config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(
            usize::try_from(limit.saturating_add(MULTIPART_OVERHEAD)).unwrap_or(usize::MAX),
        ),
        None => DefaultBodyLimit::disable(),
    };
    let cors = create_cors_layer(&state.config.cors_origin)?;

    let router = Router::new()
        .route("/", get(handlers::welcome))
        .route(
            "/convertFile",
            post(handlers::convert_file).layer(body_limit),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors)
                .layer(CatchPanicLayer::custom(error::panic_response)),
        );

    Ok(router)
}

/// A configured server, storage area prepared, ready to bind.
pub struct Application {
    config: Arc<ServerConfig>,
    router: Router,
}

impl Application {
    /// Prepare storage and build the router.
    pub async fn new(
        config: ServerConfig,
        engine: Arc<dyn ConversionEngine>,
    ) -> Result<Self, Docx2PdfError> {
        let state = AppState::new(config, engine);
        state.storage.ensure().await?;
        info!(
            engine = state.engine.name(),
            storage = %state.config.storage_root.display(),
            max_upload_bytes = ?state.config.max_upload_bytes,
            cors = %state.config.cors_origin,
            "Application initialised"
        );
        let config = Arc::clone(&state.config);
        let router = build_router(state)?;
        Ok(Self { config, router })
    }

    /// The router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), Docx2PdfError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Docx2PdfError::Internal(format!("bind {addr}: {e}")))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already-bound listener (port 0 in tests).
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Docx2PdfError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener
            .local_addr()
            .map_err(|e| Docx2PdfError::Internal(e.to_string()))?;
        info!("Conversion API listening on http://{local}");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Docx2PdfError::Internal(format!("server: {e}")))
    }
}
