//! Configuration types for the conversion server and its client.
//!
//! [`ServerConfig`] and [`ClientConfig`] hold every knob in one place and are
//! built through builders with validated `build()` methods. The CLI maps its
//! flags (and their `PORT` / `DOCX2PDF_*` environment fallbacks) onto these
//! builders; library users set only what they need.

use crate::error::{Docx2PdfError, MB};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default upload cap, shared by server and client.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * MB;

/// Default API base URL used by the client.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Which origins may call the API from a browser.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorsOrigin {
    /// Any origin (`Access-Control-Allow-Origin: *`). (default)
    #[default]
    Any,
    /// A single origin such as `https://wordtopdf.example.com`.
    Exact(String),
}

impl CorsOrigin {
    /// Parse `*` or an origin URL.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            CorsOrigin::Any
        } else {
            CorsOrigin::Exact(s.trim_end_matches('/').to_string())
        }
    }
}

impl fmt::Display for CorsOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsOrigin::Any => f.write_str("*"),
            CorsOrigin::Exact(o) => f.write_str(o),
        }
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Configuration for the HTTP conversion server.
///
/// Built via [`ServerConfig::builder()`] or [`ServerConfig::default()`].
///
/// # Example
/// ```rust
/// use docx2pdf::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .port(8080)
///     .max_upload_bytes(Some(10 * 1024 * 1024))
///     .conversion_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind. Default: `0.0.0.0`.
    pub host: IpAddr,

    /// Listening port. Default: 3000.
    pub port: u16,

    /// Root of the temporary storage area. `uploads/` and `files/` are
    /// created beneath it on startup. Default: `$TMPDIR/docx2pdf`.
    pub storage_root: PathBuf,

    /// Upload size cap in bytes; `None` disables the cap. Default: 20 MB.
    pub max_upload_bytes: Option<u64>,

    /// Allowed browser origin. Default: any.
    pub cors_origin: CorsOrigin,

    /// Upper bound on a single conversion, in seconds. Default: 120.
    ///
    /// LibreOffice occasionally hangs on malformed input; without a bound the
    /// request, the child process and the scratch files would live forever.
    pub conversion_timeout_secs: u64,

    /// Explicit path to `soffice`. If None, located via `soffice-auto`.
    pub soffice_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            storage_root: std::env::temp_dir().join("docx2pdf"),
            max_upload_bytes: Some(DEFAULT_MAX_UPLOAD_BYTES),
            cors_origin: CorsOrigin::default(),
            conversion_timeout_secs: 120,
            soffice_path: None,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Socket address to bind.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.storage_root = root.into();
        self
    }

    pub fn max_upload_bytes(mut self, limit: Option<u64>) -> Self {
        self.config.max_upload_bytes = limit;
        self
    }

    pub fn cors_origin(mut self, origin: CorsOrigin) -> Self {
        self.config.cors_origin = origin;
        self
    }

    pub fn conversion_timeout_secs(mut self, secs: u64) -> Self {
        self.config.conversion_timeout_secs = secs;
        self
    }

    pub fn soffice_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.soffice_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, Docx2PdfError> {
        let c = &self.config;
        if c.conversion_timeout_secs == 0 {
            return Err(Docx2PdfError::InvalidConfig(
                "Conversion timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == Some(0) {
            return Err(Docx2PdfError::InvalidConfig(
                "Upload limit must be ≥ 1 byte (use None to disable it)".into(),
            ));
        }
        if c.storage_root.as_os_str().is_empty() {
            return Err(Docx2PdfError::InvalidConfig(
                "Storage root must not be empty".into(),
            ));
        }
        if let CorsOrigin::Exact(ref o) = c.cors_origin {
            if !(o.starts_with("http://") || o.starts_with("https://")) {
                return Err(Docx2PdfError::InvalidConfig(format!(
                    "CORS origin must be '*' or an http(s) origin, got '{o}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// Configuration for the upload client and its local history.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the conversion server. Default: `http://localhost:3000`.
    pub api_url: String,

    /// JSON file holding the persisted client state (history, theme).
    /// Default: `<data dir>/docx2pdf/store.json`.
    pub store_path: PathBuf,

    /// Where converted PDFs are saved. Default: the user's download dir.
    pub download_dir: PathBuf,

    /// Client-side size cap checked at selection time. Default: 20 MB.
    pub max_file_bytes: u64,

    /// Whole-request timeout in seconds, upload plus conversion. Default: 300.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .unwrap_or_else(std::env::temp_dir);
        let downloads = dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
            .unwrap_or_else(std::env::temp_dir);

        Self {
            api_url: DEFAULT_API_URL.to_string(),
            store_path: data.join("docx2pdf").join("store.json"),
            download_dir: downloads,
            max_file_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout_secs: 300,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    pub fn max_file_bytes(mut self, n: u64) -> Self {
        self.config.max_file_bytes = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ClientConfig, Docx2PdfError> {
        let url = self.config.api_url.trim().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Docx2PdfError::InvalidConfig(format!(
                "API URL must start with http:// or https://, got '{}'",
                self.config.api_url
            )));
        }
        self.config.api_url = url;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let c = ServerConfig::default();
        assert_eq!(c.port, 3000);
        assert_eq!(c.max_upload_bytes, Some(20 * MB));
        assert_eq!(c.cors_origin, CorsOrigin::Any);
        assert_eq!(c.bind_address().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = ServerConfig::builder()
            .conversion_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Docx2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn zero_upload_limit_rejected_but_none_allowed() {
        assert!(ServerConfig::builder()
            .max_upload_bytes(Some(0))
            .build()
            .is_err());
        let c = ServerConfig::builder().max_upload_bytes(None).build().unwrap();
        assert_eq!(c.max_upload_bytes, None);
    }

    #[test]
    fn cors_origin_parsing() {
        assert_eq!(CorsOrigin::parse("*"), CorsOrigin::Any);
        assert_eq!(CorsOrigin::parse(""), CorsOrigin::Any);
        assert_eq!(
            CorsOrigin::parse("https://wordtopdf.example.com/"),
            CorsOrigin::Exact("https://wordtopdf.example.com".into())
        );
    }

    #[test]
    fn bad_cors_origin_rejected() {
        let err = ServerConfig::builder()
            .cors_origin(CorsOrigin::Exact("wordtopdf.example.com".into()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("CORS"));
    }

    #[test]
    fn client_url_normalised() {
        let c = ClientConfig::builder()
            .api_url("https://api.example.com/")
            .build()
            .unwrap();
        assert_eq!(c.api_url, "https://api.example.com");
    }

    #[test]
    fn client_url_without_scheme_rejected() {
        assert!(ClientConfig::builder().api_url("example.com").build().is_err());
    }
}
