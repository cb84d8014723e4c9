//! CLI binary for docx2pdf.
//!
//! A thin shim over the library crate: `serve` maps flags onto
//! `ServerConfig` and runs the HTTP API, the other subcommands drive the
//! upload client and its local history.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use docx2pdf::client::BUNDLE_FILE_NAME;
use docx2pdf::config::{DEFAULT_API_URL, DEFAULT_PORT};
use docx2pdf::error::MB;
use docx2pdf::{
    Application, ClientConfig, CorsOrigin, LibreOfficeEngine, ProgressCallback,
    ServerConfig, UploadForm, UploadProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

/// Two palettes, picked by the persisted dark-mode preference.
#[derive(Clone, Copy)]
struct Palette {
    dark: bool,
}

impl Palette {
    fn paint(code: &str, s: &str) -> String {
        format!("\x1b[{code}m{s}\x1b[0m")
    }
    fn ok(&self, s: &str) -> String {
        Self::paint(if self.dark { "92" } else { "32" }, s)
    }
    fn err(&self, s: &str) -> String {
        Self::paint(if self.dark { "91" } else { "31" }, s)
    }
    fn accent(&self, s: &str) -> String {
        Self::paint(if self.dark { "96" } else { "34" }, s)
    }
    fn dim(&self, s: &str) -> String {
        Self::paint("2", s)
    }
    fn bold(&self, s: &str) -> String {
        Self::paint("1", s)
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Byte-level upload bar; turns into a spinner while the server converts.
struct CliUploadProgress {
    bar: ProgressBar,
}

impl CliUploadProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {percent:>3}%  {bytes}/{total_bytes}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Uploading");
        Arc::new(Self { bar })
    }
}

impl UploadProgressCallback for CliUploadProgress {
    fn on_upload_start(&self, file_name: &str, total_bytes: u64) {
        self.bar.set_length(total_bytes);
        self.bar.set_message(file_name.to_string());
    }

    fn on_upload_progress(&self, sent: u64, _total: u64) {
        self.bar.set_position(sent);
    }

    fn on_upload_complete(&self, _total_bytes: u64) {
        let spinner = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        self.bar.set_style(spinner);
        self.bar.set_prefix("Converting");
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_response(&self, _status: u16) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the API on port 3000 (LibreOffice must be installed)
  docx2pdf serve

  # Custom port, 50 MB uploads, browser access from one origin only
  docx2pdf serve --port 8080 --max-upload-mb 50 --cors-origin https://app.example.com

  # Convert a file through a running server
  docx2pdf convert report.docx

  # Manage local history
  docx2pdf history list
  docx2pdf history download 0 -o ~/Desktop
  docx2pdf history zip
  docx2pdf history clear

ENVIRONMENT VARIABLES:
  PORT                     Listening port for `serve`
  DOCX2PDF_STORAGE_DIR     Scratch directory for uploads and outputs
  DOCX2PDF_MAX_UPLOAD_MB   Upload cap in megabytes
  DOCX2PDF_CORS_ORIGIN     Allowed browser origin ('*' for any)
  DOCX2PDF_TIMEOUT         Conversion timeout in seconds
  SOFFICE_PATH             Path to the LibreOffice `soffice` binary
  DOCX2PDF_API_URL         Server base URL used by the client commands
  DOCX2PDF_STORE           Client state file (history, theme)
  RUST_LOG                 Overrides the log filter
"#;

/// Convert Word documents to PDF over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "docx2pdf",
    version,
    about = "Word-to-PDF conversion server and client",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCX2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCX2PDF_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the conversion API.
    Serve(ServeArgs),

    /// Upload a document to a running server and save the PDF.
    Convert(ConvertArgs),

    /// Inspect and manage past conversions.
    History {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show or change the colour theme.
    Theme {
        #[command(flatten)]
        client: ClientArgs,

        #[arg(value_enum)]
        mode: Option<ThemeMode>,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listening port.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Interface to bind.
    #[arg(long, env = "DOCX2PDF_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Scratch directory for uploads and outputs.
    #[arg(long, env = "DOCX2PDF_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Upload cap in megabytes.
    #[arg(long, env = "DOCX2PDF_MAX_UPLOAD_MB", default_value_t = 20,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_upload_mb: u64,

    /// Accept uploads of any size.
    #[arg(long, conflicts_with = "max_upload_mb")]
    no_upload_limit: bool,

    /// Allowed browser origin, or '*' for any.
    #[arg(long, env = "DOCX2PDF_CORS_ORIGIN", default_value = "*")]
    cors_origin: String,

    /// Per-conversion timeout in seconds.
    #[arg(long, env = "DOCX2PDF_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Path to the `soffice` binary. Located automatically if omitted.
    #[arg(long, env = "SOFFICE_PATH")]
    soffice: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ClientArgs {
    /// Server base URL.
    #[arg(long, env = "DOCX2PDF_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Client state file (history and theme).
    #[arg(long, env = "DOCX2PDF_STORE", global = true)]
    store: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// The .doc or .docx file to convert.
    file: PathBuf,

    /// Directory to save the PDF in. Defaults to the user's downloads dir.
    #[arg(short, long, env = "DOCX2PDF_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    #[command(flatten)]
    client: ClientArgs,
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List past conversions.
    List,
    /// Copy a past PDF to a directory.
    Download {
        index: usize,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Forget one entry.
    Delete { index: usize },
    /// Forget every entry.
    Clear,
    /// Bundle every past PDF into one zip archive.
    Zip {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeMode {
    Dark,
    Light,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let quiet_progress = matches!(&cli.command, Command::Convert(a) if !a.no_progress);
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || quiet_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Convert(args) => convert(args, cli.quiet).await,
        Command::History { client, action } => history(client, action, cli.quiet),
        Command::Theme { client, mode } => theme(client, mode),
    }
}

// ── serve ────────────────────────────────────────────────────────────────────

async fn serve(args: ServeArgs) -> Result<()> {
    let max_upload = if args.no_upload_limit {
        None
    } else {
        let bytes = args
            .max_upload_mb
            .checked_mul(MB)
            .with_context(|| format!("--max-upload-mb {} is too large", args.max_upload_mb))?;
        Some(bytes)
    };
    let mut builder = ServerConfig::builder()
        .host(args.host)
        .port(args.port)
        .max_upload_bytes(max_upload)
        .cors_origin(CorsOrigin::parse(&args.cors_origin))
        .conversion_timeout_secs(args.timeout);
    if let Some(dir) = args.storage_dir {
        builder = builder.storage_root(dir);
    }
    if let Some(path) = args.soffice {
        builder = builder.soffice_path(path);
    }
    let config = builder.build().context("Invalid server configuration")?;

    if config.soffice_path.is_none() && !soffice_auto::is_soffice_available() {
        tracing::warn!(
            "LibreOffice (soffice) was not found; conversions will fail until it is installed \
             or SOFFICE_PATH is set"
        );
    }

    let engine = Arc::new(LibreOfficeEngine::from_config(&config));
    Application::new(config, engine)
        .await
        .context("Failed to initialise the server")?
        .serve(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

// ── client commands ──────────────────────────────────────────────────────────

fn client_config(args: &ClientArgs, output_dir: Option<PathBuf>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder().api_url(args.api_url.clone());
    if let Some(store) = &args.store {
        builder = builder.store_path(store.clone());
    }
    if let Some(dir) = output_dir {
        builder = builder.download_dir(dir);
    }
    builder.build().context("Invalid client configuration")
}

async fn convert(args: ConvertArgs, quiet: bool) -> Result<()> {
    let config = client_config(&args.client, args.output_dir)?;
    let mut form = UploadForm::open(&config).context("Failed to load client state")?;
    let p = Palette {
        dark: form.dark_mode(),
    };

    if let Err(e) = form.select_file(&args.file) {
        eprintln!("{} {}", p.err("✘"), form.status().map(str::to_string).unwrap_or(e.to_string()));
        bail!("{e}");
    }

    let progress: Option<ProgressCallback> = if quiet || args.no_progress {
        None
    } else {
        Some(CliUploadProgress::new() as Arc<dyn UploadProgressCallback>)
    };

    match form.submit(progress).await {
        Ok(entry) => {
            if !quiet {
                eprintln!(
                    "{} {}  {}",
                    p.ok("✔"),
                    p.bold(form.status().unwrap_or_default()),
                    p.dim(&entry.path().display().to_string())
                );
            }
            form.finish();
            Ok(())
        }
        Err(e) => {
            let shown = form
                .error()
                .or(form.status())
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string());
            eprintln!("{} {}", p.err("✘"), shown);
            form.finish();
            Err(e).context(format!("Converting {}", args.file.display()))
        }
    }
}

fn history(args: ClientArgs, action: HistoryAction, quiet: bool) -> Result<()> {
    let config = client_config(&args, None)?;
    let mut form = UploadForm::open(&config).context("Failed to load client state")?;
    let p = Palette {
        dark: form.dark_mode(),
    };

    match action {
        HistoryAction::List => {
            let history = form.history();
            if history.is_empty() {
                if !quiet {
                    eprintln!("{}", p.dim("No conversions yet."));
                }
                return Ok(());
            }
            for (i, entry) in history.entries().iter().enumerate() {
                let missing = if entry.path().exists() {
                    String::new()
                } else {
                    p.err(" (missing)")
                };
                println!(
                    "{:>3}  {}  {}{}",
                    p.accent(&i.to_string()),
                    p.bold(&entry.name),
                    p.dim(&entry.url),
                    missing
                );
            }
        }
        HistoryAction::Download { index, output_dir } => {
            let dir = output_dir.unwrap_or_else(|| form.download_dir().to_path_buf());
            let path = form.history().redownload(index, &dir)?;
            if !quiet {
                eprintln!("{} Saved {}", p.ok("✔"), p.bold(&path.display().to_string()));
            }
        }
        HistoryAction::Delete { index } => {
            let removed = form.history_mut().remove(index)?;
            if !quiet {
                eprintln!("{} Removed {}", p.ok("✔"), p.bold(&removed.name));
            }
        }
        HistoryAction::Clear => {
            form.history_mut().clear()?;
            if !quiet {
                eprintln!("{} History cleared", p.ok("✔"));
            }
        }
        HistoryAction::Zip { output } => {
            if form.history().is_empty() {
                bail!("History is empty; nothing to bundle");
            }
            let dest = output.unwrap_or_else(|| form.download_dir().join(BUNDLE_FILE_NAME));
            let written = form.history().bundle(&dest)?;
            if !quiet {
                eprintln!(
                    "{} {} files → {}",
                    p.ok("✔"),
                    p.bold(&written.len().to_string()),
                    dest.display()
                );
            }
        }
    }
    Ok(())
}

fn theme(args: ClientArgs, mode: Option<ThemeMode>) -> Result<()> {
    let config = client_config(&args, None)?;
    let mut form = UploadForm::open(&config).context("Failed to load client state")?;

    match mode {
        None => {}
        Some(ThemeMode::Dark) => form.set_dark_mode(true)?,
        Some(ThemeMode::Light) => form.set_dark_mode(false)?,
        Some(ThemeMode::Toggle) => {
            form.toggle_dark_mode()?;
        }
    }

    let p = Palette {
        dark: form.dark_mode(),
    };
    println!(
        "{}",
        p.accent(if form.dark_mode() { "dark" } else { "light" })
    );
    Ok(())
}

