//! Conversion adapter: delegate DOCX→PDF rendering to an external engine.
//!
//! The engine itself is out of scope for this crate. [`ConversionEngine`] is
//! the seam: given an input document and an output directory it produces a
//! PDF or fails. [`LibreOfficeEngine`] drives `soffice --headless`; tests
//! plug in fakes.
//!
//! ## Why a child process per request?
//!
//! `soffice` is a separate process, so awaiting it never blocks a Tokio
//! worker thread. Each run gets its own LibreOffice user profile inside the
//! request's scratch directory; two runs sharing a profile would trip over
//! its lock file and the second would exit without converting. The child is
//! spawned with `kill_on_drop`, so when [`convert_with_timeout`] gives up (or
//! the request future is dropped) the process is killed rather than leaked.

use crate::config::ServerConfig;
use crate::error::ConversionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Something that can turn a Word document into a PDF.
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Convert `input`, writing the PDF somewhere inside `out_dir`.
    ///
    /// Returns the path of the produced PDF.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConversionError>;
}

/// Run `engine` under `timeout` and move its output to `out_dir/target_name`.
///
/// On timeout the engine future is dropped, which kills a LibreOffice child
/// process. Leftover files are the caller's scratch guard's business.
pub async fn convert_with_timeout(
    engine: &dyn ConversionEngine,
    input: &Path,
    out_dir: &Path,
    target_name: &str,
    timeout: Duration,
) -> Result<PathBuf, ConversionError> {
    let start = Instant::now();
    debug!(engine = engine.name(), input = %input.display(), "Starting conversion");

    let produced = match tokio::time::timeout(timeout, engine.convert(input, out_dir)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(
                engine = engine.name(),
                input = %input.display(),
                "Conversion exceeded {}s, abandoning",
                timeout.as_secs()
            );
            return Err(ConversionError::Timeout {
                secs: timeout.as_secs(),
            });
        }
    };

    if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
        return Err(ConversionError::MissingOutput { path: produced });
    }

    let target = out_dir.join(target_name);
    if produced != target {
        tokio::fs::rename(&produced, &target)
            .await
            .map_err(|e| ConversionError::Io {
                path: target.clone(),
                source: e,
            })?;
    }

    info!(
        engine = engine.name(),
        output = %target.display(),
        "Conversion finished in {}ms",
        start.elapsed().as_millis()
    );
    Ok(target)
}

// ── LibreOffice ──────────────────────────────────────────────────────────

/// Headless LibreOffice (`soffice --convert-to pdf`).
#[derive(Debug, Clone, Default)]
pub struct LibreOfficeEngine {
    program: Option<PathBuf>,
}

impl LibreOfficeEngine {
    /// Locate `soffice` lazily via `soffice-auto` on first conversion.
    pub fn new() -> Self {
        Self { program: None }
    }

    /// Use an explicit `soffice` binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    /// Engine honouring [`ServerConfig::soffice_path`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            program: config.soffice_path.clone(),
        }
    }

    fn program(&self) -> Result<PathBuf, ConversionError> {
        match self.program {
            Some(ref p) => Ok(p.clone()),
            None => soffice_auto::ensure_soffice()
                .map_err(|e| ConversionError::EngineUnavailable(e.to_string())),
        }
    }

    /// Arguments for one conversion run.
    fn args(input: &Path, out_dir: &Path, profile_dir: &Path) -> Result<Vec<String>, ConversionError> {
        let profile = soffice_auto::profile_url(profile_dir).map_err(|e| ConversionError::Io {
            path: profile_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;
        Ok(vec![
            format!("-env:UserInstallation={profile}"),
            "--headless".into(),
            "--norestore".into(),
            "--nologo".into(),
            "--nodefault".into(),
            "--convert-to".into(),
            "pdf".into(),
            "--outdir".into(),
            out_dir.to_string_lossy().into_owned(),
            input.to_string_lossy().into_owned(),
        ])
    }

    /// Where LibreOffice writes the PDF: `<out_dir>/<input stem>.pdf`.
    fn expected_output(input: &Path, out_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".into());
        out_dir.join(format!("{stem}.pdf"))
    }
}

#[async_trait]
impl ConversionEngine for LibreOfficeEngine {
    fn name(&self) -> &str {
        "libreoffice"
    }

    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConversionError> {
        let program = self.program()?;
        // Absolute paths: LibreOffice resolves relative ones against its own cwd.
        let input = std::path::absolute(input).map_err(|e| ConversionError::Io {
            path: input.to_path_buf(),
            source: e,
        })?;
        let out_dir = std::path::absolute(out_dir).map_err(|e| ConversionError::Io {
            path: out_dir.to_path_buf(),
            source: e,
        })?;
        let profile_dir = out_dir.join(".lo-profile");

        let args = Self::args(&input, &out_dir, &profile_dir)?;

        let output = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConversionError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        // The profile is only needed while soffice runs.
        let _ = tokio::fs::remove_dir_all(&profile_dir).await;

        if !output.status.success() {
            return Err(ConversionError::EngineFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // soffice exits 0 even when it could not load the source file; the
        // only reliable success signal is the output file itself.
        let expected = Self::expected_output(&input, &out_dir);
        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if !stderr.is_empty() {
                warn!("soffice stderr: {stderr}");
            }
            return Err(ConversionError::MissingOutput { path: expected });
        }

        Ok(expected)
    }
}
