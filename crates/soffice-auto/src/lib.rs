//! # soffice-auto
//!
//! Locate the LibreOffice `soffice` executable so callers can run headless
//! document conversions without hard-coding install paths.
//!
//! ## How it works
//!
//! On the first call to [`ensure_soffice`]:
//!
//! 1. Uses `SOFFICE_PATH` when it points at an existing file.
//! 2. Otherwise searches `PATH` for `soffice`, then `libreoffice`.
//! 3. Otherwise probes the platform's standard install locations.
//!
//! The resolved path is cached for the lifetime of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use soffice_auto::{ensure_soffice, profile_url};
//!
//! let soffice = ensure_soffice().expect("LibreOffice not installed");
//! let profile = profile_url(std::path::Path::new("/tmp/lo-profile")).unwrap();
//! println!("{} -env:UserInstallation={profile}", soffice.display());
//! ```
//!
//! ## Platform support
//!
//! | OS      | Probed locations                                        |
//! |---------|---------------------------------------------------------|
//! | macOS   | `/Applications/LibreOffice.app/Contents/MacOS/soffice`  |
//! | Linux   | `/usr/bin`, `/usr/lib/libreoffice`, `/opt/libreoffice*` |
//! | Windows | `C:\Program Files\LibreOffice\program\soffice.exe`      |
//!
//! ## Environment variable overrides
//!
//! - `SOFFICE_PATH` — path to an existing `soffice` binary; skips the search.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;
use url::Url;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable that overrides the search.
pub const SOFFICE_PATH_ENV: &str = "SOFFICE_PATH";

/// Executable names searched on `PATH`, in order.
const PATH_NAMES: &[&str] = &["soffice", "libreoffice"];

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by soffice-auto operations.
#[derive(Error, Debug)]
pub enum SofficeAutoError {
    /// `SOFFICE_PATH` is set but nothing exists there.
    #[error("{SOFFICE_PATH_ENV} points to '{path}', which does not exist")]
    OverrideMissing { path: PathBuf },

    /// No LibreOffice binary was found anywhere.
    #[error(
        "LibreOffice (soffice) not found.\n\
Searched PATH for {names:?} and {searched} install location(s).\n\
Install LibreOffice or set {SOFFICE_PATH_ENV}=/path/to/soffice."
    )]
    NotFound { names: Vec<String>, searched: usize },

    /// The profile directory cannot be expressed as a `file://` URL.
    #[error("Cannot build a file URL for profile directory '{path}'")]
    ProfileUrl { path: PathBuf },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

fn install_candidates() -> Vec<PathBuf> {
    match std::env::consts::OS {
        "macos" => vec![PathBuf::from(
            "/Applications/LibreOffice.app/Contents/MacOS/soffice",
        )],
        "windows" => {
            let mut roots = Vec::new();
            for var in ["ProgramFiles", "ProgramFiles(x86)"] {
                if let Some(dir) = std::env::var_os(var) {
                    roots.push(PathBuf::from(dir));
                }
            }
            if roots.is_empty() {
                roots.push(PathBuf::from(r"C:\Program Files"));
            }
            roots
                .into_iter()
                .map(|r| r.join("LibreOffice").join("program").join("soffice.exe"))
                .collect()
        }
        _ => {
            let mut paths = vec![
                PathBuf::from("/usr/bin/soffice"),
                PathBuf::from("/usr/local/bin/soffice"),
                PathBuf::from("/usr/lib/libreoffice/program/soffice"),
                PathBuf::from("/snap/bin/libreoffice"),
            ];
            // Upstream tarballs install as /opt/libreofficeX.Y/
            if let Ok(entries) = std::fs::read_dir("/opt") {
                let mut versioned: Vec<PathBuf> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.file_name()
                            .map(|n| n.to_string_lossy().starts_with("libreoffice"))
                            .unwrap_or(false)
                    })
                    .map(|p| p.join("program").join("soffice"))
                    .collect();
                // Newest version first.
                versioned.sort();
                versioned.reverse();
                paths.extend(versioned);
            }
            paths
        }
    }
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns `true` if a LibreOffice binary can be located.
pub fn is_soffice_available() -> bool {
    ensure_soffice().is_ok()
}

/// Returns the path to the `soffice` binary, searching on first call.
///
/// # Thread safety
///
/// Safe to call from multiple threads; concurrent first calls may each
/// search, but all observe the same cached result afterwards.
pub fn ensure_soffice() -> Result<PathBuf, SofficeAutoError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = resolve_soffice(std::env::var_os(SOFFICE_PATH_ENV))?;
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Search for `soffice` without touching the process-wide cache.
///
/// `override_path` plays the role of `SOFFICE_PATH`.
pub fn resolve_soffice(override_path: Option<OsString>) -> Result<PathBuf, SofficeAutoError> {
    // 1. Explicit override. A missing file is an error rather than a silent
    //    fallback: the operator asked for a specific binary.
    if let Some(raw) = override_path.filter(|p| !p.is_empty()) {
        let p = PathBuf::from(raw);
        if p.is_file() {
            return Ok(p);
        }
        return Err(SofficeAutoError::OverrideMissing { path: p });
    }

    // 2. PATH.
    for name in PATH_NAMES {
        if let Ok(p) = which::which(name) {
            return Ok(p);
        }
    }

    // 3. Standard install locations.
    let candidates = install_candidates();
    if let Some(p) = candidates.iter().find(|p| p.is_file()) {
        return Ok(p.clone());
    }

    Err(SofficeAutoError::NotFound {
        names: PATH_NAMES.iter().map(|s| s.to_string()).collect(),
        searched: candidates.len(),
    })
}

/// Format a directory as the `file://` URL LibreOffice expects for
/// `-env:UserInstallation=`.
///
/// Each concurrent `soffice` process needs its own profile directory,
/// otherwise the second instance finds the first one's lock and exits
/// without converting anything.
pub fn profile_url(dir: &Path) -> Result<String, SofficeAutoError> {
    let err = || SofficeAutoError::ProfileUrl {
        path: dir.to_path_buf(),
    };
    let abs = std::path::absolute(dir).map_err(|_| err())?;
    Url::from_file_path(&abs)
        .map(String::from)
        .map_err(|()| err())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
