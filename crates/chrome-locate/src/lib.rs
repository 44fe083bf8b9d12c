//! # chrome-locate
//!
//! Find a Chrome/Chromium executable (and other external converter binaries)
//! with a **deterministic** search order, so that callers of
//! `chromiumoxide` / `headless_chrome` do not have to guess where the browser
//! lives on a CI runner, a developer laptop, or a container image.
//!
//! ## Search order
//!
//! The first candidate that exists as a regular file wins:
//!
//! 1. Environment overrides: `CHROME_PATH`, `CHROME`,
//!    `PUPPETEER_EXECUTABLE_PATH` (in that order). An override that points to
//!    a missing file is reported and skipped.
//! 2. `PATH` lookup of [`EXECUTABLE_NAMES`].
//! 3. Well-known per-OS install locations (`/usr/bin/chromium`,
//!    `/Applications/Google Chrome.app/…`, `C:\Program Files\…`).
//! 4. Browsers downloaded by Puppeteer (`~/.cache/puppeteer`) or Playwright
//!    (`<cache dir>/ms-playwright`), highest version directory first.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrome_locate::{find_chrome, find_program};
//!
//! match find_chrome() {
//!     Ok(found) => println!("browser: {} ({})", found.path.display(), found.origin),
//!     Err(e) => eprintln!("{e}"),
//! }
//! let converter = find_program("wkhtmltopdf");
//! ```

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variables consulted first, in order.
pub const ENV_OVERRIDES: &[&str] = &["CHROME_PATH", "CHROME", "PUPPETEER_EXECUTABLE_PATH"];

/// Executable names looked up on `PATH`, in order.
pub const EXECUTABLE_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "headless_shell",
];

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chrome-locate operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// No candidate in the search order exists on this machine.
    #[error(
        "No Chrome/Chromium executable found ({searched} locations searched).\n\
Install Chromium or Google Chrome, or set CHROME_PATH=/path/to/chrome."
    )]
    NotFound { searched: usize },
}

// ── Discovery result ─────────────────────────────────────────────────────────

/// Where a discovered executable came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// An environment override such as `CHROME_PATH`.
    Env(&'static str),
    /// A `PATH` lookup of the given executable name.
    SearchPath(&'static str),
    /// A fixed, well-known install location.
    WellKnown,
    /// A Puppeteer or Playwright download cache.
    DownloadCache,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Env(var) => write!(f, "${var}"),
            Origin::SearchPath(name) => write!(f, "PATH:{name}"),
            Origin::WellKnown => f.write_str("well-known location"),
            Origin::DownloadCache => f.write_str("download cache"),
        }
    }
}

/// A browser executable and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub path: PathBuf,
    pub origin: Origin,
}

// ── Thread-safe singleton cache ──────────────────────────────────────────────

static RESOLVED: OnceLock<Discovered> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Locates a Chrome/Chromium executable using the process environment.
///
/// Successful lookups are memoised for the lifetime of the process; failures
/// are not, so a browser installed mid-run is picked up on the next call.
pub fn find_chrome() -> Result<Discovered, LocateError> {
    if let Some(found) = RESOLVED.get() {
        return Ok(found.clone());
    }
    let found = find_chrome_with(&|var| std::env::var_os(var))?;
    let _ = RESOLVED.set(found.clone());
    Ok(found)
}

/// Locates a browser executable with an injectable environment lookup.
///
/// `env` stands in for [`std::env::var_os`]; everything else (PATH, the file
/// system) is consulted for real.
pub fn find_chrome_with(env: &dyn Fn(&str) -> Option<OsString>) -> Result<Discovered, LocateError> {
    let mut searched = 0usize;

    // 1. Environment overrides.
    for &var in ENV_OVERRIDES {
        if let Some(value) = env(var).filter(|v| !v.is_empty()) {
            searched += 1;
            let path = PathBuf::from(value);
            if path.is_file() {
                return Ok(Discovered { path, origin: Origin::Env(var) });
            }
            // Fall through: override set but file missing → keep searching.
            eprintln!("chrome-locate: {var} '{}' not found; searching further …", path.display());
        }
    }

    // 2. PATH lookup.
    for &name in EXECUTABLE_NAMES {
        searched += 1;
        if let Ok(path) = which::which(name) {
            return Ok(Discovered { path, origin: Origin::SearchPath(name) });
        }
    }

    // 3. Well-known install paths.
    for path in well_known_paths() {
        searched += 1;
        if path.is_file() {
            return Ok(Discovered { path, origin: Origin::WellKnown });
        }
    }

    // 4. Puppeteer / Playwright download caches.
    let roots = CacheRoots::from_system();
    for path in download_cache_candidates(&roots) {
        searched += 1;
        if path.is_file() {
            return Ok(Discovered { path, origin: Origin::DownloadCache });
        }
    }

    Err(LocateError::NotFound { searched })
}

/// Locates an arbitrary program on `PATH` (e.g. `wkhtmltopdf`).
pub fn find_program(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

// ── Internal: platform metadata ──────────────────────────────────────────────

#[cfg(target_os = "macos")]
fn well_known_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"));
    }
    paths
}

#[cfg(target_os = "windows")]
fn well_known_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = [
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files\Chromium\Application\chrome.exe",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    if let Some(local) = dirs::data_local_dir() {
        paths.push(local.join(r"Google\Chrome\Application\chrome.exe"));
    }
    paths
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn well_known_paths() -> Vec<PathBuf> {
    [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/opt/google/chrome/chrome",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

/// Executable path inside a Puppeteer `chrome/<version>/` directory.
#[cfg(target_os = "macos")]
const PUPPETEER_BINARY: &str =
    "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing";
#[cfg(target_os = "windows")]
const PUPPETEER_BINARY: &str = r"chrome-win64\chrome.exe";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PUPPETEER_BINARY: &str = "chrome-linux64/chrome";

/// Executable path inside a Playwright `chromium-<revision>/` directory.
#[cfg(target_os = "macos")]
const PLAYWRIGHT_BINARY: &str = "chrome-mac/Chromium.app/Contents/MacOS/Chromium";
#[cfg(target_os = "windows")]
const PLAYWRIGHT_BINARY: &str = r"chrome-win\chrome.exe";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLAYWRIGHT_BINARY: &str = "chrome-linux/chrome";

/// Directories that hold browser download caches.
struct CacheRoots {
    /// `~/.cache/puppeteer` (Puppeteer uses the same layout on every OS).
    puppeteer: Option<PathBuf>,
    /// `<platform cache dir>/ms-playwright`.
    playwright: Option<PathBuf>,
}

impl CacheRoots {
    fn from_system() -> Self {
        Self {
            puppeteer: dirs::home_dir().map(|h| h.join(".cache").join("puppeteer")),
            playwright: dirs::cache_dir().map(|c| c.join("ms-playwright")),
        }
    }
}

fn download_cache_candidates(roots: &CacheRoots) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(ref root) = roots.puppeteer {
        for dir in versioned_dirs(&root.join("chrome"), "") {
            candidates.push(dir.join(PUPPETEER_BINARY));
        }
    }
    if let Some(ref root) = roots.playwright {
        for dir in versioned_dirs(root, "chromium-") {
            candidates.push(dir.join(PLAYWRIGHT_BINARY));
        }
    }
    candidates
}

/// Sub-directories of `parent` whose names start with `prefix`, newest
/// version first. Versions compare numerically component by component
/// (`chromium-1105` > `chromium-999`, `linux-121.0.6167.85` >
/// `linux-121.0.999.0`); ties fall back to the name.
fn versioned_dirs(parent: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(parent) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
        .map(|e| e.path())
        .collect();
    dirs.sort_by_cached_key(|p| {
        let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        std::cmp::Reverse((version_key(&name), name))
    });
    dirs
}

/// Every run of ASCII digits in `name`, parsed in order.
fn version_key(name: &str) -> Vec<u64> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().unwrap_or(u64::MAX))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
