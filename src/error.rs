//! Error types for the edgequake-html2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Html2PdfError`] — **Fatal**: the conversion cannot proceed at all
//!   (malformed option, unreadable source file, every renderer failed).
//!   Returned as `Err(Html2PdfError)` from the top-level `convert*` functions.
//!
//! * [`StrategyError`] — **Non-fatal**: a single renderer failed (browser
//!   missing, navigation timed out, converter exited non-zero) but the next
//!   renderer in the fallback chain may still succeed. Recorded inside
//!   [`crate::output::AttemptRecord`] so callers can see why the pipeline
//!   degraded rather than losing the whole run to one bad environment.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-html2pdf library.
///
/// Renderer-level failures use [`StrategyError`] and are only surfaced here,
/// aggregated, when the whole chain is exhausted.
#[derive(Debug, Error)]
pub enum Html2PdfError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// A required input (`source`, `output`) was not supplied.
    #[error("Missing required input '{name}'\nPass --{name}=<value> or set the {env} environment variable.")]
    MissingInput { name: &'static str, env: &'static str },

    /// An option value could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// The source resolved to a local file that could not be read.
    #[error("Failed to read source file '{path}': {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Every available strategy failed; no PDF was written.
    #[error(
        "All {attempted} renderers failed; no PDF was written.\n{}",
        .diagnostics.join("\n")
    )]
    PipelineExhausted {
        attempted: usize,
        diagnostics: Vec<String>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory or report the output path.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single strategy attempt.
///
/// The orchestrator logs it, records it, and moves on to the next strategy.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StrategyError {
    /// The strategy cannot run in this environment (binary not on PATH).
    #[error("unavailable: {reason}")]
    Unavailable { reason: String },

    /// No browser executable could be located.
    #[error("no Chrome/Chromium executable found: {detail}")]
    BrowserNotFound { detail: String },

    /// The browser process could not be started or connected to.
    #[error("browser launch failed: {detail}")]
    Launch { detail: String },

    /// Loading the page (URL navigation or content injection) failed.
    #[error("navigation failed: {detail}")]
    Navigation { detail: String },

    /// A bounded wait ran out.
    #[error("timed out after {after_ms}ms while {stage}")]
    Timeout { stage: String, after_ms: u64 },

    /// The engine failed to produce PDF bytes.
    #[error("PDF rendering failed: {detail}")]
    Render { detail: String },

    /// The external converter exited unsuccessfully.
    #[error("converter exited with {}: {stderr}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Process { code: Option<i32>, stderr: String },

    /// Bytes were produced but do not look like a PDF.
    #[error("output is not a PDF (first bytes: {magic:?})")]
    InvalidPdf { magic: Vec<u8> },

    /// File-system error while staging or persisting the output.
    #[error("I/O error: {detail}")]
    Io { detail: String },
}

impl StrategyError {
    /// Returns `true` when the failure was caused by a bounded wait expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StrategyError::Timeout { .. })
    }

    pub(crate) fn io(e: impl std::fmt::Display) -> Self {
        StrategyError::Io { detail: e.to_string() }
    }
}
