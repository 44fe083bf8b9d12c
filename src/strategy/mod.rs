//! Renderer strategies, highest fidelity first.
//!
//! Each strategy is an independent way to turn a [`LoadedSource`] into a PDF
//! at [`RenderRequest::output`]. The orchestrator in [`crate::convert`] tries
//! them in order and stops at the first success:
//!
//! 1. [`chromium`]    — Chromium over CDP via `chromiumoxide` (async)
//! 2. [`headless`]    — Chromium via `headless_chrome` (blocking, own launcher)
//! 3. [`wkhtmltopdf`] — the `wkhtmltopdf` command-line converter
//! 4. [`synthetic`]   — a text-only PDF written in-process; needs nothing
//!    installed and is what keeps the chain from ending empty-handed
//!
//! ## Output contract
//!
//! A strategy must either leave a complete, valid PDF at the destination or
//! leave the destination untouched. Every strategy stages its bytes next to
//! the destination and goes through [`write_pdf`] or [`persist_staged`], which
//! check the `%PDF-` header before an atomic rename.

pub mod chromium;
pub mod headless;
pub mod synthetic;
pub mod wkhtmltopdf;

pub use chromium::ChromiumStrategy;
pub use headless::HeadlessChromeStrategy;
pub use synthetic::SyntheticPdfStrategy;
pub use wkhtmltopdf::WkhtmltopdfStrategy;

use crate::config::RenderRequest;
use crate::error::StrategyError;
use crate::pipeline::input::LoadedSource;
use async_trait::async_trait;
use std::future::Future;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Placeholder for the missing half when only a header or only a footer is
/// given; Chromium otherwise prints its default date/title/URL there.
pub(crate) const EMPTY_TEMPLATE: &str = "<span></span>";

/// Whether a strategy can run in this environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// One way of producing the PDF.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Cheap environment check. Unavailable strategies are skipped without
    /// counting as a failure.
    fn availability(&self) -> Availability {
        Availability::Available
    }

    /// Try to write `request.output` from `source`.
    async fn attempt(&self, source: &LoadedSource, request: &RenderRequest) -> Result<(), StrategyError>;
}

// ── Output staging ─────────────────────────────────────────────────────────

/// Create the destination directory and a temporary `.pdf` file beside the
/// destination, so the final rename never crosses file systems.
pub(crate) fn stage_output(output: &Path) -> Result<NamedTempFile, StrategyError> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(StrategyError::io)?;
    tempfile::Builder::new()
        .prefix(".html2pdf-")
        .suffix(".pdf")
        .tempfile_in(parent)
        .map_err(StrategyError::io)
}

/// Validate and atomically write `bytes` to `output`.
pub(crate) fn write_pdf(output: &Path, bytes: &[u8]) -> Result<(), StrategyError> {
    check_magic(bytes)?;
    let mut staged = stage_output(output)?;
    staged.write_all(bytes).map_err(StrategyError::io)?;
    staged.flush().map_err(StrategyError::io)?;
    staged.persist(output).map_err(|e| StrategyError::io(e.error))?;
    debug!("Wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}

/// Validate a staged file written by an external process and move it into
/// place. Dropping `staged` on error deletes it.
pub(crate) fn persist_staged(staged: NamedTempFile, output: &Path) -> Result<(), StrategyError> {
    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    std::fs::File::open(staged.path())
        .map_err(StrategyError::io)?
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .map_err(StrategyError::io)?;
    check_magic(&head)?;
    staged.persist(output).map_err(|e| StrategyError::io(e.error))?;
    Ok(())
}

fn check_magic(bytes: &[u8]) -> Result<(), StrategyError> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(StrategyError::InvalidPdf {
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        })
    }
}

// ── Shared option mapping ──────────────────────────────────────────────────

/// Millimetres to inches, the unit Chromium's print API uses.
pub(crate) fn mm_to_inches(mm: u32) -> f64 {
    f64::from(mm) / 25.4
}

/// Header and footer templates for Chromium, or `None` when neither is set.
pub(crate) fn chromium_templates(request: &RenderRequest) -> Option<(String, String)> {
    if !request.has_header_footer() {
        return None;
    }
    Some((
        request
            .header_template
            .clone()
            .unwrap_or_else(|| EMPTY_TEMPLATE.to_string()),
        request
            .footer_template
            .clone()
            .unwrap_or_else(|| EMPTY_TEMPLATE.to_string()),
    ))
}

/// JavaScript that appends `css` as a `<style>` element to the document.
pub(crate) fn style_injection_script(css: &str) -> String {
    // A JSON string literal is a valid JS string literal.
    let literal = serde_json::Value::String(css.to_string()).to_string();
    format!(
        "(() => {{ const s = document.createElement('style'); s.textContent = {literal}; \
         (document.head || document.documentElement).appendChild(s); return true; }})()"
    )
}

/// Run `fut` for at most `limit`, reporting expiry as a timeout in `stage`.
pub(crate) async fn bounded<F: Future>(
    limit: Duration,
    stage: &str,
    fut: F,
) -> Result<F::Output, StrategyError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StrategyError::Timeout {
            stage: stage.to_string(),
            after_ms: limit.as_millis() as u64,
        })
}

/// Write `contents` to a temporary file ending in `suffix` (markup for
/// engines that only navigate, stylesheets and templates for the CLI
/// converter). The file is removed when the handle drops.
pub(crate) fn stage_temp(contents: &str, suffix: &str) -> Result<NamedTempFile, StrategyError> {
    let mut file = tempfile::Builder::new()
        .prefix("html2pdf-")
        .suffix(suffix)
        .tempfile()
        .map_err(StrategyError::io)?;
    file.write_all(contents.as_bytes()).map_err(StrategyError::io)?;
    file.flush().map_err(StrategyError::io)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_pdf_rejects_non_pdf_and_leaves_destination_alone() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        let err = write_pdf(&out, b"<html>").unwrap_err();
        assert!(matches!(err, StrategyError::InvalidPdf { ref magic } if magic == b"<html"));
        assert!(!out.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_pdf_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/deeper/out.pdf");
        write_pdf(&out, b"%PDF-1.7\n%%EOF").unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-1.7\n%%EOF");
    }

    #[test]
    fn persist_staged_validates_header() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");

        let mut bad = stage_output(&out).unwrap();
        bad.write_all(b"oops").unwrap();
        assert!(persist_staged(bad, &out).is_err());
        assert!(!out.exists());

        let mut good = stage_output(&out).unwrap();
        good.write_all(b"%PDF-1.4 body").unwrap();
        persist_staged(good, &out).unwrap();
        assert!(std::fs::read(&out).unwrap().starts_with(PDF_MAGIC));
    }

    #[test]
    fn templates_fill_missing_half() {
        let r = RenderRequest::builder("x.pdf").build().unwrap();
        assert!(chromium_templates(&r).is_none());

        let r = RenderRequest::builder("x.pdf")
            .footer_template("<span class=\"pageNumber\"></span>")
            .build()
            .unwrap();
        let (header, footer) = chromium_templates(&r).unwrap();
        assert_eq!(header, EMPTY_TEMPLATE);
        assert!(footer.contains("pageNumber"));
    }

    #[test]
    fn style_script_escapes_css() {
        let js = style_injection_script("body { font-family: \"A\" }\n</style>");
        assert!(js.contains(r#""body { font-family: \"A\" }\n</style>""#), "{js}");
        assert!(js.starts_with("(() =>"));
    }

    #[tokio::test]
    async fn bounded_reports_stage_on_expiry() {
        let slow = tokio::time::sleep(Duration::from_secs(5));
        let err = bounded(Duration::from_millis(10), "navigating", slow).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("navigating"));

        let fast = async { 7 };
        assert_eq!(bounded(Duration::from_secs(1), "x", fast).await.unwrap(), 7);
    }

    #[test]
    fn inches_conversion() {
        assert!((mm_to_inches(254) - 10.0).abs() < 1e-9);
        assert_eq!(mm_to_inches(0), 0.0);
    }
}
