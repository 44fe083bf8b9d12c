//! # edgequake-html2pdf
//!
//! Convert HTML files, URLs and inline markup to PDF, in CI or from code.
//!
//! ## Why a fallback chain?
//!
//! Headless Chrome renders HTML best, but CI images are hostile to it: no
//! browser installed, a sandbox that refuses to start, a missing shared
//! library. Instead of failing the job, this crate tries a series of
//! renderers with decreasing fidelity and keeps the first PDF that comes out.
//! The last one needs nothing at all, so a run only fails when the disk does.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source string
//!  │
//!  ├─ 1. Input      file? URL? otherwise inline markup
//!  ├─ 2. Normalise  raw options → RenderRequest (once, shared by all)
//!  └─ 3. Chain      first success wins, each attempt under a deadline
//!        ├─ chromium         chromiumoxide, CDP, async
//!        ├─ headless-chrome  headless_chrome, blocking, separate launcher
//!        ├─ wkhtmltopdf      external converter, only if installed
//!        └─ synthetic        text-only PDF via pdf-writer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_html2pdf::{convert, Margin, RenderRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = RenderRequest::builder("dist/report.pdf")
//!         .margin(Margin::uniform(15))
//!         .wait_for("#app[data-ready]")
//!         .build()?;
//!     let report = convert("https://example.com/report", &request).await?;
//!     eprintln!("{} written by {}", report.pdf_path.display(), report.strategy);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `html2pdf` binary (clap + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-html2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod locate;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod strategy;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Cookie, Margin, Orientation, PaperFormat, RawConfig, RenderRequest, RenderRequestBuilder};
pub use convert::{convert, convert_sync, FallbackPipeline, FallbackPipelineBuilder, StrategyStatus};
pub use error::{Html2PdfError, StrategyError};
pub use locate::{ExecutableLocator, StaticLocator, SystemLocator};
pub use output::{AttemptOutcome, AttemptRecord, ConversionReport};
pub use pipeline::input::{LoadedSource, Source};
pub use progress::{NoopObserver, PipelineObserver};
pub use strategy::{
    Availability, ChromiumStrategy, HeadlessChromeStrategy, Strategy, SyntheticPdfStrategy, WkhtmltopdfStrategy,
};
