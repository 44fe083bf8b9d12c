//! Conversion entry points and the fallback orchestrator.
//!
//! [`FallbackPipeline`] holds an ordered list of [`Strategy`] values and
//! walks it once per conversion:
//!
//! ```text
//! Pending ─▶ Attempting(1) ─ok─▶ Success(pdf_path)
//!                 │ err / skipped
//!                 ▼
//!            Attempting(2) ─ok─▶ Success
//!                 │
//!                 ⋮
//!                 ▼
//!            Exhausted(diagnostics)
//! ```
//!
//! Attempts are strictly sequential: they would all race for the same
//! output path, and only one result is ever kept. Each attempt runs under
//! [`RenderRequest::attempt_deadline`]; when it expires the attempt future is
//! dropped, which tears down the browser or child process it owned, and the
//! chain moves on.

use crate::config::RenderRequest;
use crate::error::{Html2PdfError, StrategyError};
use crate::locate::{ExecutableLocator, SystemLocator};
use crate::output::{AttemptOutcome, AttemptRecord, ConversionReport};
use crate::pipeline::input::LoadedSource;
use crate::progress::{NoopObserver, SharedObserver};
use crate::strategy::{
    Availability, ChromiumStrategy, HeadlessChromeStrategy, Strategy, SyntheticPdfStrategy, WkhtmltopdfStrategy,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert an HTML file, URL or inline markup to a PDF at `request.output`.
///
/// Uses the standard strategy chain (Chromium, headless_chrome, wkhtmltopdf,
/// synthetic) with executables discovered on this machine.
///
/// # Errors
/// Returns `Err(Html2PdfError)` only for fatal errors:
/// - the source is a file that cannot be read
/// - every strategy failed (`PipelineExhausted`)
///
/// # Example
/// ```rust,no_run
/// use edgequake_html2pdf::{convert, RenderRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = RenderRequest::builder("out/report.pdf").build()?;
/// let report = convert("<h1>Hello</h1>", &request).await?;
/// println!("{} via {}", report.pdf_path.display(), report.strategy);
/// # Ok(())
/// # }
/// ```
pub async fn convert(source: impl AsRef<str>, request: &RenderRequest) -> Result<ConversionReport, Html2PdfError> {
    FallbackPipeline::standard(Arc::new(SystemLocator))
        .convert(source, request)
        .await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(source: impl AsRef<str>, request: &RenderRequest) -> Result<ConversionReport, Html2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Html2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(source, request))
}

/// Availability of one strategy, as reported by [`FallbackPipeline::probe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyStatus {
    pub name: &'static str,
    pub availability: Availability,
}

/// An ordered chain of strategies tried until one succeeds.
pub struct FallbackPipeline {
    strategies: Vec<Box<dyn Strategy>>,
    observer: SharedObserver,
}

impl FallbackPipeline {
    pub fn builder() -> FallbackPipelineBuilder {
        FallbackPipelineBuilder {
            strategies: Vec::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// The standard chain, highest fidelity first.
    pub fn standard(locator: Arc<dyn ExecutableLocator>) -> Self {
        Self::standard_builder(locator).build()
    }

    /// Builder preloaded with the standard chain, for adding an observer.
    pub fn standard_builder(locator: Arc<dyn ExecutableLocator>) -> FallbackPipelineBuilder {
        Self::builder()
            .strategy(ChromiumStrategy::new(Arc::clone(&locator)))
            .strategy(HeadlessChromeStrategy::new(Arc::clone(&locator)))
            .strategy(WkhtmltopdfStrategy::new(locator))
            .strategy(SyntheticPdfStrategy)
    }

    /// Strategy names in the order they will be tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Check every strategy's availability without running anything.
    pub fn probe(&self) -> Vec<StrategyStatus> {
        self.strategies
            .iter()
            .map(|s| StrategyStatus {
                name: s.name(),
                availability: s.availability(),
            })
            .collect()
    }

    /// Resolve and load `source`, then run the chain.
    pub async fn convert(
        &self,
        source: impl AsRef<str>,
        request: &RenderRequest,
    ) -> Result<ConversionReport, Html2PdfError> {
        let source = LoadedSource::from_input(source.as_ref())?;
        info!(
            "Converting {} source to {}",
            source.source.kind(),
            request.output.display()
        );
        self.run(&source, request).await
    }

    /// Run the chain against an already loaded source.
    pub async fn run(&self, source: &LoadedSource, request: &RenderRequest) -> Result<ConversionReport, Html2PdfError> {
        let total_start = Instant::now();
        let total = self.strategies.len();
        let deadline = request.attempt_deadline();
        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(total);

        self.observer.on_pipeline_start(total);

        for (index, strategy) in self.strategies.iter().enumerate() {
            let name = strategy.name();

            if let Availability::Unavailable(reason) = strategy.availability() {
                info!("Skipping {}: {}", name, reason);
                self.observer.on_attempt_skipped(name, &reason);
                attempts.push(AttemptRecord {
                    strategy: name.to_string(),
                    outcome: AttemptOutcome::Skipped { reason },
                    duration_ms: 0,
                });
                continue;
            }

            info!("Attempt {}/{}: {}", index + 1, total, name);
            self.observer.on_attempt_start(name, index + 1, total);
            let started = Instant::now();

            let attempt = AssertUnwindSafe(strategy.attempt(source, request)).catch_unwind();
            let result = match tokio::time::timeout(deadline, attempt).await {
                Ok(Ok(result)) => result,
                Ok(Err(_panic)) => Err(StrategyError::Render {
                    detail: format!("{name} panicked"),
                }),
                Err(_) => Err(StrategyError::Timeout {
                    stage: "running the attempt".to_string(),
                    after_ms: deadline.as_millis() as u64,
                }),
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    info!("{} succeeded in {}ms", name, duration_ms);
                    self.observer.on_success(name, &request.output);
                    attempts.push(AttemptRecord {
                        strategy: name.to_string(),
                        outcome: AttemptOutcome::Succeeded,
                        duration_ms,
                    });
                    return Ok(ConversionReport {
                        pdf_path: request.output.clone(),
                        strategy: name.to_string(),
                        source_kind: source.source.kind().to_string(),
                        attempts,
                        total_duration_ms: total_start.elapsed().as_millis() as u64,
                    });
                }
                Err(e) => {
                    warn!("{} failed after {}ms: {}", name, duration_ms, e);
                    debug!("{} failure detail: {:?}", name, e);
                    self.observer.on_attempt_failed(name, &e.to_string());
                    attempts.push(AttemptRecord {
                        strategy: name.to_string(),
                        outcome: AttemptOutcome::Failed { error: e },
                        duration_ms,
                    });
                }
            }
        }

        let diagnostics: Vec<String> = attempts.iter().filter_map(AttemptRecord::diagnostic).collect();
        Err(Html2PdfError::PipelineExhausted {
            attempted: diagnostics.len(),
            diagnostics,
        })
    }
}

/// Builder for [`FallbackPipeline`].
pub struct FallbackPipelineBuilder {
    strategies: Vec<Box<dyn Strategy>>,
    observer: SharedObserver,
}

impl FallbackPipelineBuilder {
    /// Append a strategy; strategies run in insertion order.
    pub fn strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> FallbackPipeline {
        FallbackPipeline {
            strategies: self.strategies,
            observer: self.observer,
        }
    }
}
