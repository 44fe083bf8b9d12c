//! Observer trait for fallback-pipeline events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::convert::FallbackPipelineBuilder::observer`] to follow the run as
//! the orchestrator walks the strategy chain. The CLI uses it to drive a
//! spinner that names the renderer currently being tried.
//!
//! # Example
//!
//! ```rust
//! use edgequake_html2pdf::PipelineObserver;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     failures: AtomicUsize,
//! }
//!
//! impl PipelineObserver for CountingObserver {
//!     fn on_attempt_failed(&self, strategy: &str, error: &str) {
//!         self.failures.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{strategy} failed: {error}");
//!     }
//! }
//!
//! let observer: Arc<dyn PipelineObserver> = Arc::new(CountingObserver {
//!     failures: AtomicUsize::new(0),
//! });
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the orchestrator as it tries each strategy.
///
/// Attempts run strictly one after another, so calls never overlap. All
/// methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    /// Called once before the first strategy is considered.
    ///
    /// # Arguments
    /// * `total` — number of strategies in the chain
    fn on_pipeline_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a strategy runs.
    ///
    /// # Arguments
    /// * `strategy` — strategy name
    /// * `index`    — 1-indexed position in the chain
    /// * `total`    — chain length
    fn on_attempt_start(&self, strategy: &str, index: usize, total: usize) {
        let _ = (strategy, index, total);
    }

    /// Called when a strategy is not available and is passed over.
    fn on_attempt_skipped(&self, strategy: &str, reason: &str) {
        let _ = (strategy, reason);
    }

    /// Called when a strategy ran and failed.
    fn on_attempt_failed(&self, strategy: &str, error: &str) {
        let _ = (strategy, error);
    }

    /// Called once when a strategy has written the output.
    fn on_success(&self, strategy: &str, pdf_path: &Path) {
        let _ = (strategy, pdf_path);
    }
}

/// Observer that ignores every event. The default.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Shared observer handle as stored by the pipeline.
pub type SharedObserver = Arc<dyn PipelineObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingObserver {
        total: AtomicUsize,
        starts: AtomicUsize,
        skips: AtomicUsize,
        failures: AtomicUsize,
        winner: Mutex<Option<String>>,
    }

    impl PipelineObserver for TrackingObserver {
        fn on_pipeline_start(&self, total: usize) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn on_attempt_start(&self, _strategy: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_attempt_skipped(&self, _strategy: &str, _reason: &str) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_attempt_failed(&self, _strategy: &str, _error: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_success(&self, strategy: &str, _pdf_path: &Path) {
            *self.winner.lock().unwrap() = Some(strategy.to_string());
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_pipeline_start(4);
        o.on_attempt_start("chromium", 1, 4);
        o.on_attempt_failed("chromium", "boom");
        o.on_attempt_skipped("wkhtmltopdf", "not installed");
        o.on_success("synthetic", Path::new("out.pdf"));
    }

    #[test]
    fn tracking_observer_receives_events() {
        let tracker = TrackingObserver::default();
        tracker.on_pipeline_start(4);
        tracker.on_attempt_start("chromium", 1, 4);
        tracker.on_attempt_failed("chromium", "launch failed");
        tracker.on_attempt_start("headless-chrome", 2, 4);
        tracker.on_attempt_failed("headless-chrome", "timeout");
        tracker.on_attempt_skipped("wkhtmltopdf", "not on PATH");
        tracker.on_attempt_start("synthetic", 4, 4);
        tracker.on_success("synthetic", Path::new("out.pdf"));

        assert_eq!(tracker.total.load(Ordering::SeqCst), 4);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.winner.lock().unwrap().as_deref(), Some("synthetic"));
    }

    #[test]
    fn arc_dyn_observer_works() {
        let o: SharedObserver = Arc::new(NoopObserver);
        o.on_pipeline_start(1);
        o.on_attempt_start("synthetic", 1, 1);
    }
}
