//! Result types returned by a successful conversion.

use crate::error::StrategyError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one strategy during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The strategy produced the output PDF.
    Succeeded,
    /// The strategy ran and failed; the chain moved on.
    Failed { error: StrategyError },
    /// The strategy was not available here and did not run.
    Skipped { reason: String },
}

/// One entry per strategy that the orchestrator considered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Strategy name, e.g. `"chromium"`.
    pub strategy: String,
    pub outcome: AttemptOutcome,
    /// Wall-clock time spent in the attempt (0 for skipped strategies).
    pub duration_ms: u64,
}

impl AttemptRecord {
    /// `strategy: error` line for failure reports; `None` unless failed.
    pub fn diagnostic(&self) -> Option<String> {
        match &self.outcome {
            AttemptOutcome::Failed { error } => Some(format!("{}: {}", self.strategy, error)),
            _ => None,
        }
    }
}

/// The successful result of a conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// The PDF that was written (the `pdf_path` output).
    pub pdf_path: PathBuf,
    /// Name of the strategy that produced it.
    pub strategy: String,
    /// Source kind: `file`, `url` or `inline`.
    pub source_kind: String,
    /// Every strategy considered, in order, up to and including the winner.
    pub attempts: Vec<AttemptRecord>,
    pub total_duration_ms: u64,
}

impl ConversionReport {
    /// `true` when a lower-fidelity strategy had to step in.
    pub fn degraded(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| matches!(a.outcome, AttemptOutcome::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serialises_with_tagged_outcomes() {
        let report = ConversionReport {
            pdf_path: PathBuf::from("out.pdf"),
            strategy: "synthetic".into(),
            source_kind: "inline".into(),
            attempts: vec![
                AttemptRecord {
                    strategy: "chromium".into(),
                    outcome: AttemptOutcome::Failed {
                        error: StrategyError::Launch { detail: "no sandbox".into() },
                    },
                    duration_ms: 12,
                },
                AttemptRecord {
                    strategy: "wkhtmltopdf".into(),
                    outcome: AttemptOutcome::Skipped { reason: "not on PATH".into() },
                    duration_ms: 0,
                },
                AttemptRecord {
                    strategy: "synthetic".into(),
                    outcome: AttemptOutcome::Succeeded,
                    duration_ms: 3,
                },
            ],
            total_duration_ms: 15,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""status":"failed""#), "{json}");
        assert!(json.contains(r#""status":"skipped""#));
        assert!(json.contains(r#""pdf_path":"out.pdf""#));
        assert!(report.degraded());
        assert_eq!(
            report.attempts[0].diagnostic().as_deref(),
            Some("chromium: browser launch failed: no sandbox")
        );
        assert!(report.attempts[1].diagnostic().is_none());
    }
}
