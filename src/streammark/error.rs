//! Error Handling for Pipeline Runs
//!
//! All fallible operations in the crate return [`PipelineResult`]. Variants
//! carry enough context to tell a defective strategy under test apart from an
//! environmental failure: invariant breaches ([`PipelineError::WatermarkRegression`],
//! [`PipelineError::DuplicateFiring`]) abort the run they occur in, while
//! source and sink failures are reported per configuration by the sweep
//! harness, which then moves on to the next grid point.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by a single pipeline run or by the sweep harness.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The event source could not be opened or read.
    #[error("source error for '{path}': {message}")]
    Source { path: String, message: String },

    /// A source line could not be parsed into an event.
    #[error("malformed event at {path}:{line}: {message}")]
    MalformedEvent {
        path: String,
        line: usize,
        message: String,
    },

    /// The result sink could not be created, written, or finalized.
    #[error("sink error for '{path}': {message}")]
    Sink { path: String, message: String },

    /// A watermark strategy published a value lower than one it already
    /// published. Fatal for the run: clamping here would hide a defect in
    /// the estimator under test.
    #[error("watermark regressed from {previous} to {observed}")]
    WatermarkRegression { previous: i64, observed: i64 },

    /// A window produced a second result. Each window must fire at most
    /// once; a duplicate means aggregator state was corrupted.
    #[error("window [{start}, {end}) for key '{key}' fired more than once")]
    DuplicateFiring { key: String, start: i64, end: i64 },

    /// An experiment configuration failed validation.
    #[error("invalid experiment config: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create a source error with path context.
    pub fn source(path: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Source {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a sink error with path context.
    pub fn sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Sink {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-event error pointing at a source line.
    pub fn malformed_event(
        path: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        PipelineError::MalformedEvent {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// True for errors that indicate a defect in the component under test
    /// rather than a problem with the run's environment.
    pub fn is_invariant_breach(&self) -> bool {
        matches!(
            self,
            PipelineError::WatermarkRegression { .. } | PipelineError::DuplicateFiring { .. }
        )
    }
}
