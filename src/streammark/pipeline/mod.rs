//! Pipeline Assembly
//!
//! One pipeline run wires a source, a watermark strategy, the window
//! aggregator, and a sink for a single [`ExperimentConfig`], runs the
//! stream to exhaustion, and reports per-run totals in a [`RunSummary`].
//! Sources and sinks are trait objects so tests can run entirely in
//! memory while experiments use the file-backed implementations.
//!
//! [`ExperimentConfig`]: crate::streammark::config::ExperimentConfig

pub mod runner;
pub mod sink;
pub mod source;

pub use runner::{PipelineRunner, RunSummary};
pub use sink::{FileResultSink, MemoryResultSink, ResultSink};
pub use source::{EventSource, FileEventSource, MemoryEventSource};
