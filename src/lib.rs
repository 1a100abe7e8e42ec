//! # streammark
//!
//! Evaluates event-time watermark strategies over a keyed, windowed
//! streaming pipeline and measures how each strategy trades completeness
//! against latency: how many late events it sacrifices versus how far its
//! watermark overshoots window boundaries at firing time.
//!
//! ## Features
//!
//! - **Two watermark disciplines**: periodic bounded-out-of-order
//!   advancement on a processing-time timer, and per-event adaptive
//!   advancement driven by observed disorder
//! - **Keyed tumbling windows**: fired exactly once when the watermark
//!   crosses their end, each reporting its element count and the
//!   watermark's lag past the boundary
//! - **Resumable sweeps**: a Cartesian configuration grid where completed
//!   grid points are recognized by their deterministic output file names
//!   and skipped on re-runs
//! - **Atomic outputs**: a result file appears under its final name only
//!   when the run completes, so partial runs never masquerade as finished
//! - **Synthetic inputs**: seeded generation of keyed streams with bounded
//!   out-of-orderness
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use streammark::{ExperimentConfig, PipelineRunner};
//!
//! #[tokio::main]
//! async fn main() -> streammark::PipelineResult<()> {
//!     // Tumbling 1s windows, 100ms lateness budget, watermark published
//!     // every 10ms of processing time.
//!     let config = ExperimentConfig::periodic(1000, 100, 10);
//!     let runner = PipelineRunner::new(config)?;
//!     let summary = runner
//!         .execute_file(Path::new("events.csv"), Path::new("results.txt"))
//!         .await?;
//!     println!("{} windows fired", summary.windows_fired);
//!     Ok(())
//! }
//! ```

pub mod streammark;

// Re-export the main API at the crate root for easy access
pub use streammark::config::{Advancement, ExperimentConfig, StrategyKind, WindowDiscipline};
pub use streammark::error::{PipelineError, PipelineResult};
pub use streammark::model::{Event, Window, WindowResult};
pub use streammark::pipeline::{
    EventSource, FileEventSource, FileResultSink, MemoryEventSource, MemoryResultSink,
    PipelineRunner, ResultSink, RunSummary,
};
pub use streammark::sweep::{FailedRun, SweepConfig, SweepHarness, SweepReport};
pub use streammark::watermark::{
    create_generator, AdaptiveWatermarkGenerator, BoundedOutOfOrderGenerator, WatermarkGenerator,
    WATERMARK_FINAL, WATERMARK_MIN,
};
pub use streammark::window::{
    CountTriggeredCounter, CountWindowSummary, EventDisposition, KeyedWindowAggregator,
};
