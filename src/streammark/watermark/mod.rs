//! Watermark Generation Strategies
//!
//! A watermark is a per-run, monotonically non-decreasing lower bound on
//! future event timestamps: once it reaches `W`, no event with a smaller
//! timestamp is expected. The aggregator uses it to decide when a window is
//! complete.
//!
//! Strategies form a closed set behind [`WatermarkGenerator`]: the runner
//! feeds every event to [`WatermarkGenerator::on_event`] and reads
//! [`WatermarkGenerator::current_watermark`] either on a fixed timer
//! (periodic strategy) or after every event (adaptive strategy). Strategies
//! are plain state machines; publication, monotonicity enforcement, and
//! advancement counting all live in the pipeline runner.

pub mod adaptive;
pub mod periodic;

pub use adaptive::AdaptiveWatermarkGenerator;
pub use periodic::BoundedOutOfOrderGenerator;

use crate::streammark::config::{ExperimentConfig, StrategyKind};
use crate::streammark::model::Event;

/// Watermark value before anything has been published.
pub const WATERMARK_MIN: i64 = i64::MIN;

/// Watermark used to flush all remaining windows once a finite source is
/// exhausted.
pub const WATERMARK_FINAL: i64 = i64::MAX;

/// Contract every watermark strategy implements.
///
/// `current_watermark` must be non-decreasing over the life of a run; the
/// runner treats a regression as a fatal defect in the strategy under test
/// and aborts rather than clamping.
pub trait WatermarkGenerator: Send {
    /// Observe one event. Called exactly once per event, in arrival order.
    fn on_event(&mut self, event: &Event);

    /// The strategy's current watermark, or [`WATERMARK_MIN`] if it has not
    /// seen enough input to publish one.
    fn current_watermark(&self) -> i64;
}

/// Build the generator selected by an experiment configuration.
pub fn create_generator(config: &ExperimentConfig) -> Box<dyn WatermarkGenerator> {
    match &config.strategy {
        StrategyKind::Periodic { .. } => Box::new(BoundedOutOfOrderGenerator::new(
            config.allowed_lateness_ms,
        )),
        StrategyKind::Adaptive {
            ooo_threshold,
            sensitivity,
            sensitivity_change_rate,
        } => Box::new(AdaptiveWatermarkGenerator::new(
            config.allowed_lateness_ms,
            *ooo_threshold,
            *sensitivity,
            *sensitivity_change_rate,
        )),
    }
}
