//! Experiment Configuration
//!
//! An [`ExperimentConfig`] fully determines one pipeline run: the watermark
//! strategy with its parameters, the window width, and the lateness budget.
//! Strategy-specific parameters live inside the [`StrategyKind`] variant, so
//! a periodic config cannot carry adaptive knobs and vice versa.
//!
//! The config also owns the deterministic output identifier: every field
//! appears verbatim in the file name, which is what makes the sweep's
//! skip-check idempotent: identical configurations always map to the same
//! file, and any differing field changes the name.

use crate::streammark::error::{PipelineError, PipelineResult};

/// Watermark strategy selection, with the parameters each variant needs.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyKind {
    /// Bounded-out-of-order watermarks published on a fixed timer.
    Periodic {
        /// Advancement interval in milliseconds of processing time.
        period_ms: i64,
    },
    /// Per-event adaptive watermarks; no timer, the strategy advances
    /// eagerly as events arrive.
    Adaptive {
        /// Disorder overshoot (ms) that must be exceeded before the
        /// out-of-order estimate grows.
        ooo_threshold: f64,
        /// Base adjustment strength of the estimator.
        sensitivity: f64,
        /// Rate at which the sensitivity is applied per adjustment.
        sensitivity_change_rate: f64,
    },
}

impl StrategyKind {
    /// Short label used in output identifiers and logs.
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::Periodic { .. } => "Periodic",
            StrategyKind::Adaptive { .. } => "Adaptive",
        }
    }
}

/// How the runner drives watermark advancement for a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advancement {
    /// Poll the strategy every `period_ms` of processing time.
    Interval { period_ms: i64 },
    /// Poll the strategy after every event; the periodic timer is disabled.
    PerEvent,
}

/// Window-assignment discipline for one pipeline run.
///
/// Selected by pipeline configuration, not by the aggregator: the sweep
/// always uses [`WindowDiscipline::EventTime`]; the count-triggered variant
/// exists for diagnostic counters on the single-run path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowDiscipline {
    /// Fixed-width event-time windows fired by watermark crossing.
    #[default]
    EventTime,
    /// Global windows that fire after a fixed number of buffered elements,
    /// regardless of watermark.
    GlobalCount { trigger: u64 },
}

/// Immutable description of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub strategy: StrategyKind,
    /// Window width in milliseconds of event time.
    pub window_width_ms: i64,
    /// Lateness budget in milliseconds. For the periodic strategy this is
    /// also the static out-of-orderness bound subtracted from the maximum
    /// seen timestamp; for the adaptive strategy it seeds the estimator's
    /// starting allowance.
    pub allowed_lateness_ms: i64,
}

impl ExperimentConfig {
    /// Convenience constructor for a periodic experiment.
    pub fn periodic(window_width_ms: i64, allowed_lateness_ms: i64, period_ms: i64) -> Self {
        ExperimentConfig {
            strategy: StrategyKind::Periodic { period_ms },
            window_width_ms,
            allowed_lateness_ms,
        }
    }

    /// Convenience constructor for an adaptive experiment.
    pub fn adaptive(
        window_width_ms: i64,
        allowed_lateness_ms: i64,
        ooo_threshold: f64,
        sensitivity: f64,
        sensitivity_change_rate: f64,
    ) -> Self {
        ExperimentConfig {
            strategy: StrategyKind::Adaptive {
                ooo_threshold,
                sensitivity,
                sensitivity_change_rate,
            },
            window_width_ms,
            allowed_lateness_ms,
        }
    }

    /// Validate parameter ranges before a run is started.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.window_width_ms <= 0 {
            return Err(PipelineError::Config(format!(
                "window width must be positive, got {}",
                self.window_width_ms
            )));
        }
        if self.allowed_lateness_ms < 0 {
            return Err(PipelineError::Config(format!(
                "allowed lateness must be non-negative, got {}",
                self.allowed_lateness_ms
            )));
        }
        match &self.strategy {
            StrategyKind::Periodic { period_ms } => {
                if *period_ms <= 0 {
                    return Err(PipelineError::Config(format!(
                        "watermark period must be positive, got {}",
                        period_ms
                    )));
                }
            }
            StrategyKind::Adaptive {
                ooo_threshold,
                sensitivity,
                sensitivity_change_rate,
            } => {
                for (name, v) in [
                    ("ooo threshold", *ooo_threshold),
                    ("sensitivity", *sensitivity),
                    ("sensitivity change rate", *sensitivity_change_rate),
                ] {
                    if !v.is_finite() || v <= 0.0 {
                        return Err(PipelineError::Config(format!(
                            "{} must be finite and positive, got {}",
                            name, v
                        )));
                    }
                }
                let gain = sensitivity * sensitivity_change_rate;
                if gain > 1.0 {
                    return Err(PipelineError::Config(format!(
                        "sensitivity * sensitivity change rate must not exceed 1, got {}",
                        gain
                    )));
                }
            }
        }
        Ok(())
    }

    /// How the runner should drive watermark advancement for this config.
    pub fn advancement(&self) -> Advancement {
        match &self.strategy {
            StrategyKind::Periodic { period_ms } => Advancement::Interval {
                period_ms: *period_ms,
            },
            StrategyKind::Adaptive { .. } => Advancement::PerEvent,
        }
    }

    /// Deterministic output file name for this configuration.
    ///
    /// Every field appears verbatim, so the name doubles as the idempotence
    /// key for the sweep's skip-check. `base` is typically the input file
    /// stem.
    pub fn output_file_name(&self, base: &str) -> String {
        match &self.strategy {
            StrategyKind::Periodic { period_ms } => format!(
                "{}PeriodicL-{}P-{}W-{}.txt",
                base, self.allowed_lateness_ms, period_ms, self.window_width_ms
            ),
            StrategyKind::Adaptive {
                ooo_threshold,
                sensitivity,
                sensitivity_change_rate,
            } => format!(
                "{}AdaptiveL-{}OOO-{}S-{}SCR-{}W-{}.txt",
                base,
                self.allowed_lateness_ms,
                ooo_threshold,
                sensitivity,
                sensitivity_change_rate,
                self.window_width_ms
            ),
        }
    }
}
