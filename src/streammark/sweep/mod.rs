//! Configuration Sweep Harness
//!
//! Enumerates the Cartesian product of the experiment axes and runs one
//! pipeline per grid point, strictly sequentially. The output file name
//! encodes every configuration field, so a file that already exists means
//! that grid point is done and is skipped; together with the sink's
//! temp-then-rename discipline this makes a sweep resumable after a crash
//! or partial failure without redoing completed work.
//!
//! Enumeration order is fixed so re-runs walk the grid identically:
//! adaptive experiments first (sensitivity change rate, then out-of-order
//! threshold, then window width, then sensitivity), periodic experiments
//! second (period, then allowed lateness, then window width).

use std::path::{Path, PathBuf};

use log::{error, info};
use serde::Serialize;

use crate::streammark::config::ExperimentConfig;
use crate::streammark::error::{PipelineError, PipelineResult};
use crate::streammark::pipeline::PipelineRunner;

pub const DEFAULT_SENSITIVITIES: &[f64] = &[1.0];
pub const DEFAULT_SENSITIVITY_CHANGE_RATES: &[f64] = &[1.0, 0.1, 0.01];
pub const DEFAULT_OOO_THRESHOLDS: &[f64] = &[1.1, 0.1, 0.01];
pub const DEFAULT_WINDOW_WIDTHS_MS: &[i64] = &[100, 1000];
pub const DEFAULT_PERIODS_MS: &[i64] = &[200, 10];
pub const DEFAULT_PERIODIC_LATENESS_MS: &[i64] = &[100, 1000];
/// The adaptive grid pins allowed lateness instead of sweeping it; it only
/// seeds the estimator's starting allowance.
pub const DEFAULT_ADAPTIVE_LATENESS_MS: i64 = 1000;

/// Base name used in output identifiers: the input file's stem.
pub fn input_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("events")
}

/// Input, output directory, and the axis arrays spanning the grid.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub sensitivities: Vec<f64>,
    pub sensitivity_change_rates: Vec<f64>,
    pub ooo_thresholds: Vec<f64>,
    pub window_widths_ms: Vec<i64>,
    pub periods_ms: Vec<i64>,
    pub periodic_lateness_ms: Vec<i64>,
    pub adaptive_lateness_ms: i64,
}

impl SweepConfig {
    /// A sweep over the default axes.
    pub fn new(input_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        SweepConfig {
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            sensitivities: DEFAULT_SENSITIVITIES.to_vec(),
            sensitivity_change_rates: DEFAULT_SENSITIVITY_CHANGE_RATES.to_vec(),
            ooo_thresholds: DEFAULT_OOO_THRESHOLDS.to_vec(),
            window_widths_ms: DEFAULT_WINDOW_WIDTHS_MS.to_vec(),
            periods_ms: DEFAULT_PERIODS_MS.to_vec(),
            periodic_lateness_ms: DEFAULT_PERIODIC_LATENESS_MS.to_vec(),
            adaptive_lateness_ms: DEFAULT_ADAPTIVE_LATENESS_MS,
        }
    }

    /// The full grid in fixed enumeration order.
    pub fn experiments(&self) -> Vec<ExperimentConfig> {
        let mut configs = Vec::new();
        for &change_rate in &self.sensitivity_change_rates {
            for &threshold in &self.ooo_thresholds {
                for &width in &self.window_widths_ms {
                    for &sensitivity in &self.sensitivities {
                        configs.push(ExperimentConfig::adaptive(
                            width,
                            self.adaptive_lateness_ms,
                            threshold,
                            sensitivity,
                            change_rate,
                        ));
                    }
                }
            }
        }
        for &period in &self.periods_ms {
            for &lateness in &self.periodic_lateness_ms {
                for &width in &self.window_widths_ms {
                    configs.push(ExperimentConfig::periodic(width, lateness, period));
                }
            }
        }
        configs
    }
}

/// One grid point that did not complete, with the error it reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRun {
    pub identifier: String,
    pub error: String,
}

/// Per-configuration outcome of one harness invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedRun>,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.skipped.len() + self.failed.len()
    }
}

/// Drives a full sweep: one sequential [`PipelineRunner`] per grid point.
pub struct SweepHarness {
    config: SweepConfig,
}

impl SweepHarness {
    pub fn new(config: SweepConfig) -> Self {
        SweepHarness { config }
    }

    /// Walk the grid. Individual run failures are recorded and do not stop
    /// the remaining configurations; only an unusable output directory
    /// fails the sweep itself.
    pub async fn run(&self) -> PipelineResult<SweepReport> {
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| {
                PipelineError::sink(
                    self.config.output_dir.display().to_string(),
                    format!("cannot create output directory: {}", e),
                )
            })?;

        let base = input_stem(&self.config.input_path).to_string();
        let experiments = self.config.experiments();
        info!(
            "Sweeping {} configurations from '{}' into '{}'",
            experiments.len(),
            self.config.input_path.display(),
            self.config.output_dir.display()
        );

        let mut report = SweepReport::default();
        for config in experiments {
            let identifier = config.output_file_name(&base);
            let output_path = self.config.output_dir.join(&identifier);

            if output_path.exists() {
                info!("Skipping {}: output already present", identifier);
                report.skipped.push(identifier);
                continue;
            }

            let outcome = match PipelineRunner::new(config) {
                Ok(runner) => {
                    runner
                        .execute_file(&self.config.input_path, &output_path)
                        .await
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(summary) => {
                    info!(
                        "Completed {}: {} windows fired, {} late events dropped",
                        identifier, summary.windows_fired, summary.late_events_dropped
                    );
                    report.completed.push(identifier);
                }
                Err(e) => {
                    error!("Run {} failed: {}", identifier, e);
                    report.failed.push(FailedRun {
                        identifier,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Sweep finished: {} completed, {} skipped, {} failed",
            report.completed.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }
}
