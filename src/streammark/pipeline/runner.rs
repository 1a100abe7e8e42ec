//! Pipeline Runner
//!
//! Executes one experiment to completion: events flow from the source
//! through the watermark strategy and the window aggregator into the sink,
//! all on the current task. Watermark advancement and window evaluation
//! therefore never overlap: with the periodic strategy the advancement
//! timer is a `tokio::select!` arm next to batch ingestion, and with the
//! adaptive strategy the strategy is polled inline after every event (the
//! timer is disabled entirely).
//!
//! The runner, not the strategy, owns the published watermark. Each poll
//! compares the strategy's value against the published one: lower aborts
//! the run as a [`PipelineError::WatermarkRegression`], higher is published
//! and drives window firing. After the source is exhausted the aggregator
//! is advanced to [`WATERMARK_FINAL`] so every remaining window fires; the
//! flush is bookkeeping for finite inputs, not a strategy emission.

use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::streammark::config::{Advancement, ExperimentConfig, WindowDiscipline};
use crate::streammark::error::{PipelineError, PipelineResult};
use crate::streammark::pipeline::sink::{FileResultSink, ResultSink};
use crate::streammark::pipeline::source::{EventSource, FileEventSource};
use crate::streammark::watermark::{create_generator, WATERMARK_FINAL, WATERMARK_MIN};
use crate::streammark::window::{CountTriggeredCounter, KeyedWindowAggregator};

/// Per-run totals, returned to the caller instead of accumulating in any
/// shared state, so sweeps can never bleed counts across runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Events produced by the source.
    pub events_read: u64,
    /// Events counted into a window (including late admissions).
    pub events_counted: u64,
    /// Windows fired, end-of-input flush included.
    pub windows_fired: u64,
    /// Events dropped by the lateness policy.
    pub late_events_dropped: u64,
    /// Distinct watermark values published by the strategy.
    pub watermarks_emitted: u64,
    /// Last strategy-published watermark; [`WATERMARK_MIN`] if the strategy
    /// never advanced. The end-of-input flush is not reflected here.
    pub final_watermark: i64,
}

/// Publication state for one run. Strategies only propose candidates; this
/// clock decides what becomes externally visible.
#[derive(Debug)]
struct WatermarkClock {
    published: i64,
    emitted: u64,
}

impl WatermarkClock {
    fn new() -> Self {
        WatermarkClock {
            published: WATERMARK_MIN,
            emitted: 0,
        }
    }

    /// Returns true if the candidate advanced the published watermark. A
    /// candidate below the published value is a fatal regression.
    fn observe(&mut self, candidate: i64) -> PipelineResult<bool> {
        if candidate < self.published {
            return Err(PipelineError::WatermarkRegression {
                previous: self.published,
                observed: candidate,
            });
        }
        if candidate > self.published {
            self.published = candidate;
            self.emitted += 1;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Runs one [`ExperimentConfig`] against a source/sink pair.
#[derive(Debug)]
pub struct PipelineRunner {
    config: ExperimentConfig,
    discipline: WindowDiscipline,
}

impl PipelineRunner {
    /// Validates the configuration up front; a bad grid point fails before
    /// any file is touched.
    pub fn new(config: ExperimentConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(PipelineRunner {
            config,
            discipline: WindowDiscipline::default(),
        })
    }

    /// Switch the run to a different window discipline. The sweep always
    /// uses the default event-time discipline.
    pub fn with_discipline(mut self, discipline: WindowDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run to completion, blocking the caller until the source is
    /// exhausted and every in-flight window has fired.
    pub async fn run(
        &self,
        source: &mut dyn EventSource,
        sink: &mut dyn ResultSink,
    ) -> PipelineResult<RunSummary> {
        match self.discipline {
            WindowDiscipline::EventTime => self.run_event_time(source, sink).await,
            WindowDiscipline::GlobalCount { trigger } => {
                self.run_count_triggered(trigger, source, sink).await
            }
        }
    }

    /// Convenience wrapper: CSV file in, atomic result file out.
    pub async fn execute_file(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> PipelineResult<RunSummary> {
        let mut source = FileEventSource::open(input_path).await?;
        let mut sink = FileResultSink::create(output_path).await?;
        self.run(&mut source, &mut sink).await
    }

    async fn run_event_time(
        &self,
        source: &mut dyn EventSource,
        sink: &mut dyn ResultSink,
    ) -> PipelineResult<RunSummary> {
        info!(
            "Starting {} run: window width {}ms, allowed lateness {}ms",
            self.config.strategy.label(),
            self.config.window_width_ms,
            self.config.allowed_lateness_ms
        );

        let mut generator = create_generator(&self.config);
        let mut aggregator = KeyedWindowAggregator::new(
            self.config.window_width_ms,
            self.config.allowed_lateness_ms,
        );
        let mut clock = WatermarkClock::new();
        let mut events_read = 0u64;
        let mut windows_fired = 0u64;

        match self.config.advancement() {
            Advancement::Interval { period_ms } => {
                let mut ticker = tokio::time::interval(Duration::from_millis(period_ms as u64));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        _ = ticker.tick() => {
                            if clock.observe(generator.current_watermark())? {
                                windows_fired +=
                                    Self::fire(&mut aggregator, clock.published, sink).await?;
                            }
                        }
                        batch = source.read() => {
                            let batch = batch?;
                            if batch.is_empty() {
                                break;
                            }
                            for event in &batch {
                                events_read += 1;
                                aggregator.on_event(event, clock.published);
                                generator.on_event(event);
                            }
                        }
                    }
                }
            }
            Advancement::PerEvent => loop {
                let batch = source.read().await?;
                if batch.is_empty() {
                    break;
                }
                for event in &batch {
                    events_read += 1;
                    // The event is judged against the watermark in force
                    // before it arrived; its own effect comes next.
                    aggregator.on_event(event, clock.published);
                    generator.on_event(event);
                    if clock.observe(generator.current_watermark())? {
                        windows_fired += Self::fire(&mut aggregator, clock.published, sink).await?;
                    }
                }
            },
        }

        let flushed = Self::fire(&mut aggregator, WATERMARK_FINAL, sink).await?;
        windows_fired += flushed;
        debug!("End-of-input flush fired {} windows", flushed);

        sink.finish().await?;

        let summary = RunSummary {
            events_read,
            events_counted: aggregator.events_counted(),
            windows_fired,
            late_events_dropped: aggregator.late_events_dropped(),
            watermarks_emitted: clock.emitted,
            final_watermark: clock.published,
        };
        info!(
            "Run complete: {} events read, {} windows fired, {} late events dropped, {} watermarks emitted",
            summary.events_read,
            summary.windows_fired,
            summary.late_events_dropped,
            summary.watermarks_emitted
        );
        Ok(summary)
    }

    async fn fire(
        aggregator: &mut KeyedWindowAggregator,
        watermark: i64,
        sink: &mut dyn ResultSink,
    ) -> PipelineResult<u64> {
        let fired = aggregator.advance_to(watermark)?;
        if fired.is_empty() {
            return Ok(0);
        }
        debug!("Watermark {} fired {} windows", watermark, fired.len());
        sink.write_results(&fired).await?;
        Ok(fired.len() as u64)
    }

    /// Diagnostic discipline: no watermarks, no keyed windows; batches of
    /// `trigger` events produce one count row each.
    async fn run_count_triggered(
        &self,
        trigger: u64,
        source: &mut dyn EventSource,
        sink: &mut dyn ResultSink,
    ) -> PipelineResult<RunSummary> {
        info!("Starting count-triggered run: {} events per batch", trigger);

        let mut counter = CountTriggeredCounter::new(trigger);
        let mut events_read = 0u64;
        let mut batches = 0u64;

        loop {
            let batch = source.read().await?;
            if batch.is_empty() {
                break;
            }
            for event in &batch {
                events_read += 1;
                if let Some(summary) = counter.on_event(event) {
                    sink.write_counts(std::slice::from_ref(&summary)).await?;
                    batches += 1;
                }
            }
        }
        if let Some(summary) = counter.flush() {
            sink.write_counts(std::slice::from_ref(&summary)).await?;
            batches += 1;
        }
        sink.finish().await?;

        info!(
            "Count run complete: {} events read, {} batches emitted",
            events_read, batches
        );
        Ok(RunSummary {
            events_read,
            events_counted: events_read,
            windows_fired: batches,
            late_events_dropped: 0,
            watermarks_emitted: 0,
            final_watermark: WATERMARK_MIN,
        })
    }
}
