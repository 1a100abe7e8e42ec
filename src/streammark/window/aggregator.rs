//! Keyed tumbling-window state machine.
//!
//! Open windows live in a `BTreeMap` keyed by `(start, key)` so one
//! watermark advancement can split off every window whose end the
//! watermark has crossed and fire them in deterministic order. Fired
//! windows release their count immediately; only their identity is
//! remembered, and only while the lateness budget still covers them, so
//! state stays bounded by the disorder horizon rather than the run
//! length.
//!
//! Late-data policy: an event whose window already fired is never
//! re-fired. It is dropped and tallied, even inside the lateness budget.
//! The budget only rescues events whose window never fired, which can
//! happen when a window stayed empty until after the watermark passed
//! its end. Those windows open late and fire at the next advancement.

use std::collections::{BTreeMap, BTreeSet};

use crate::streammark::error::{PipelineError, PipelineResult};
use crate::streammark::model::{Event, Window, WindowResult};

/// What the aggregator did with one event, for per-run accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Counted into a window the watermark has not yet passed.
    Windowed,
    /// Counted into a window whose end is already behind the watermark.
    LateAdmitted,
    /// Dropped: beyond the lateness budget, or its window already fired.
    LateDropped,
}

/// Per-run window state for one experiment. Owns every open window and
/// the recently-fired set; nothing is shared across runs.
#[derive(Debug)]
pub struct KeyedWindowAggregator {
    window_width_ms: i64,
    allowed_lateness_ms: i64,
    /// Open windows: `(start, key) -> count`.
    windows: BTreeMap<(i64, String), u64>,
    /// `(end, key)` of fired windows still inside the lateness horizon.
    fired_recent: BTreeSet<(i64, String)>,
    events_counted: u64,
    late_events_dropped: u64,
}

impl KeyedWindowAggregator {
    pub fn new(window_width_ms: i64, allowed_lateness_ms: i64) -> Self {
        KeyedWindowAggregator {
            window_width_ms,
            allowed_lateness_ms,
            windows: BTreeMap::new(),
            fired_recent: BTreeSet::new(),
            events_counted: 0,
            late_events_dropped: 0,
        }
    }

    /// Route one event against the watermark in force when it arrived.
    pub fn on_event(&mut self, event: &Event, watermark: i64) -> EventDisposition {
        let start = Window::start_for(event.timestamp, self.window_width_ms);
        let end = start + self.window_width_ms;

        if let Some(count) = self.windows.get_mut(&(start, event.key.clone())) {
            *count += 1;
            self.events_counted += 1;
            return if end <= watermark {
                EventDisposition::LateAdmitted
            } else {
                EventDisposition::Windowed
            };
        }

        if end > watermark {
            self.windows.insert((start, event.key.clone()), 1);
            self.events_counted += 1;
            return EventDisposition::Windowed;
        }

        // The watermark already passed this window's end. The budget is
        // measured from the event's own timestamp.
        let within_budget =
            event.timestamp.saturating_add(self.allowed_lateness_ms) >= watermark;
        if within_budget && !self.fired_recent.contains(&(end, event.key.clone())) {
            self.windows.insert((start, event.key.clone()), 1);
            self.events_counted += 1;
            EventDisposition::LateAdmitted
        } else {
            self.late_events_dropped += 1;
            EventDisposition::LateDropped
        }
    }

    /// Fire every window whose end the watermark has reached or passed.
    /// Results come out ordered by `(start, key)`. Each window fires at
    /// most once per run; a repeat firing is a fatal state corruption.
    pub fn advance_to(&mut self, watermark: i64) -> PipelineResult<Vec<WindowResult>> {
        // Windows with start > watermark - width stay open.
        let fire_bound = watermark
            .saturating_sub(self.window_width_ms)
            .saturating_add(1);
        let kept = self.windows.split_off(&(fire_bound, String::new()));
        let fired = std::mem::replace(&mut self.windows, kept);

        let mut results = Vec::with_capacity(fired.len());
        for ((start, key), count) in fired {
            let end = start + self.window_width_ms;
            if !self.fired_recent.insert((end, key.clone())) {
                return Err(PipelineError::DuplicateFiring { key, start, end });
            }
            results.push(WindowResult {
                window: Window { key, start, end },
                count,
                lag: watermark.saturating_sub(end),
            });
        }

        // Fired windows the budget can no longer rescue are forgotten.
        let keep_from = watermark
            .saturating_sub(self.allowed_lateness_ms)
            .saturating_add(1);
        let retained = self.fired_recent.split_off(&(keep_from, String::new()));
        self.fired_recent = retained;

        Ok(results)
    }

    pub fn open_windows(&self) -> usize {
        self.windows.len()
    }

    pub fn events_counted(&self) -> u64 {
        self.events_counted
    }

    pub fn late_events_dropped(&self) -> u64 {
        self.late_events_dropped
    }
}
