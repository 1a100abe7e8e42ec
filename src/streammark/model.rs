//! Core Event and Window Types
//!
//! The typed records flowing through a pipeline run. Events are immutable
//! once produced; windows are fixed-width, contiguous, and non-overlapping
//! per key; a [`WindowResult`] is the experiment's primary output row.
//!
//! Timestamps are milliseconds since the Unix epoch throughout. Window
//! assignment uses floor division, so negative timestamps land in the
//! window that actually contains them.

use serde::Serialize;
use std::fmt;

/// A single keyed, timestamped event.
///
/// Ordering is not guaranteed across keys, and not within a key either;
/// tolerating that disorder is exactly what the watermark strategies under
/// test are for.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Partitioning key.
    pub key: String,
    /// Event time in epoch milliseconds.
    pub timestamp: i64,
    /// Observed measurement carried by the event.
    pub value: f64,
}

impl Event {
    pub fn new(key: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Event {
            key: key.into(),
            timestamp,
            value,
        }
    }
}

/// A fixed-width event-time window for one key: `[start, end)` with
/// `end = start + width`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Window {
    pub key: String,
    /// Inclusive lower bound, epoch milliseconds.
    pub start: i64,
    /// Exclusive upper bound, epoch milliseconds.
    pub end: i64,
}

impl Window {
    /// The window containing `timestamp` for `key`, given a window width.
    ///
    /// `start = floor(timestamp / width) * width`; `div_euclid` keeps the
    /// floor semantics when timestamps are negative.
    pub fn for_timestamp(key: impl Into<String>, timestamp: i64, width: i64) -> Self {
        let start = timestamp.div_euclid(width) * width;
        Window {
            key: key.into(),
            start,
            end: start + width,
        }
    }

    /// The window containing `event`, given a window width.
    pub fn for_event(event: &Event, width: i64) -> Self {
        Self::for_timestamp(event.key.clone(), event.timestamp, width)
    }

    /// Start of the window containing `timestamp` (key-independent).
    pub fn start_for(timestamp: i64, width: i64) -> i64 {
        timestamp.div_euclid(width) * width
    }

    /// Whether `timestamp` falls inside `[start, end)`.
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})@{}", self.start, self.end, self.key)
    }
}

/// Result of one fired window: its element count and the watermark lag at
/// firing time.
///
/// `lag = watermark_at_firing - window.end`, never negative for on-time
/// firing. A large lag means the watermark overshot the boundary, i.e. the
/// strategy was conservative; a near-zero lag together with dropped late
/// events means it was aggressive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowResult {
    pub window: Window,
    pub count: u64,
    pub lag: i64,
}

impl WindowResult {
    /// CSV header matching [`WindowResult::to_csv_row`].
    pub const CSV_HEADER: &'static str = "key,window_start,window_end,count,lag";

    /// Render as one CSV output row.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.window.key, self.window.start, self.window.end, self.count, self.lag
        )
    }
}
