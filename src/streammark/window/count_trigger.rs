//! Count-triggered diagnostic counter.
//!
//! Fires after a fixed number of elements regardless of watermark
//! progress, reporting the batch count and the event-time span it
//! covered. Useful for eyeballing throughput and input skew; it plays no
//! part in the lag experiment.

use chrono::DateTime;
use serde::Serialize;

use crate::streammark::model::Event;

/// Render an epoch-millis event time as a UTC wall-clock string.
/// Timestamps outside chrono's representable range fall back to the raw
/// millisecond value.
pub fn format_event_time(timestamp_ms: i64) -> String {
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// One fired count batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountWindowSummary {
    pub first_timestamp: i64,
    pub last_timestamp: i64,
    pub count: u64,
}

impl CountWindowSummary {
    pub const CSV_HEADER: &'static str = "count,first_event_time,last_event_time";

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{}",
            self.count,
            format_event_time(self.first_timestamp),
            format_event_time(self.last_timestamp)
        )
    }
}

/// Buffers elements until `trigger` of them have arrived, then emits a
/// [`CountWindowSummary`] and starts the next batch.
#[derive(Debug)]
pub struct CountTriggeredCounter {
    trigger: u64,
    count: u64,
    first_timestamp: i64,
    last_timestamp: i64,
}

impl CountTriggeredCounter {
    pub fn new(trigger: u64) -> Self {
        CountTriggeredCounter {
            trigger: trigger.max(1),
            count: 0,
            first_timestamp: 0,
            last_timestamp: 0,
        }
    }

    /// Absorb one event; returns a summary when the batch fills.
    pub fn on_event(&mut self, event: &Event) -> Option<CountWindowSummary> {
        if self.count == 0 {
            self.first_timestamp = event.timestamp;
        }
        self.last_timestamp = event.timestamp;
        self.count += 1;

        if self.count >= self.trigger {
            self.take_batch()
        } else {
            None
        }
    }

    /// Emit the trailing partial batch at end of input, if any.
    pub fn flush(&mut self) -> Option<CountWindowSummary> {
        self.take_batch()
    }

    fn take_batch(&mut self) -> Option<CountWindowSummary> {
        if self.count == 0 {
            return None;
        }
        let summary = CountWindowSummary {
            first_timestamp: self.first_timestamp,
            last_timestamp: self.last_timestamp,
            count: self.count,
        };
        self.count = 0;
        Some(summary)
    }
}
