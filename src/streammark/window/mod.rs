//! Windowed Aggregation
//!
//! Two disciplines share this module. The event-time path
//! ([`KeyedWindowAggregator`]) buckets events into fixed-width tumbling
//! windows per key and fires them when the watermark crosses a window's
//! end. The count-triggered path ([`CountTriggeredCounter`]) ignores
//! watermarks entirely and fires after a fixed number of elements; it
//! exists for throughput diagnostics, not for the lag experiment.

pub mod aggregator;
pub mod count_trigger;

pub use aggregator::{EventDisposition, KeyedWindowAggregator};
pub use count_trigger::{format_event_time, CountTriggeredCounter, CountWindowSummary};
