//! Bounded-Out-of-Order Watermark Generation
//!
//! The periodic strategy models a fixed assumption about stream disorder:
//! the watermark trails the largest timestamp seen so far by a static bound.
//! The runner polls [`BoundedOutOfOrderGenerator::current_watermark`] on a
//! fixed processing-time interval, so the externally visible watermark only
//! moves at poll points even though the maximum advances on every event.

use crate::streammark::model::Event;
use crate::streammark::watermark::{WatermarkGenerator, WATERMARK_MIN};

/// Periodic watermark strategy: `watermark = max_timestamp - bound`.
#[derive(Debug)]
pub struct BoundedOutOfOrderGenerator {
    /// Static out-of-orderness tolerance in milliseconds.
    max_out_of_orderness_ms: i64,
    /// Largest event timestamp observed so far; None before the first event.
    max_timestamp: Option<i64>,
}

impl BoundedOutOfOrderGenerator {
    pub fn new(max_out_of_orderness_ms: i64) -> Self {
        BoundedOutOfOrderGenerator {
            max_out_of_orderness_ms,
            max_timestamp: None,
        }
    }

    /// Largest event timestamp observed so far.
    pub fn max_timestamp(&self) -> Option<i64> {
        self.max_timestamp
    }
}

impl WatermarkGenerator for BoundedOutOfOrderGenerator {
    fn on_event(&mut self, event: &Event) {
        self.max_timestamp = Some(match self.max_timestamp {
            Some(max) => max.max(event.timestamp),
            None => event.timestamp,
        });
    }

    fn current_watermark(&self) -> i64 {
        match self.max_timestamp {
            Some(max) => max - self.max_out_of_orderness_ms,
            None => WATERMARK_MIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ts: i64) -> Event {
        Event::new("k", ts, 0.0)
    }

    #[test]
    fn test_no_watermark_before_first_event() {
        let generator = BoundedOutOfOrderGenerator::new(100);
        assert_eq!(generator.current_watermark(), WATERMARK_MIN);
    }

    #[test]
    fn test_watermark_trails_max_by_bound() {
        let mut generator = BoundedOutOfOrderGenerator::new(100);
        generator.on_event(&event(1000));
        assert_eq!(generator.current_watermark(), 900);

        generator.on_event(&event(2500));
        assert_eq!(generator.current_watermark(), 2400);
    }

    #[test]
    fn test_out_of_order_events_do_not_lower_watermark() {
        let mut generator = BoundedOutOfOrderGenerator::new(50);
        generator.on_event(&event(1000));
        let before = generator.current_watermark();

        // An older event must not pull the maximum (and thus the watermark)
        // backwards.
        generator.on_event(&event(400));
        assert_eq!(generator.current_watermark(), before);
    }

    #[test]
    fn test_monotone_over_arbitrary_sequence() {
        let mut generator = BoundedOutOfOrderGenerator::new(75);
        let mut last = generator.current_watermark();
        for ts in [500, 300, 800, 790, 1200, 100, 1300] {
            generator.on_event(&event(ts));
            let wm = generator.current_watermark();
            assert!(wm >= last, "watermark regressed: {} -> {}", last, wm);
            last = wm;
        }
        assert_eq!(last, 1300 - 75);
    }

    #[test]
    fn test_zero_bound_tracks_max_exactly() {
        let mut generator = BoundedOutOfOrderGenerator::new(0);
        generator.on_event(&event(150));
        assert_eq!(generator.current_watermark(), 150);
    }
}
