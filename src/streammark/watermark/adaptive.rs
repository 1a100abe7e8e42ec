//! Adaptive Watermark Generation
//!
//! Instead of assuming a fixed disorder bound, this strategy maintains a
//! floating out-of-order estimate and advances the watermark eagerly on
//! every in-order event. The runner polls it after each event; no timer is
//! involved.
//!
//! Estimate dynamics, with `gain = sensitivity * sensitivity_change_rate`:
//! an event arriving behind the watermark whose disorder overshoots the
//! current estimate by more than `ooo_threshold` pulls the estimate toward
//! the observed disorder at rate `gain`; a sustained run of in-order
//! arrivals decays the estimate by `1 - gain`. High gain tracks disorder
//! aggressively (low lag, more late drops); low gain is conservative
//! (higher lag, fewer drops).
//!
//! The published watermark is a high-water mark: it only ever advances.

use crate::streammark::model::Event;
use crate::streammark::watermark::{WatermarkGenerator, WATERMARK_MIN};

/// Consecutive in-order arrivals required before the estimate shrinks.
const IN_ORDER_SHRINK_STREAK: u32 = 8;

/// Per-event adaptive watermark strategy.
#[derive(Debug)]
pub struct AdaptiveWatermarkGenerator {
    /// Disorder overshoot (ms) tolerated before the estimate grows.
    ooo_threshold: f64,
    /// Adjustment rate, `sensitivity * sensitivity_change_rate`, in (0, 1].
    gain: f64,
    /// Current out-of-orderness allowance in milliseconds.
    ooo_estimate_ms: f64,
    /// Last published watermark.
    watermark: i64,
    in_order_streak: u32,
}

impl AdaptiveWatermarkGenerator {
    /// Create a generator seeded with `initial_allowance_ms` (the run's
    /// allowed-lateness setting) as its starting out-of-order estimate.
    pub fn new(
        initial_allowance_ms: i64,
        ooo_threshold: f64,
        sensitivity: f64,
        sensitivity_change_rate: f64,
    ) -> Self {
        AdaptiveWatermarkGenerator {
            ooo_threshold,
            gain: sensitivity * sensitivity_change_rate,
            ooo_estimate_ms: initial_allowance_ms as f64,
            watermark: WATERMARK_MIN,
            in_order_streak: 0,
        }
    }

    /// Current out-of-orderness allowance in milliseconds.
    pub fn ooo_estimate_ms(&self) -> f64 {
        self.ooo_estimate_ms
    }
}

impl WatermarkGenerator for AdaptiveWatermarkGenerator {
    fn on_event(&mut self, event: &Event) {
        let t = event.timestamp;
        if t < self.watermark {
            // Event behind the watermark: measure the disorder and grow the
            // estimate when it overshoots beyond the threshold.
            let disorder = (self.watermark - t) as f64;
            if disorder - self.ooo_estimate_ms > self.ooo_threshold {
                self.ooo_estimate_ms += self.gain * (disorder - self.ooo_estimate_ms);
            }
            self.in_order_streak = 0;
        } else {
            self.in_order_streak += 1;
            if self.in_order_streak >= IN_ORDER_SHRINK_STREAK {
                self.ooo_estimate_ms = (self.ooo_estimate_ms * (1.0 - self.gain)).max(0.0);
                self.in_order_streak = 0;
            }
            let candidate = t - self.ooo_estimate_ms.round() as i64;
            if candidate > self.watermark {
                self.watermark = candidate;
            }
        }
    }

    fn current_watermark(&self) -> i64 {
        self.watermark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ts: i64) -> Event {
        Event::new("k", ts, 0.0)
    }

    #[test]
    fn test_starts_unpublished_then_seeds_from_allowance() {
        let mut generator = AdaptiveWatermarkGenerator::new(100, 1.0, 1.0, 0.1);
        assert_eq!(generator.current_watermark(), WATERMARK_MIN);

        generator.on_event(&event(1000));
        assert_eq!(generator.current_watermark(), 900);
        assert_eq!(generator.ooo_estimate_ms(), 100.0);
    }

    #[test]
    fn test_estimate_grows_on_disorder_overshoot() {
        // Full gain: the estimate jumps to the observed disorder.
        let mut generator = AdaptiveWatermarkGenerator::new(0, 10.0, 1.0, 1.0);
        generator.on_event(&event(1000));
        assert_eq!(generator.current_watermark(), 1000);

        generator.on_event(&event(900));
        assert_eq!(generator.ooo_estimate_ms(), 100.0);
        // The watermark itself never moves backwards.
        assert_eq!(generator.current_watermark(), 1000);
    }

    #[test]
    fn test_partial_gain_moves_estimate_fractionally() {
        let mut generator = AdaptiveWatermarkGenerator::new(0, 10.0, 1.0, 0.1);
        generator.on_event(&event(1000));
        generator.on_event(&event(900)); // disorder 100, estimate += 0.1 * 100
        assert_eq!(generator.ooo_estimate_ms(), 10.0);

        generator.on_event(&event(1100));
        assert_eq!(generator.current_watermark(), 1090);
    }

    #[test]
    fn test_small_overshoot_within_threshold_is_ignored() {
        let mut generator = AdaptiveWatermarkGenerator::new(0, 50.0, 1.0, 1.0);
        generator.on_event(&event(1000));
        // Disorder 40 does not exceed the 50ms threshold.
        generator.on_event(&event(960));
        assert_eq!(generator.ooo_estimate_ms(), 0.0);
    }

    #[test]
    fn test_sustained_in_order_arrivals_shrink_estimate() {
        let mut generator = AdaptiveWatermarkGenerator::new(0, 10.0, 1.0, 1.0);
        generator.on_event(&event(1000)); // streak 1, watermark 1000
        generator.on_event(&event(900)); // estimate -> 100, streak reset

        // Seven in-order events keep the streak below the shrink point.
        for ts in 1001..=1007 {
            generator.on_event(&event(ts));
        }
        assert_eq!(generator.ooo_estimate_ms(), 100.0);
        assert_eq!(generator.current_watermark(), 1000);

        // The eighth decays the estimate (full gain: to zero) and the
        // watermark catches up to the event time.
        generator.on_event(&event(1008));
        assert_eq!(generator.ooo_estimate_ms(), 0.0);
        assert_eq!(generator.current_watermark(), 1008);
    }

    #[test]
    fn test_watermark_monotone_under_shuffled_input() {
        let mut generator = AdaptiveWatermarkGenerator::new(50, 1.0, 1.0, 0.5);
        let mut last = generator.current_watermark();
        for ts in [100, 700, 250, 900, 450, 910, 920, 930, 80, 1500] {
            generator.on_event(&event(ts));
            let wm = generator.current_watermark();
            assert!(wm >= last, "watermark regressed: {} -> {}", last, wm);
            last = wm;
        }
    }
}
