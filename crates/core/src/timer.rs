//! Interval measurement over a monotonic nanosecond clock.
//!
//! The policy alternates a pair of timers between "mutator running" and
//! "collector running" spans. The clock is a trait so tests can drive
//! time by hand.

use std::sync::Arc;
use std::time::Instant;

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Convert a nanosecond count at the point where it is folded into a
/// seconds-based average.
pub fn nanos_to_seconds(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_SECOND as f64
}

/// Source of monotonic nanosecond timestamps.
pub trait NanoClock: Send + Sync {
    fn now_nanos(&self) -> u64;
}

/// Production clock: nanoseconds since the clock was created.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl NanoClock for MonotonicClock {
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Accumulating open/close span timer.
///
/// `close` while open adds the elapsed span to the accumulator and leaves
/// the timer closed; `open` (re)starts a span; `reset` zeroes only the
/// accumulator. A close/read/open sequence reads the running total without
/// losing the measurement.
pub struct IntervalTimer {
    clock: Arc<dyn NanoClock>,
    total_nanos: u64,
    opened_at: Option<u64>,
}

impl IntervalTimer {
    pub fn new(clock: Arc<dyn NanoClock>) -> Self {
        Self {
            clock,
            total_nanos: 0,
            opened_at: None,
        }
    }

    pub fn open(&mut self) {
        self.opened_at = Some(self.clock.now_nanos());
    }

    pub fn close(&mut self) {
        if let Some(opened_at) = self.opened_at.take() {
            let now = self.clock.now_nanos();
            self.total_nanos = self
                .total_nanos
                .saturating_add(now.saturating_sub(opened_at));
        }
    }

    pub fn reset(&mut self) {
        self.total_nanos = 0;
    }

    /// Accumulated nanoseconds over all closed spans since the last reset.
    pub fn measured_nanos(&self) -> u64 {
        self.total_nanos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ManualClock;

    #[test]
    fn closed_span_accumulates() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = IntervalTimer::new(clock.clone());
        timer.open();
        clock.advance(1_500);
        timer.close();
        assert_eq!(timer.measured_nanos(), 1_500);
    }

    #[test]
    fn close_while_closed_is_noop() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = IntervalTimer::new(clock.clone());
        timer.close();
        assert_eq!(timer.measured_nanos(), 0);
        timer.open();
        clock.advance(10);
        timer.close();
        clock.advance(10);
        timer.close();
        assert_eq!(timer.measured_nanos(), 10);
    }

    #[test]
    fn close_reopen_keeps_running_total() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = IntervalTimer::new(clock.clone());
        timer.open();
        clock.advance(100);
        // Mid-measurement read.
        timer.close();
        assert_eq!(timer.measured_nanos(), 100);
        timer.open();
        clock.advance(50);
        timer.close();
        assert_eq!(timer.measured_nanos(), 150);
    }

    #[test]
    fn reset_zeroes_only_the_accumulator() {
        let clock = Arc::new(ManualClock::new());
        let mut timer = IntervalTimer::new(clock.clone());
        timer.open();
        clock.advance(100);
        timer.close();
        timer.reset();
        assert_eq!(timer.measured_nanos(), 0);
        timer.open();
        clock.advance(25);
        timer.close();
        assert_eq!(timer.measured_nanos(), 25);
    }

    #[test]
    fn nanos_to_seconds_conversion() {
        assert_eq!(nanos_to_seconds(NANOS_PER_SECOND), 1.0);
        assert_eq!(nanos_to_seconds(10_000_000), 0.01);
    }
}
