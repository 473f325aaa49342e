//! Local monotonic time source

use std::fmt::Debug;

use tokio::time::Instant;

/// Source of local monotonic time in microseconds.
///
/// Probes are timestamped with this clock and the audio pipeline schedules
/// against it, so both sides must share one instance.
pub trait MonotonicClock: Send + Sync + Debug {
    /// Current local time in microseconds. Never decreases.
    fn now_micros(&self) -> i64;
}

/// Monotonic clock starting from when it was created.
///
/// Reads tokio's clock, so it advances with virtual time when the runtime's
/// clock is paused.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Create a new clock starting now
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the start instant (for computing deltas)
    #[must_use]
    pub fn start(&self) -> Instant {
        self.start
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    #[inline]
    fn now_micros(&self) -> i64 {
        i64::try_from(self.start.elapsed().as_micros()).unwrap_or(i64::MAX)
    }
}
