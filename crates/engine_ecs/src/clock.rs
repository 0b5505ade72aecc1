//! Wall-clock stopwatch used by entities, worlds and systems.

use std::time::{Duration, Instant};

/// A restartable stopwatch.
///
/// [`Clock::elapsed`] returns the time since the previous call (or since
/// creation / [`Clock::reset`]) and restarts the measurement.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    /// Start a new clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time since the previous call; restarts the clock.
    pub fn elapsed(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.start);
        self.start = now;
        elapsed
    }

    /// Time since the last restart, without restarting.
    #[must_use]
    pub fn peek(&self) -> Duration {
        self.start.elapsed()
    }

    /// Restart the measurement.
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Returns `true` once at least `min` has elapsed since the last restart.
    #[must_use]
    pub fn is_valid(&self, min: Duration) -> bool {
        self.peek() >= min
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
