//! Fixed-interval timer for reflection cubemap refreshes.

use std::time::{Duration, Instant};

/// Shortest interval a timer will run at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Fires once per interval, independent of the frame loop.
///
/// The first firing happens one full interval after start. Intervals shorter
/// than [`MIN_INTERVAL`] are raised to it.
#[derive(Clone, Debug)]
pub struct RefreshTimer {
    interval: Duration,
    next_due: Instant,
}

impl RefreshTimer {
    /// Start a timer at `now`.
    pub fn new(interval: Duration, now: Instant) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        Self {
            interval,
            next_due: now + interval,
        }
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` at most once per elapsed interval.
    ///
    /// Missed ticks are not replayed: after a long stall the timer fires once
    /// and rearms relative to `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }
}
