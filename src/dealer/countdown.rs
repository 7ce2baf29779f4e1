//! Round countdown and its polling cadence.

use std::time::{Duration, Instant};

/// Poll interval while the countdown is relaxed.
const COARSE_TICK: Duration = Duration::from_secs(1);
/// Poll interval inside the warning window, for a smooth display.
const FINE_TICK: Duration = Duration::from_millis(10);

/// Time left before the board is reshuffled.
#[derive(Debug, Clone)]
pub struct Countdown {
    timeout: Duration,
    warning: Duration,
    deadline: Instant,
}

impl Countdown {
    /// Start a countdown of `timeout` that turns urgent below `warning`.
    pub fn new(timeout: Duration, warning: Duration) -> Self {
        Self {
            timeout,
            warning,
            deadline: Instant::now() + timeout,
        }
    }

    /// Restart from the full timeout.
    pub fn reset(&mut self) {
        self.deadline = Instant::now() + self.timeout;
    }

    /// Full round length.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the round is over.
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Whether the warning threshold has been crossed.
    pub fn is_urgent(&self) -> bool {
        self.remaining() < self.warning
    }

    /// How long the dealer may block before updating the display again.
    pub fn poll_interval(&self) -> Duration {
        let tick = if self.is_urgent() { FINE_TICK } else { COARSE_TICK };
        tick.min(self.remaining())
    }
}
