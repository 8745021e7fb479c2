//! Fixed-threshold call pacing
//!
//! Every data request goes through [`RateLimiter::acquire`]. Once the
//! counter reaches the threshold the caller is held for the pause duration
//! and the counter starts again from zero. There is no jitter and no
//! adaptive backoff.

use std::time::Duration;
use tracing::info;

/// Threshold and pause length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// Calls allowed before pausing
    pub threshold: u32,

    /// How long to hold the caller once the threshold is reached
    pub pause: Duration,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            threshold: 10,
            pause: Duration::from_secs(60),
        }
    }
}

impl RatePolicy {
    pub fn new(threshold: u32, pause: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            pause,
        }
    }
}

/// Per-run call counter
#[derive(Debug)]
pub struct RateLimiter {
    policy: RatePolicy,

    /// Calls since the last pause
    counter: u32,

    /// Calls over the whole run
    total: u32,

    /// Pauses taken so far
    pauses: u32,
}

impl RateLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            counter: 0,
            total: 0,
            pauses: 0,
        }
    }

    /// Count one call, pausing first if the previous calls filled the window
    ///
    /// The first `threshold` calls return immediately; call `threshold + 1`
    /// waits for the pause and leaves the counter at 1 (itself).
    pub async fn acquire(&mut self) {
        if self.counter >= self.policy.threshold {
            info!(
                calls = self.counter,
                pause_secs = self.policy.pause.as_secs(),
                "Call threshold reached, pausing"
            );
            tokio::time::sleep(self.policy.pause).await;
            self.counter = 0;
            self.pauses += 1;
        }

        self.counter += 1;
        self.total += 1;
    }

    /// Calls since the last pause
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Calls over the whole run
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn pauses(&self) -> u32 {
        self.pauses
    }
}
