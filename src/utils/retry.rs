//! Bounded retry policy for resilient operations
//!
//! The write stage wraps its store call in [`with_retry_if`] instead of an
//! inlined loop. The policy is a fixed number of attempts with a fixed (or
//! multiplied) delay between them.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub delay: Duration,

    /// Multiplier applied to the delay for each further attempt (1.0 = fixed)
    pub backoff_multiplier: f64,

    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Fixed-delay policy
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            ..Default::default()
        }
    }

    /// Multiplying-delay policy
    pub fn with_backoff(max_attempts: u32, delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff_multiplier: multiplier,
            max_delay,
        }
    }

    /// Delay to wait before the given attempt (1-based)
    fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let scaled = self.delay.as_secs_f64() * self.backoff_multiplier.powi((attempt - 2) as i32);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

/// Why a retried operation ultimately failed
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last: E },

    /// An attempt failed with an error the predicate refused to retry
    Fatal(E),
}

/// Execute an operation with a bounded retry policy
///
/// `should_retry` decides per error whether another attempt is allowed.
/// Attempts stop at `policy.max_attempts` (a zero policy still runs once).
pub async fn with_retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation: F,
    should_retry: P,
) -> Result<T, RetryFailure<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    warn!(error = %e, "Non-retryable error encountered");
                    return Err(RetryFailure::Fatal(e));
                }

                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %e,
                    "Operation failed"
                );

                if attempt >= max_attempts {
                    return Err(RetryFailure::Exhausted { attempts: attempt, last: e });
                }
                attempt += 1;
            }
        }
    }
}
