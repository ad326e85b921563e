//! Bounded retry with exponential backoff.
//!
//! [`with_backoff`] knows nothing about HTTP: it drives an attempt closure
//! that reports success as a `bool`, sleeping through a [`Sleeper`] between
//! attempts so tests can observe delays without waiting for them.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Attempt budget and base delay for exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further failure.
    pub base_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait after the zero-indexed `attempt` failed: `base * 2^attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Source of delays between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Outcome of a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptReport {
    pub succeeded: bool,
    /// Attempts actually made (1 = first try succeeded).
    pub attempts: u32,
}

/// Run `attempt_fn` until it reports success or the policy's attempts run out.
///
/// The closure receives the zero-indexed attempt number. There is no delay
/// before the first attempt and none after the last; a failed attempt `i`
/// is followed by a delay of [`BackoffPolicy::delay_after`]`(i)`.
pub async fn with_backoff<F, Fut>(
    policy: &BackoffPolicy,
    sleeper: &dyn Sleeper,
    mut attempt_fn: F,
) -> AttemptReport
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 0..policy.max_attempts {
        if attempt_fn(attempt).await {
            return AttemptReport {
                succeeded: true,
                attempts: attempt + 1,
            };
        }
        if attempt + 1 < policy.max_attempts {
            sleeper.sleep(policy.delay_after(attempt)).await;
        }
    }

    AttemptReport {
        succeeded: false,
        attempts: policy.max_attempts,
    }
}
