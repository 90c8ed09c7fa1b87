//! Exponential backoff for throttled API calls

use crate::error::{CloudError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(32);

/// Retry policy for remote calls
///
/// Only throttling failures ([`CloudError::is_rate_limited`]) are retried.
/// Everything else is handed back to the caller on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Ceiling for the doubled delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
        }
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Run `op` until it succeeds, fails with a non-throttling error, runs out
    /// of attempts, or `cancel` fires during a backoff wait.
    pub async fn retry<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_rate_limited() {
                return Err(err);
            }
            if attempt >= max_attempts {
                return Err(CloudError::RetriesExhausted {
                    retries: max_attempts,
                    source: Box::new(err),
                });
            }

            let delay = backoff + jitter(backoff);
            tracing::debug!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "rate limited, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CloudError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            backoff = backoff.saturating_mul(2).min(self.max_backoff);
        }
    }
}

/// Uniform jitter in `[0, backoff / 4)`
fn jitter(backoff: Duration) -> Duration {
    let quarter = u64::try_from((backoff / 4).as_nanos()).unwrap_or(u64::MAX);
    if quarter == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(0..quarter))
}
