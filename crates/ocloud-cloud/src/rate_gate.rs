//! Shared token bucket in front of every outbound API call

use crate::error::{CloudError, Result};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sustained outbound rate (tokens per second)
pub const DEFAULT_RATE_PER_SEC: u32 = 10;

/// Bucket capacity
pub const DEFAULT_RATE_BURST: u32 = 5;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Throttles the aggregate call rate, however many workers are asking.
///
/// Cloning is cheap and every clone draws from the same bucket.
#[derive(Clone)]
pub struct RateGate {
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl RateGate {
    pub fn new(rate_per_sec: u32, burst: u32) -> Result<Self> {
        let rate = NonZeroU32::new(rate_per_sec).ok_or_else(|| {
            CloudError::InvalidConfig("rate_per_sec must be greater than zero".to_string())
        })?;
        let burst = NonZeroU32::new(burst).ok_or_else(|| {
            CloudError::InvalidConfig("burst must be greater than zero".to_string())
        })?;

        let quota = Quota::per_second(rate).allow_burst(burst);
        Ok(Self {
            limiter: Some(Arc::new(RateLimiter::direct(quota))),
        })
    }

    /// A gate that never waits
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait for a token, or return [`CloudError::Cancelled`] once `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(CloudError::Cancelled);
        }
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        if limiter.check().is_ok() {
            return Ok(());
        }

        tracing::trace!("rate gate saturated, waiting for a token");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CloudError::Cancelled),
            _ = limiter.until_ready() => Ok(()),
        }
    }
}

impl Default for RateGate {
    fn default() -> Self {
        // The defaults are non-zero, so construction cannot fail.
        let rate = NonZeroU32::new(DEFAULT_RATE_PER_SEC).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(DEFAULT_RATE_BURST).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Some(Arc::new(RateLimiter::direct(
                Quota::per_second(rate).allow_burst(burst),
            ))),
        }
    }
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("limited", &self.is_limited())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_rejects_zero_rate() {
        assert!(matches!(
            RateGate::new(0, 5),
            Err(CloudError::InvalidConfig(_))
        ));
        assert!(matches!(
            RateGate::new(10, 0),
            Err(CloudError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_burst_is_immediate() {
        let gate = RateGate::new(1, 5).unwrap();
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..5 {
            gate.acquire(&cancel).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_waits_once_bucket_is_empty() {
        let gate = RateGate::new(20, 1).unwrap();
        let cancel = CancellationToken::new();

        gate.acquire(&cancel).await.unwrap();
        let start = Instant::now();
        gate.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_returns_promptly() {
        let gate = RateGate::new(1, 1).unwrap();
        let cancel = CancellationToken::new();
        gate.acquire(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(Duration::from_millis(500), gate.acquire(&cancel))
            .await
            .expect("acquire must observe cancellation");
        assert!(matches!(result, Err(CloudError::Cancelled)));
    }

    #[tokio::test]
    async fn test_unlimited_gate_still_observes_cancellation() {
        let gate = RateGate::unlimited();
        let cancel = CancellationToken::new();
        assert!(gate.acquire(&cancel).await.is_ok());

        cancel.cancel();
        assert!(matches!(
            gate.acquire(&cancel).await,
            Err(CloudError::Cancelled)
        ));
    }
}
