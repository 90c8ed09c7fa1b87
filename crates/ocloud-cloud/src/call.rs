//! Per-invocation call context

use crate::error::{CloudError, Result};
use crate::rate_gate::RateGate;
use crate::retry::RetryPolicy;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Everything a remote call needs: cancellation, the shared rate gate and
/// the retry policy.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub cancel: CancellationToken,
    pub gate: RateGate,
    pub retry: RetryPolicy,
}

impl CallContext {
    pub fn new(cancel: CancellationToken, gate: RateGate, retry: RetryPolicy) -> Self {
        Self {
            cancel,
            gate,
            retry,
        }
    }

    /// Run one remote call behind the rate gate, retrying on throttling.
    ///
    /// Every attempt waits for a gate token and races the call itself
    /// against cancellation.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry
            .retry(&self.cancel, || {
                let attempt = op();
                async move {
                    self.gate.acquire(&self.cancel).await?;
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => Err(CloudError::Cancelled),
                        result = attempt => result,
                    }
                }
            })
            .await
    }
}
