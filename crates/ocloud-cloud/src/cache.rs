//! Lookup caches shared by every load balancer enriched in one invocation

use crate::call::CallContext;
use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;

/// Read-mostly cache keyed by remote resource ID.
///
/// A stored `None` records a lookup that failed earlier in this run, so a
/// consistently failing ID is not fetched again. Concurrent misses for the same
/// cold ID may both fetch; the later write wins.
#[derive(Debug)]
pub struct ResolutionCache<T> {
    kind: &'static str,
    entries: RwLock<HashMap<String, Option<T>>>,
    cache_failures: bool,
}

impl<T> ResolutionCache<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
            cache_failures: true,
        }
    }

    /// Whether failed lookups are remembered for the rest of the run
    pub fn with_failure_caching(mut self, enabled: bool) -> Self {
        self.cache_failures = enabled;
        self
    }

    pub async fn get(&self, id: &str) -> Option<Option<T>> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn insert(&self, id: impl Into<String>, value: Option<T>) {
        self.entries.write().await.insert(id.into(), value);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Return the cached value for `id`, or fetch it through the rate gate
    /// and retry policy and remember the outcome.
    ///
    /// `Ok((value, from_cache))` on a hit or a successful fetch; a cached
    /// failure comes back as `Ok((None, true))`. A fresh failure is returned
    /// as `Err` after it has been cached. Cancellation is never cached.
    pub async fn fetch_or_resolve<F, Fut>(
        &self,
        ctx: &CallContext,
        id: &str,
        fetch: F,
    ) -> Result<(Option<T>, bool)>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get(id).await {
            return Ok((hit, true));
        }

        match ctx.call(|| fetch(id.to_string())).await {
            Ok(value) => {
                self.insert(id, Some(value.clone())).await;
                Ok((Some(value), false))
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                tracing::debug!(cache = self.kind, id, error = %err, "lookup failed");
                if self.cache_failures {
                    self.insert(id, None).await;
                }
                Err(err)
            }
        }
    }
}
