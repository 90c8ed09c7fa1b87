//! Load balancer adapter
//!
//! Composition root of the enrichment engine: pages through List, hands every
//! item to the [`EnrichmentOrchestrator`] on the [`WorkerPool`] and collects
//! the results in List order. One adapter is meant to live for one command
//! invocation; its caches never expire.

use crate::enrich::{EnrichmentOptions, EnrichmentOrchestrator};
use crate::error::Result;
use crate::model::LoadBalancer;
use crate::pool::{Job, WorkerPool};
use crate::provider::CloudClients;
use crate::rate_gate::RateGate;
use crate::records::LoadBalancerRecord;
use crate::retry::RetryPolicy;
use futures_util::FutureExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Tunables for an [`Adapter`]
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub workers: usize,
    pub gate: RateGate,
    pub retry: RetryPolicy,
    pub enrichment: EnrichmentOptions,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            workers: crate::pool::DEFAULT_WORKER_COUNT,
            gate: RateGate::default(),
            retry: RetryPolicy::default(),
            enrichment: EnrichmentOptions::default(),
        }
    }
}

/// How much work to spend per listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Basic,
    Enriched,
}

pub struct Adapter {
    orchestrator: EnrichmentOrchestrator,
}

impl Adapter {
    pub fn new(clients: CloudClients, config: AdapterConfig) -> Self {
        let orchestrator = EnrichmentOrchestrator::new(
            clients,
            config.gate,
            config.retry,
            WorkerPool::new(config.workers),
            config.enrichment,
        );
        Self { orchestrator }
    }

    pub fn with_defaults(clients: CloudClients) -> Self {
        Self::new(clients, AdapterConfig::default())
    }

    /// Every load balancer in the compartment with backend set health and
    /// subnet names.
    pub async fn list_load_balancers(
        &self,
        cancel: &CancellationToken,
        compartment_id: &str,
    ) -> Result<Vec<LoadBalancer>> {
        self.list(cancel, compartment_id, Depth::Basic).await
    }

    /// Every load balancer in the compartment, fully enriched.
    pub async fn list_enriched_load_balancers(
        &self,
        cancel: &CancellationToken,
        compartment_id: &str,
    ) -> Result<Vec<LoadBalancer>> {
        self.list(cancel, compartment_id, Depth::Enriched).await
    }

    pub async fn get_load_balancer(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
    ) -> Result<LoadBalancer> {
        let record = self.fetch(cancel, load_balancer_id).await?;
        self.orchestrator.enrich_basic(cancel, record).await
    }

    pub async fn get_enriched_load_balancer(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
    ) -> Result<LoadBalancer> {
        let record = self.fetch(cancel, load_balancer_id).await?;
        self.orchestrator.enrich(cancel, record).await
    }

    async fn fetch(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
    ) -> Result<Arc<LoadBalancerRecord>> {
        let ctx = self.orchestrator.call_context(cancel);
        let lb_api = &self.orchestrator.clients().load_balancer;
        let record = ctx
            .call(|| lb_api.get_load_balancer(load_balancer_id))
            .await?;
        Ok(Arc::new(record))
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        compartment_id: &str,
        depth: Depth,
    ) -> Result<Vec<LoadBalancer>> {
        let started = Instant::now();
        let ctx = self.orchestrator.call_context(cancel);
        let lb_api = &self.orchestrator.clients().load_balancer;

        let mut result = Vec::new();
        let mut page: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let listed = ctx
                .call(|| lb_api.list_load_balancers(compartment_id, page.as_deref()))
                .await?;
            pages += 1;

            let records: Vec<Arc<LoadBalancerRecord>> =
                listed.items.into_iter().map(Arc::new).collect();
            result.extend(self.process_page(cancel, records, depth).await?);

            match listed.next_page {
                Some(next) if !next.is_empty() => page = Some(next),
                _ => break,
            }
        }

        tracing::debug!(
            compartment_id,
            pages,
            load_balancers = result.len(),
            enriched = depth == Depth::Enriched,
            duration_ms = started.elapsed().as_millis() as u64,
            "lb.list"
        );
        Ok(result)
    }

    async fn process_page(
        &self,
        cancel: &CancellationToken,
        records: Vec<Arc<LoadBalancerRecord>>,
        depth: Depth,
    ) -> Result<Vec<LoadBalancer>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        if depth == Depth::Enriched {
            self.orchestrator.prefetch(cancel, &records).await?;
        }

        let slots: Arc<Mutex<Vec<Option<LoadBalancer>>>> =
            Arc::new(Mutex::new(vec![None; records.len()]));
        let jobs: Vec<Job> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let orchestrator = self.orchestrator.clone();
                let slots = Arc::clone(&slots);
                let cancel = cancel.clone();
                async move {
                    let lb = match depth {
                        Depth::Basic => orchestrator.enrich_basic(&cancel, record).await?,
                        Depth::Enriched => orchestrator.enrich(&cancel, record).await?,
                    };
                    slots.lock().await[index] = Some(lb);
                    Ok(())
                }
                .boxed()
            })
            .collect();

        self.orchestrator.pool().run_all(cancel, jobs).await?;

        let mut slots = slots.lock().await;
        Ok(slots.drain(..).flatten().collect())
    }
}
