//! Enrichment orchestration for a single load balancer
//!
//! One base-mapped [`LoadBalancer`] fans out into independent sub-tasks:
//!
//! ```text
//!                ┌─ subnets + VCN ──────────────┐
//!                ├─ NSGs ───────────────────────┤
//! base mapping ──┼─ backend health ─► members ──┼──► merged LoadBalancer
//!                └─ certificates ───────────────┘
//! ```
//!
//! Sub-tasks run as jobs on the [`WorkerPool`], share the call budget of the
//! [`RateGate`] and the per-kind lookup caches, and write disjoint fields of
//! the result under one merge lock. Only the members step depends on another
//! step: it needs each set's aggregate health to decide what to probe.

use crate::cache::ResolutionCache;
use crate::call::CallContext;
use crate::certificate;
use crate::error::{CloudError, Result};
use crate::model::{Backend, BackendSet, BackendStatus, LoadBalancer};
use crate::pool::{Job, WorkerPool};
use crate::provider::CloudClients;
use crate::rate_gate::RateGate;
use crate::records::{
    CertificateRecord, LoadBalancerRecord, ManagedCertificateRecord, NetworkSecurityGroupRecord,
    SubnetRecord, VcnRecord,
};
use crate::retry::RetryPolicy;
use futures_util::FutureExt;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// What happens when an enrichment lookup fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrichmentPolicy {
    /// Log the failure and keep the raw value
    #[default]
    BestEffort,
    /// Fail the whole load balancer on the first failed lookup
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentOptions {
    pub policy: EnrichmentPolicy,

    /// Probe every backend, not only those of degraded backend sets
    pub deep: bool,

    /// Remember failed lookups for the rest of the run
    pub cache_failures: bool,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            policy: EnrichmentPolicy::BestEffort,
            deep: false,
            cache_failures: true,
        }
    }
}

/// Lookup caches, one per resource kind
struct Caches {
    subnets: ResolutionCache<SubnetRecord>,
    vcns: ResolutionCache<VcnRecord>,
    nsgs: ResolutionCache<NetworkSecurityGroupRecord>,
    /// Keyed by load balancer ID
    certificate_lists: ResolutionCache<Vec<CertificateRecord>>,
    managed_certificates: ResolutionCache<ManagedCertificateRecord>,
}

impl Caches {
    fn new(cache_failures: bool) -> Self {
        Self {
            subnets: ResolutionCache::new("subnet").with_failure_caching(cache_failures),
            vcns: ResolutionCache::new("vcn").with_failure_caching(cache_failures),
            nsgs: ResolutionCache::new("nsg").with_failure_caching(cache_failures),
            certificate_lists: ResolutionCache::new("certificate_list")
                .with_failure_caching(cache_failures),
            managed_certificates: ResolutionCache::new("managed_certificate")
                .with_failure_caching(cache_failures),
        }
    }
}

struct Inner {
    clients: CloudClients,
    gate: RateGate,
    retry: RetryPolicy,
    pool: WorkerPool,
    options: EnrichmentOptions,
    caches: Caches,
}

/// The load balancer being enriched, plus what every sub-task needs to reach it
#[derive(Clone)]
struct Target {
    ctx: CallContext,
    record: Arc<LoadBalancerRecord>,
    lb_id: Arc<str>,
    merged: Arc<Mutex<LoadBalancer>>,
}

impl Target {
    async fn finish(self) -> LoadBalancer {
        let Target { merged, .. } = self;
        match Arc::try_unwrap(merged) {
            Ok(lb) => lb.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        }
    }
}

/// Turns List/Get records into fully described load balancers.
///
/// Cheap to clone; clones share the caches, the gate and the pool settings.
#[derive(Clone)]
pub struct EnrichmentOrchestrator {
    inner: Arc<Inner>,
}

impl EnrichmentOrchestrator {
    pub fn new(
        clients: CloudClients,
        gate: RateGate,
        retry: RetryPolicy,
        pool: WorkerPool,
        options: EnrichmentOptions,
    ) -> Self {
        // A cached failure carries no error, so strict runs must refetch to report it.
        let cache_failures =
            options.cache_failures && options.policy == EnrichmentPolicy::BestEffort;
        Self {
            inner: Arc::new(Inner {
                clients,
                gate,
                retry,
                pool,
                options,
                caches: Caches::new(cache_failures),
            }),
        }
    }

    pub fn pool(&self) -> WorkerPool {
        self.inner.pool
    }

    pub(crate) fn call_context(&self, cancel: &CancellationToken) -> CallContext {
        self.inner.call_context(cancel)
    }

    pub(crate) fn clients(&self) -> &CloudClients {
        &self.inner.clients
    }

    fn target(&self, cancel: &CancellationToken, record: Arc<LoadBalancerRecord>) -> Target {
        Target {
            ctx: self.inner.call_context(cancel),
            lb_id: Arc::from(record.id.as_deref().unwrap_or_default()),
            merged: Arc::new(Mutex::new(LoadBalancer::from(record.as_ref()))),
            record,
        }
    }

    /// Full enrichment: subnets, VCN, NSGs, backend health and membership,
    /// certificates.
    pub async fn enrich(
        &self,
        cancel: &CancellationToken,
        record: Arc<LoadBalancerRecord>,
    ) -> Result<LoadBalancer> {
        let started = Instant::now();
        let target = self.target(cancel, record);
        tracing::debug!(
            lb_id = %target.lb_id,
            lb_name = target.record.display_name.as_deref().unwrap_or_default(),
            "lb.enrich.start"
        );

        let jobs: Vec<Job> = vec![
            {
                let (inner, t) = (Arc::clone(&self.inner), target.clone());
                async move { inner.resolve_subnets(&t).await }.boxed()
            },
            {
                let (inner, t) = (Arc::clone(&self.inner), target.clone());
                async move { inner.resolve_nsgs(&t).await }.boxed()
            },
            {
                let (inner, t) = (Arc::clone(&self.inner), target.clone());
                async move {
                    inner.backend_health(&t).await?;
                    inner.backend_members(&t).await
                }
                .boxed()
            },
            {
                let (inner, t) = (Arc::clone(&self.inner), target.clone());
                async move { inner.certificates(&t).await }.boxed()
            },
        ];

        self.inner.pool.run_all(cancel, jobs).await?;

        let lb_id = Arc::clone(&target.lb_id);
        let lb = target.finish().await;
        tracing::debug!(
            lb_id = %lb_id,
            lb_name = %lb.name,
            duration_ms = started.elapsed().as_millis() as u64,
            "lb.enrich.summary"
        );
        Ok(lb)
    }

    /// Light enrichment for listings: backend set health and subnet names only.
    pub async fn enrich_basic(
        &self,
        cancel: &CancellationToken,
        record: Arc<LoadBalancerRecord>,
    ) -> Result<LoadBalancer> {
        let target = self.target(cancel, record);
        tokio::try_join!(
            self.inner.backend_health(&target),
            self.inner.resolve_subnets(&target)
        )?;
        Ok(target.finish().await)
    }

    /// Warm the subnet, VCN and NSG caches for every ID on a page.
    ///
    /// Lookup failures are left for the per-item pass to report; only
    /// cancellation aborts.
    pub async fn prefetch(
        &self,
        cancel: &CancellationToken,
        records: &[Arc<LoadBalancerRecord>],
    ) -> Result<()> {
        let started = Instant::now();
        let subnet_ids: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.subnet_ids.iter())
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .collect();
        let nsg_ids: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.network_security_group_ids.iter())
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .collect();
        if subnet_ids.is_empty() && nsg_ids.is_empty() {
            return Ok(());
        }

        let ctx = self.inner.call_context(cancel);
        let mut jobs: Vec<Job> = Vec::with_capacity(subnet_ids.len() + nsg_ids.len());
        for id in &subnet_ids {
            let (inner, ctx, id) = (Arc::clone(&self.inner), ctx.clone(), id.to_string());
            jobs.push(
                async move {
                    let subnet = match inner.subnet(&ctx, &id).await {
                        Ok((subnet, _)) => subnet,
                        Err(err) if err.is_cancelled() => return Err(err),
                        Err(_) => None,
                    };
                    let vcn_id = subnet
                        .and_then(|s| s.vcn_id)
                        .filter(|vcn_id| !vcn_id.is_empty());
                    if let Some(vcn_id) = vcn_id {
                        match inner.vcn(&ctx, &vcn_id).await {
                            Err(err) if err.is_cancelled() => return Err(err),
                            _ => {}
                        }
                    }
                    Ok(())
                }
                .boxed(),
            );
        }
        for id in &nsg_ids {
            let (inner, ctx, id) = (Arc::clone(&self.inner), ctx.clone(), id.to_string());
            jobs.push(
                async move {
                    match inner.nsg(&ctx, &id).await {
                        Err(err) if err.is_cancelled() => Err(err),
                        _ => Ok(()),
                    }
                }
                .boxed(),
            );
        }

        self.inner.pool.run_all(cancel, jobs).await?;
        tracing::debug!(
            subnets = subnet_ids.len(),
            nsgs = nsg_ids.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "lb.enrich.prefetch"
        );
        Ok(())
    }
}

impl Inner {
    fn call_context(&self, cancel: &CancellationToken) -> CallContext {
        CallContext::new(cancel.clone(), self.gate.clone(), self.retry)
    }

    /// Decide whether a failed lookup ends the sub-task.
    fn tolerate(&self, step: &'static str, lb_id: &str, err: CloudError) -> Result<()> {
        if err.is_cancelled() || self.options.policy == EnrichmentPolicy::Strict {
            return Err(err);
        }
        tracing::warn!(step, lb_id, error = %err, "enrichment lookup failed, keeping raw value");
        Ok(())
    }

    async fn subnet(&self, ctx: &CallContext, id: &str) -> Result<(Option<SubnetRecord>, bool)> {
        let network = &self.clients.network;
        self.caches
            .subnets
            .fetch_or_resolve(ctx, id, |id| async move { network.get_subnet(&id).await })
            .await
    }

    async fn vcn(&self, ctx: &CallContext, id: &str) -> Result<(Option<VcnRecord>, bool)> {
        let network = &self.clients.network;
        self.caches
            .vcns
            .fetch_or_resolve(ctx, id, |id| async move { network.get_vcn(&id).await })
            .await
    }

    async fn nsg(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> Result<(Option<NetworkSecurityGroupRecord>, bool)> {
        let network = &self.clients.network;
        self.caches
            .nsgs
            .fetch_or_resolve(ctx, id, |id| async move {
                network.get_network_security_group(&id).await
            })
            .await
    }

    async fn resolve_subnets(&self, t: &Target) -> Result<()> {
        let started = Instant::now();
        let mut cache_hits = 0usize;
        let mut resolved = Vec::with_capacity(t.record.subnet_ids.len());
        let mut vcn_id: Option<String> = None;

        for id in t.record.subnet_ids.iter().filter(|id| !id.is_empty()) {
            let subnet = match self.subnet(&t.ctx, id).await {
                Ok((subnet, from_cache)) => {
                    if from_cache {
                        cache_hits += 1;
                    }
                    subnet
                }
                Err(err) => {
                    self.tolerate("resolve_subnets", &t.lb_id, err)?;
                    None
                }
            };

            let Some(subnet) = subnet else {
                resolved.push(id.clone());
                continue;
            };
            if vcn_id.is_none() {
                vcn_id = subnet.vcn_id.clone().filter(|v| !v.is_empty());
            }
            match (subnet.display_name.as_deref(), subnet.cidr_block.as_deref()) {
                (Some(name), Some(cidr)) if !name.is_empty() && !cidr.is_empty() => {
                    resolved.push(format!("{} ({})", name, cidr));
                }
                _ => resolved.push(id.clone()),
            }
        }

        let mut vcn_name = None;
        if let Some(vcn_id) = &vcn_id {
            let vcn_started = Instant::now();
            let (vcn, from_cache) = match self.vcn(&t.ctx, vcn_id).await {
                Ok(found) => found,
                Err(err) => {
                    self.tolerate("resolve_vcn", &t.lb_id, err)?;
                    (None, false)
                }
            };
            vcn_name = vcn.and_then(|v| v.display_name);
            tracing::debug!(
                lb_id = %t.lb_id,
                vcn_id = %vcn_id,
                from_cache,
                duration_ms = vcn_started.elapsed().as_millis() as u64,
                "lb.enrich.resolve_vcn"
            );
        }

        let subnets = resolved.len();
        {
            let mut lb = t.merged.lock().await;
            lb.subnets = resolved;
            if let Some(vcn_id) = vcn_id {
                lb.vcn_id = vcn_id;
            }
            if let Some(vcn_name) = vcn_name {
                lb.vcn_name = vcn_name;
            }
        }

        tracing::debug!(
            lb_id = %t.lb_id,
            subnets,
            cache_hits,
            cache_misses = subnets.saturating_sub(cache_hits),
            duration_ms = started.elapsed().as_millis() as u64,
            "lb.enrich.resolve_subnets"
        );
        Ok(())
    }

    async fn resolve_nsgs(&self, t: &Target) -> Result<()> {
        let started = Instant::now();
        let mut cache_hits = 0usize;
        let mut resolved = Vec::with_capacity(t.record.network_security_group_ids.len());

        for id in t
            .record
            .network_security_group_ids
            .iter()
            .filter(|id| !id.is_empty())
        {
            let nsg = match self.nsg(&t.ctx, id).await {
                Ok((nsg, from_cache)) => {
                    if from_cache {
                        cache_hits += 1;
                    }
                    nsg
                }
                Err(err) => {
                    self.tolerate("resolve_nsgs", &t.lb_id, err)?;
                    None
                }
            };
            let name = nsg
                .and_then(|n| n.display_name)
                .filter(|name| !name.is_empty());
            resolved.push(name.unwrap_or_else(|| id.clone()));
        }

        let nsgs = resolved.len();
        t.merged.lock().await.nsgs = resolved;

        tracing::debug!(
            lb_id = %t.lb_id,
            nsgs,
            cache_hits,
            cache_misses = nsgs.saturating_sub(cache_hits),
            duration_ms = started.elapsed().as_millis() as u64,
            "lb.enrich.resolve_nsgs"
        );
        Ok(())
    }

    /// Aggregate status of every backend set, one job per set.
    async fn backend_health(self: &Arc<Self>, t: &Target) -> Result<()> {
        if t.lb_id.is_empty() {
            return Ok(());
        }
        let started = Instant::now();
        let jobs: Vec<Job> = t
            .record
            .backend_sets
            .keys()
            .map(|set_name| {
                let (inner, t, set_name) = (Arc::clone(self), t.clone(), set_name.clone());
                async move {
                    let lb_api = &inner.clients.load_balancer;
                    match t
                        .ctx
                        .call(|| lb_api.get_backend_set_health(&t.lb_id, &set_name))
                        .await
                    {
                        Ok(health) => {
                            let status = health.status.unwrap_or_default().to_uppercase();
                            t.merged.lock().await.backend_health.insert(set_name, status);
                            Ok(())
                        }
                        Err(err) => inner.tolerate("backend_health", &t.lb_id, err),
                    }
                }
                .boxed()
            })
            .collect();

        let backend_sets = jobs.len();
        let result = self.pool.run_all(&t.ctx.cancel, jobs).await;
        tracing::debug!(
            lb_id = %t.lb_id,
            backend_sets,
            duration_ms = started.elapsed().as_millis() as u64,
            "lb.enrich.backend_health"
        );
        result
    }

    /// Backend membership of every set. Individual backends are probed only
    /// in deep mode or when their set is not healthy.
    async fn backend_members(self: &Arc<Self>, t: &Target) -> Result<()> {
        if t.lb_id.is_empty() {
            return Ok(());
        }
        let started = Instant::now();
        let jobs: Vec<Job> = t
            .record
            .backend_sets
            .keys()
            .map(|set_name| {
                let (inner, t, set_name) = (Arc::clone(self), t.clone(), set_name.clone());
                async move { inner.backend_set_members(&t, set_name).await }.boxed()
            })
            .collect();

        let backend_sets = jobs.len();
        let result = self.pool.run_all(&t.ctx.cancel, jobs).await;
        tracing::debug!(
            lb_id = %t.lb_id,
            backend_sets,
            duration_ms = started.elapsed().as_millis() as u64,
            "lb.enrich.backend_members"
        );
        result
    }

    async fn backend_set_members(&self, t: &Target, set_name: String) -> Result<()> {
        let lb_api = &self.clients.load_balancer;
        let set = match t
            .ctx
            .call(|| lb_api.get_backend_set(&t.lb_id, &set_name))
            .await
        {
            Ok(set) => set,
            Err(err) => return self.tolerate("backend_members", &t.lb_id, err),
        };

        let set_status = t
            .merged
            .lock()
            .await
            .health_of(&set_name)
            .map(str::to_owned)
            .unwrap_or_default();
        let probe = self.options.deep || (!set_status.is_empty() && set_status != "OK");

        let mut backends = Vec::with_capacity(set.backends.len());
        for record in &set.backends {
            let mut backend = Backend::new(
                record.ip_address.clone().unwrap_or_default(),
                record.port.unwrap_or(0),
            );
            if probe && backend.is_probeable() {
                let key = backend.health_key();
                match t
                    .ctx
                    .call(|| lb_api.get_backend_health(&t.lb_id, &set_name, &key))
                    .await
                {
                    Ok(health) => {
                        backend.status =
                            BackendStatus::from_remote(health.status.as_deref().unwrap_or(""));
                    }
                    Err(err) => self.tolerate("backend_probe", &t.lb_id, err)?,
                }
            }
            backends.push(backend);
        }

        let mut lb = t.merged.lock().await;
        lb.backend_sets
            .entry(set_name.clone())
            .or_insert_with(|| BackendSet {
                name: set_name,
                policy: set.policy.clone().unwrap_or_default(),
                ..Default::default()
            })
            .backends = backends;
        Ok(())
    }

    async fn certificates(&self, t: &Target) -> Result<()> {
        let started = Instant::now();
        if t.lb_id.is_empty() {
            t.merged.lock().await.ssl_certificates.clear();
            return Ok(());
        }

        let mut names = BTreeSet::new();
        let mut ids = BTreeSet::new();
        collect_listener_certificates(&t.record, &mut names, &mut ids);

        let lb_api = &self.clients.load_balancer;
        let (listed, list_cache_hit) = match self
            .caches
            .certificate_lists
            .fetch_or_resolve(&t.ctx, &t.lb_id, |id| async move {
                lb_api.list_certificates(&id).await
            })
            .await
        {
            Ok((listed, hit)) => (listed.unwrap_or_default(), hit),
            Err(err) => {
                self.tolerate("certificates", &t.lb_id, err)?;
                (Vec::new(), false)
            }
        };
        tracing::debug!(
            lb_id = %t.lb_id,
            cache_hit = list_cache_hit,
            "lb.enrich.certificates.list_cache"
        );

        let mut by_name: HashMap<String, CertificateRecord> = HashMap::new();
        if listed.is_empty() {
            for (name, cert) in &t.record.certificates {
                names.insert(name.clone());
                by_name.insert(name.clone(), cert.clone());
            }
        } else {
            for cert in listed {
                if let Some(name) = cert.certificate_name.clone() {
                    names.insert(name.clone());
                    by_name.insert(name, cert);
                }
            }
        }

        if names.is_empty() {
            match t.ctx.call(|| lb_api.get_load_balancer(&t.lb_id)).await {
                Ok(fresh) => {
                    for (name, cert) in &fresh.certificates {
                        names.insert(name.clone());
                        by_name.insert(name.clone(), cert.clone());
                    }
                    collect_listener_certificates(&fresh, &mut names, &mut BTreeSet::new());
                }
                Err(err) => self.tolerate("certificates", &t.lb_id, err)?,
            }
        }

        let mut out: Vec<String> = names
            .iter()
            .map(|name| {
                let expires = by_name
                    .get(name)
                    .and_then(|cert| cert.public_certificate.as_deref())
                    .filter(|pem| !pem.is_empty())
                    .and_then(certificate::not_after);
                certificate::display_name(name, expires)
            })
            .collect();

        let by_id = try_join_all(ids.iter().map(|id| self.resolve_certificate_id(t, id))).await?;
        out.extend(by_id);
        out.sort();

        let certs_count = out.len();
        t.merged.lock().await.ssl_certificates = out;
        tracing::debug!(
            lb_id = %t.lb_id,
            certs_count,
            duration_ms = started.elapsed().as_millis() as u64,
            "lb.enrich.certificates"
        );
        Ok(())
    }

    /// Name and expiry of a managed certificate, or the raw ID.
    async fn resolve_certificate_id(&self, t: &Target, id: &str) -> Result<String> {
        let certs_api = &self.clients.certificates;
        let cert = match self
            .caches
            .managed_certificates
            .fetch_or_resolve(&t.ctx, id, |id| async move {
                certs_api.get_certificate(&id).await
            })
            .await
        {
            Ok((Some(cert), _)) => cert,
            Ok((None, _)) => return Ok(id.to_string()),
            Err(err) => {
                self.tolerate("certificates", &t.lb_id, err)?;
                return Ok(id.to_string());
            }
        };

        let name = cert
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| id.to_string());

        let mut expires = None;
        if let Some(version) = cert.current_version.as_ref().and_then(|v| v.version_number) {
            match t
                .ctx
                .call(|| certs_api.get_certificate_version(id, version))
                .await
            {
                Ok(found) => {
                    expires = found.validity.and_then(|v| v.time_of_validity_not_after);
                }
                Err(err) => self.tolerate("certificates", &t.lb_id, err)?,
            }
        }
        Ok(certificate::display_name(&name, expires))
    }
}

fn collect_listener_certificates(
    record: &LoadBalancerRecord,
    names: &mut BTreeSet<String>,
    ids: &mut BTreeSet<String>,
) {
    for ssl in record
        .listeners
        .values()
        .filter_map(|l| l.ssl_configuration.as_ref())
    {
        if let Some(name) = ssl
            .certificate_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            names.insert(name.to_string());
        }
        ids.extend(
            ssl.certificate_ids
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        );
    }
}
