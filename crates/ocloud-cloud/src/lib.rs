//! ocloud Cloud Inventory Engine
//!
//! This crate turns one cheap "list" call against the cloud control plane into
//! fully described load balancers, fanning out the dependent lookups (subnet,
//! VCN, NSG, backend health, backend membership, certificates) against a
//! rate-limited API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   ocloud CLI                     │
//! │        (network load-balancer list/get)          │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 ocloud-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  LoadBalancerService (paging, search)     │   │
//! │  │  Adapter ─► EnrichmentOrchestrator        │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌───────────┐ ┌────────────────┐  │
//! │  │ RateGate │ │RetryPolicy│ │ WorkerPool     │  │
//! │  └──────────┘ └───────────┘ │ ResolutionCache│  │
//! │                              └────────────────┘  │
//! │  trait LoadBalancerApi / NetworkApi / ...       │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼────────┐
//!           │ ocloud-cloud-oci│
//!           │  REST client    │
//!           └────────────────┘
//! ```

pub mod adapter;
pub mod cache;
pub mod call;
pub mod certificate;
pub mod enrich;
pub mod error;
pub mod mapping;
pub mod model;
pub mod pool;
pub mod provider;
pub mod rate_gate;
pub mod records;
pub mod retry;
pub mod service;

// Re-exports
pub use adapter::{Adapter, AdapterConfig};
pub use cache::ResolutionCache;
pub use call::CallContext;
pub use enrich::{EnrichmentOptions, EnrichmentOrchestrator, EnrichmentPolicy};
pub use error::{CloudError, Result};
pub use model::{Backend, BackendSet, BackendStatus, LoadBalancer};
pub use pool::{Job, WorkerPool};
pub use provider::{CertificatesApi, CloudClients, LoadBalancerApi, NetworkApi};
pub use rate_gate::RateGate;
pub use records::Page;
pub use retry::RetryPolicy;
pub use service::{LoadBalancerService, PageSlice};
pub use tokio_util::sync::CancellationToken;
