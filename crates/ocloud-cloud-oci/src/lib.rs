//! REST client for ocloud
//!
//! Talks to the load balancer, virtual network and certificates management
//! services over HTTPS and implements the `ocloud-cloud` API traits, so an
//! [`OciClient`] can be handed straight to the enrichment engine.
//!
//! # Requirements
//!
//! - `OCLOUD_REGION` (or explicit endpoints for every service)
//! - Optional `OCLOUD_AUTH_TOKEN`, sent as a bearer token
//!
//! # Example
//!
//! ```ignore
//! use ocloud_cloud::{Adapter, CancellationToken, CloudClients};
//! use ocloud_cloud_oci::{OciClient, OciConfig};
//! use std::sync::Arc;
//!
//! let client = Arc::new(OciClient::new(OciConfig::from_env()?)?);
//! let adapter = Adapter::with_defaults(CloudClients::from_shared(client));
//! let lbs = adapter
//!     .list_load_balancers(&CancellationToken::new(), "ocid1.compartment..")
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::OciClient;
pub use config::OciConfig;
pub use error::{OciError, Result};
