//! Endpoint and credential configuration

use crate::error::{OciError, Result};
use std::time::Duration;

pub const LOAD_BALANCER_API_VERSION: &str = "20170115";
pub const NETWORK_API_VERSION: &str = "20160918";
pub const CERTIFICATES_API_VERSION: &str = "20210224";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`crate::OciClient`]
#[derive(Debug, Clone)]
pub struct OciConfig {
    pub region: String,

    /// Bearer token forwarded on every request (e.g. to a signing proxy)
    pub auth_token: Option<String>,
    pub timeout: Duration,

    /// Overrides for the per-service hosts, without the API version path
    pub load_balancer_endpoint: Option<String>,
    pub network_endpoint: Option<String>,
    pub certificates_endpoint: Option<String>,
}

impl OciConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            load_balancer_endpoint: None,
            network_endpoint: None,
            certificates_endpoint: None,
        }
    }

    /// Create OciConfig from environment variables
    ///
    /// `OCLOUD_REGION` is required; `OCLOUD_AUTH_TOKEN` and `OCLOUD_ENDPOINT`
    /// (one host for every service) are optional.
    pub fn from_env() -> Result<Self> {
        let region = std::env::var("OCLOUD_REGION")
            .map_err(|_| OciError::MissingEnvVar("OCLOUD_REGION".to_string()))?;
        let mut config = Self::new(region);
        config.auth_token = std::env::var("OCLOUD_AUTH_TOKEN").ok();
        if let Ok(endpoint) = std::env::var("OCLOUD_ENDPOINT") {
            config = config.with_endpoint(endpoint);
        }
        Ok(config)
    }

    /// Send every service to one host
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.load_balancer_endpoint = Some(endpoint.clone());
        self.network_endpoint = Some(endpoint.clone());
        self.certificates_endpoint = Some(endpoint);
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let has_overrides = self.load_balancer_endpoint.is_some()
            && self.network_endpoint.is_some()
            && self.certificates_endpoint.is_some();
        if self.region.trim().is_empty() && !has_overrides {
            return Err(OciError::InvalidConfig(
                "region is required unless every endpoint is overridden".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(OciError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the load balancer service, including the API version
    pub fn load_balancer_base(&self) -> String {
        let host = self
            .load_balancer_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://iaas.{}.oraclecloud.com", self.region));
        versioned(&host, LOAD_BALANCER_API_VERSION)
    }

    pub fn network_base(&self) -> String {
        let host = self
            .network_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://iaas.{}.oraclecloud.com", self.region));
        versioned(&host, NETWORK_API_VERSION)
    }

    pub fn certificates_base(&self) -> String {
        let host = self.certificates_endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://certificatesmanagement.{}.oci.oraclecloud.com",
                self.region
            )
        });
        versioned(&host, CERTIFICATES_API_VERSION)
    }
}

fn versioned(host: &str, version: &str) -> String {
    format!("{}/{}", host.trim_end_matches('/'), version)
}
