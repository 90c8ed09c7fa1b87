//! REST client for the load balancer, virtual network and certificates
//! management services
//!
//! Implements the engine's API traits directly over HTTP. Throttling,
//! retries and cancellation are handled by the engine; this client only maps
//! responses.

use crate::config::OciConfig;
use crate::error::{OciError, Result};
use async_trait::async_trait;
use ocloud_cloud::records::{
    BackendHealthRecord, BackendSetHealthRecord, BackendSetRecord, CertificateRecord,
    CertificateVersionRecord, LoadBalancerRecord, ManagedCertificateRecord,
    NetworkSecurityGroupRecord, Page, SubnetRecord, VcnRecord,
};
use ocloud_cloud::{CertificatesApi, LoadBalancerApi, NetworkApi};
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;

const NEXT_PAGE_HEADER: &str = "opc-next-page";

/// Error body returned by every service
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Response body plus the pagination token, if any
struct Fetched<T> {
    body: T,
    next_page: Option<String>,
}

pub struct OciClient {
    http: reqwest::Client,
    auth_token: Option<String>,
    load_balancer_base: String,
    network_base: String,
    certificates_base: String,
}

impl OciClient {
    pub fn new(config: OciConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ocloud/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            load_balancer_base: config.load_balancer_base(),
            network_base: config.network_base(),
            certificates_base: config.certificates_base(),
            auth_token: config.auth_token,
        })
    }

    /// `base` followed by percent-encoded path segments
    fn url(&self, base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| OciError::InvalidConfig(format!("invalid endpoint '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| OciError::InvalidConfig(format!("endpoint '{}' cannot be a base", base)))?
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Fetched<T>> {
        tracing::debug!(url = %url, "GET");
        let mut request = self.http.get(url).query(query);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ApiErrorBody>(&text).unwrap_or(ApiErrorBody {
                code: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: text,
            });
            tracing::debug!(status = status.as_u16(), code = %body.code, "request failed");
            return Err(OciError::Status {
                status: status.as_u16(),
                code: body.code,
                message: body.message,
            });
        }

        let next_page = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes)?;
        Ok(Fetched { body, next_page })
    }

    async fn get_lb<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(&self.load_balancer_base, segments)?;
        Ok(self.get(url, &[]).await?.body)
    }
}

#[async_trait]
impl LoadBalancerApi for OciClient {
    async fn list_load_balancers(
        &self,
        compartment_id: &str,
        page: Option<&str>,
    ) -> ocloud_cloud::Result<Page<LoadBalancerRecord>> {
        let url = self.url(&self.load_balancer_base, &["loadBalancers"])?;
        let mut query = vec![("compartmentId", compartment_id)];
        if let Some(page) = page {
            query.push(("page", page));
        }
        let fetched: Fetched<Vec<LoadBalancerRecord>> = self.get(url, &query).await?;
        Ok(Page {
            items: fetched.body,
            next_page: fetched.next_page,
        })
    }

    async fn get_load_balancer(
        &self,
        load_balancer_id: &str,
    ) -> ocloud_cloud::Result<LoadBalancerRecord> {
        Ok(self.get_lb(&["loadBalancers", load_balancer_id]).await?)
    }

    async fn get_backend_set_health(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
    ) -> ocloud_cloud::Result<BackendSetHealthRecord> {
        Ok(self
            .get_lb(&[
                "loadBalancers",
                load_balancer_id,
                "backendSets",
                backend_set_name,
                "health",
            ])
            .await?)
    }

    async fn get_backend_set(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
    ) -> ocloud_cloud::Result<BackendSetRecord> {
        Ok(self
            .get_lb(&[
                "loadBalancers",
                load_balancer_id,
                "backendSets",
                backend_set_name,
            ])
            .await?)
    }

    async fn get_backend_health(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        backend_name: &str,
    ) -> ocloud_cloud::Result<BackendHealthRecord> {
        Ok(self
            .get_lb(&[
                "loadBalancers",
                load_balancer_id,
                "backendSets",
                backend_set_name,
                "backends",
                backend_name,
                "health",
            ])
            .await?)
    }

    async fn list_certificates(
        &self,
        load_balancer_id: &str,
    ) -> ocloud_cloud::Result<Vec<CertificateRecord>> {
        Ok(self
            .get_lb(&["loadBalancers", load_balancer_id, "certificates"])
            .await?)
    }
}

#[async_trait]
impl NetworkApi for OciClient {
    async fn get_subnet(&self, subnet_id: &str) -> ocloud_cloud::Result<SubnetRecord> {
        let url = self.url(&self.network_base, &["subnets", subnet_id])?;
        Ok(self.get(url, &[]).await?.body)
    }

    async fn get_vcn(&self, vcn_id: &str) -> ocloud_cloud::Result<VcnRecord> {
        let url = self.url(&self.network_base, &["vcns", vcn_id])?;
        Ok(self.get(url, &[]).await?.body)
    }

    async fn get_network_security_group(
        &self,
        nsg_id: &str,
    ) -> ocloud_cloud::Result<NetworkSecurityGroupRecord> {
        let url = self.url(&self.network_base, &["networkSecurityGroups", nsg_id])?;
        Ok(self.get(url, &[]).await?.body)
    }
}

#[async_trait]
impl CertificatesApi for OciClient {
    async fn get_certificate(
        &self,
        certificate_id: &str,
    ) -> ocloud_cloud::Result<ManagedCertificateRecord> {
        let url = self.url(&self.certificates_base, &["certificates", certificate_id])?;
        Ok(self.get(url, &[]).await?.body)
    }

    async fn get_certificate_version(
        &self,
        certificate_id: &str,
        version_number: i64,
    ) -> ocloud_cloud::Result<CertificateVersionRecord> {
        let version = version_number.to_string();
        let url = self.url(
            &self.certificates_base,
            &["certificates", certificate_id, "versions", &version],
        )?;
        Ok(self.get(url, &[]).await?.body)
    }
}
