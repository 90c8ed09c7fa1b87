//! Remote control-plane API contract
//!
//! The enrichment engine only talks to the cloud through these traits. The REST
//! implementation lives in `ocloud-cloud-oci`; tests use in-memory fakes.

use crate::error::Result;
use crate::records::{
    BackendHealthRecord, BackendSetHealthRecord, BackendSetRecord, CertificateRecord,
    CertificateVersionRecord, LoadBalancerRecord, ManagedCertificateRecord,
    NetworkSecurityGroupRecord, Page, SubnetRecord, VcnRecord,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Load balancer service operations
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    /// List load balancers in a compartment, one page at a time
    async fn list_load_balancers(
        &self,
        compartment_id: &str,
        page: Option<&str>,
    ) -> Result<Page<LoadBalancerRecord>>;

    async fn get_load_balancer(&self, load_balancer_id: &str) -> Result<LoadBalancerRecord>;

    /// Aggregate health of one backend set
    async fn get_backend_set_health(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
    ) -> Result<BackendSetHealthRecord>;

    async fn get_backend_set(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
    ) -> Result<BackendSetRecord>;

    /// Health of a single backend, named `ip:port`
    async fn get_backend_health(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        backend_name: &str,
    ) -> Result<BackendHealthRecord>;

    async fn list_certificates(&self, load_balancer_id: &str) -> Result<Vec<CertificateRecord>>;
}

/// Virtual network service operations
#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn get_subnet(&self, subnet_id: &str) -> Result<SubnetRecord>;

    async fn get_vcn(&self, vcn_id: &str) -> Result<VcnRecord>;

    async fn get_network_security_group(&self, nsg_id: &str)
    -> Result<NetworkSecurityGroupRecord>;
}

/// Certificates management service operations
#[async_trait]
pub trait CertificatesApi: Send + Sync {
    async fn get_certificate(&self, certificate_id: &str) -> Result<ManagedCertificateRecord>;

    async fn get_certificate_version(
        &self,
        certificate_id: &str,
        version_number: i64,
    ) -> Result<CertificateVersionRecord>;
}

/// The set of service clients an adapter needs
#[derive(Clone)]
pub struct CloudClients {
    pub load_balancer: Arc<dyn LoadBalancerApi>,
    pub network: Arc<dyn NetworkApi>,
    pub certificates: Arc<dyn CertificatesApi>,
}

impl CloudClients {
    pub fn new(
        load_balancer: Arc<dyn LoadBalancerApi>,
        network: Arc<dyn NetworkApi>,
        certificates: Arc<dyn CertificatesApi>,
    ) -> Self {
        Self {
            load_balancer,
            network,
            certificates,
        }
    }

    /// Use one client that implements every service
    pub fn from_shared<C>(client: Arc<C>) -> Self
    where
        C: LoadBalancerApi + NetworkApi + CertificatesApi + 'static,
    {
        Self {
            load_balancer: client.clone(),
            network: client.clone(),
            certificates: client,
        }
    }
}
