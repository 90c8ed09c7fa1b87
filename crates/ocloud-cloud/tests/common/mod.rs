use async_trait::async_trait;
use ocloud_cloud::records::{
    BackendHealthRecord, BackendRecord, BackendSetHealthRecord, BackendSetRecord,
    CertificateRecord, CertificateVersionRecord, CertificateVersionSummaryRecord,
    HealthCheckerRecord, ListenerRecord, LoadBalancerRecord, ManagedCertificateRecord,
    NetworkSecurityGroupRecord, SslConfigurationRecord, SubnetRecord, ValidityRecord, VcnRecord,
};
use ocloud_cloud::{
    Adapter, AdapterConfig, CertificatesApi, CloudClients, CloudError, EnrichmentOptions,
    LoadBalancerApi, NetworkApi, Page, RateGate, Result, RetryPolicy,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[allow(dead_code)]
pub const CERT_A_PEM: &str = include_str!("../fixtures/cert-a.pem");

/// In-memory control plane. Anything not registered answers 404.
#[derive(Default)]
pub struct FakeCloud {
    pages: Vec<Vec<LoadBalancerRecord>>,
    list_status: Option<u16>,
    subnets: HashMap<String, SubnetRecord>,
    vcns: HashMap<String, VcnRecord>,
    nsgs: HashMap<String, NetworkSecurityGroupRecord>,
    set_health: HashMap<String, String>,
    backend_sets: HashMap<String, BackendSetRecord>,
    backend_health: HashMap<String, String>,
    certificate_lists: HashMap<String, Vec<CertificateRecord>>,
    managed: HashMap<String, ManagedCertificateRecord>,
    versions: HashMap<String, CertificateVersionRecord>,
    latency: Option<Duration>,
    throttled: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, items: Vec<LoadBalancerRecord>) -> Self {
        for lb in &items {
            if let Some(id) = &lb.id {
                self.certificate_lists.entry(id.clone()).or_default();
            }
        }
        self.pages.push(items);
        self
    }

    pub fn failing_list(mut self, status: u16) -> Self {
        self.list_status = Some(status);
        self
    }

    pub fn with_subnet(mut self, id: &str, name: &str, cidr: &str, vcn_id: &str) -> Self {
        self.subnets.insert(
            id.to_string(),
            SubnetRecord {
                id: Some(id.to_string()),
                display_name: Some(name.to_string()),
                cidr_block: Some(cidr.to_string()),
                vcn_id: Some(vcn_id.to_string()),
            },
        );
        self
    }

    pub fn with_vcn(mut self, id: &str, name: &str) -> Self {
        self.vcns.insert(
            id.to_string(),
            VcnRecord {
                id: Some(id.to_string()),
                display_name: Some(name.to_string()),
            },
        );
        self
    }

    pub fn with_nsg(mut self, id: &str, name: &str) -> Self {
        self.nsgs.insert(
            id.to_string(),
            NetworkSecurityGroupRecord {
                id: Some(id.to_string()),
                display_name: Some(name.to_string()),
            },
        );
        self
    }

    /// Register a backend set with its aggregate health and its backends.
    pub fn with_backend_set(
        mut self,
        lb_id: &str,
        set: &str,
        health: &str,
        backends: &[(&str, u16)],
    ) -> Self {
        let key = format!("{}/{}", lb_id, set);
        self.set_health.insert(key.clone(), health.to_string());
        self.backend_sets.insert(
            key,
            BackendSetRecord {
                name: Some(set.to_string()),
                policy: Some("ROUND_ROBIN".to_string()),
                health_checker: None,
                backends: backends
                    .iter()
                    .map(|(ip, port)| BackendRecord {
                        name: Some(format!("{}:{}", ip, port)),
                        ip_address: Some(ip.to_string()),
                        port: Some(*port),
                    })
                    .collect(),
            },
        );
        self
    }

    pub fn with_backend_health(
        mut self,
        lb_id: &str,
        set: &str,
        backend: &str,
        status: &str,
    ) -> Self {
        self.backend_health
            .insert(format!("{}/{}/{}", lb_id, set, backend), status.to_string());
        self
    }

    pub fn with_certificate_list(mut self, lb_id: &str, certs: Vec<CertificateRecord>) -> Self {
        self.certificate_lists.insert(lb_id.to_string(), certs);
        self
    }

    pub fn with_managed_certificate(mut self, id: &str, name: &str, not_after: &str) -> Self {
        self.managed.insert(
            id.to_string(),
            ManagedCertificateRecord {
                id: Some(id.to_string()),
                name: Some(name.to_string()),
                current_version: Some(CertificateVersionSummaryRecord {
                    version_number: Some(3),
                }),
            },
        );
        self.versions.insert(
            format!("{}/3", id),
            CertificateVersionRecord {
                version_number: Some(3),
                validity: Some(ValidityRecord {
                    time_of_validity_not_before: None,
                    time_of_validity_not_after: Some(not_after.parse().unwrap()),
                }),
            },
        );
        self
    }

    /// Every call answers after `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer the next `times` calls matching `call` with HTTP 429.
    pub fn throttle(self, call: &str, times: u32) -> Self {
        self.throttled.lock().unwrap().insert(call.to_string(), times);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    async fn enter(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut throttled = self.throttled.lock().unwrap();
        if let Some(remaining) = throttled.get_mut(&call) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CloudError::from_status(429, "TooManyRequests"));
            }
        }
        Ok(())
    }
}

fn found<T: Clone>(value: Option<&T>, what: &str) -> Result<T> {
    value
        .cloned()
        .ok_or_else(|| CloudError::NotFound(what.to_string()))
}

#[async_trait]
impl LoadBalancerApi for FakeCloud {
    async fn list_load_balancers(
        &self,
        compartment_id: &str,
        page: Option<&str>,
    ) -> Result<Page<LoadBalancerRecord>> {
        self.enter(format!("list_load_balancers:{}", page.unwrap_or("")))
            .await?;
        if let Some(status) = self.list_status {
            return Err(CloudError::from_status(status, "list failed"));
        }
        assert_eq!(compartment_id, "ocid1.compartment..test");

        let index: usize = page.map(|p| p.parse().unwrap()).unwrap_or(0);
        let items = self.pages.get(index).cloned().unwrap_or_default();
        if index + 1 < self.pages.len() {
            Ok(Page::with_next(items, (index + 1).to_string()))
        } else {
            Ok(Page::last(items))
        }
    }

    async fn get_load_balancer(&self, load_balancer_id: &str) -> Result<LoadBalancerRecord> {
        self.enter(format!("get_load_balancer:{}", load_balancer_id))
            .await?;
        self.pages
            .iter()
            .flatten()
            .find(|lb| lb.id.as_deref() == Some(load_balancer_id))
            .cloned()
            .ok_or_else(|| CloudError::NotFound(load_balancer_id.to_string()))
    }

    async fn get_backend_set_health(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
    ) -> Result<BackendSetHealthRecord> {
        let key = format!("{}/{}", load_balancer_id, backend_set_name);
        self.enter(format!("get_backend_set_health:{}", key)).await?;
        Ok(BackendSetHealthRecord {
            status: Some(found(self.set_health.get(&key), &key)?),
        })
    }

    async fn get_backend_set(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
    ) -> Result<BackendSetRecord> {
        let key = format!("{}/{}", load_balancer_id, backend_set_name);
        self.enter(format!("get_backend_set:{}", key)).await?;
        found(self.backend_sets.get(&key), &key)
    }

    async fn get_backend_health(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        backend_name: &str,
    ) -> Result<BackendHealthRecord> {
        let key = format!("{}/{}/{}", load_balancer_id, backend_set_name, backend_name);
        self.enter(format!("get_backend_health:{}", key)).await?;
        Ok(BackendHealthRecord {
            status: Some(found(self.backend_health.get(&key), &key)?),
        })
    }

    async fn list_certificates(&self, load_balancer_id: &str) -> Result<Vec<CertificateRecord>> {
        self.enter(format!("list_certificates:{}", load_balancer_id))
            .await?;
        found(self.certificate_lists.get(load_balancer_id), load_balancer_id)
    }
}

#[async_trait]
impl NetworkApi for FakeCloud {
    async fn get_subnet(&self, subnet_id: &str) -> Result<SubnetRecord> {
        self.enter(format!("get_subnet:{}", subnet_id)).await?;
        found(self.subnets.get(subnet_id), subnet_id)
    }

    async fn get_vcn(&self, vcn_id: &str) -> Result<VcnRecord> {
        self.enter(format!("get_vcn:{}", vcn_id)).await?;
        found(self.vcns.get(vcn_id), vcn_id)
    }

    async fn get_network_security_group(
        &self,
        nsg_id: &str,
    ) -> Result<NetworkSecurityGroupRecord> {
        self.enter(format!("get_nsg:{}", nsg_id)).await?;
        found(self.nsgs.get(nsg_id), nsg_id)
    }
}

#[async_trait]
impl CertificatesApi for FakeCloud {
    async fn get_certificate(&self, certificate_id: &str) -> Result<ManagedCertificateRecord> {
        self.enter(format!("get_certificate:{}", certificate_id))
            .await?;
        found(self.managed.get(certificate_id), certificate_id)
    }

    async fn get_certificate_version(
        &self,
        certificate_id: &str,
        version_number: i64,
    ) -> Result<CertificateVersionRecord> {
        let key = format!("{}/{}", certificate_id, version_number);
        self.enter(format!("get_certificate_version:{}", key)).await?;
        found(self.versions.get(&key), &key)
    }
}

#[allow(dead_code)]
pub const COMPARTMENT: &str = "ocid1.compartment..test";

/// A load balancer record with one HTTP listener in front of backend set `web`.
pub fn lb_record(id: &str, name: &str) -> LoadBalancerRecord {
    LoadBalancerRecord {
        id: Some(id.to_string()),
        display_name: Some(name.to_string()),
        lifecycle_state: Some("ACTIVE".to_string()),
        is_private: Some(false),
        shape_name: Some("flexible".to_string()),
        listeners: HashMap::from([(
            "http".to_string(),
            ListenerRecord {
                name: Some("http".to_string()),
                default_backend_set_name: Some("web".to_string()),
                port: Some(80),
                protocol: Some("HTTP".to_string()),
                routing_policy_name: None,
                ssl_configuration: None,
            },
        )]),
        backend_sets: HashMap::from([(
            "web".to_string(),
            BackendSetRecord {
                name: Some("web".to_string()),
                policy: Some("ROUND_ROBIN".to_string()),
                health_checker: Some(HealthCheckerRecord {
                    protocol: Some("HTTP".to_string()),
                    port: Some(80),
                }),
                backends: Vec::new(),
            },
        )]),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn with_tls_listener(
    mut record: LoadBalancerRecord,
    certificate_name: Option<&str>,
    certificate_ids: &[&str],
) -> LoadBalancerRecord {
    record.listeners.insert(
        "https".to_string(),
        ListenerRecord {
            name: Some("https".to_string()),
            default_backend_set_name: Some("web".to_string()),
            port: Some(443),
            protocol: Some("HTTP".to_string()),
            routing_policy_name: None,
            ssl_configuration: Some(SslConfigurationRecord {
                certificate_name: certificate_name.map(str::to_string),
                certificate_ids: certificate_ids.iter().map(|s| s.to_string()).collect(),
            }),
        },
    );
    record
}

#[allow(dead_code)]
pub fn certificate(name: &str, pem: Option<&str>) -> CertificateRecord {
    CertificateRecord {
        certificate_name: Some(name.to_string()),
        public_certificate: pem.map(str::to_string),
        ca_certificate: None,
    }
}

pub fn adapter(cloud: &Arc<FakeCloud>, enrichment: EnrichmentOptions) -> Adapter {
    adapter_with(cloud, enrichment, 4, RetryPolicy::default())
}

pub fn adapter_with(
    cloud: &Arc<FakeCloud>,
    enrichment: EnrichmentOptions,
    workers: usize,
    retry: RetryPolicy,
) -> Adapter {
    Adapter::new(
        CloudClients::from_shared(Arc::clone(cloud)),
        AdapterConfig {
            workers,
            gate: RateGate::unlimited(),
            retry,
            enrichment,
        },
    )
}
