//! Raw records returned by the remote control-plane API
//!
//! These mirror the JSON payloads of the load balancer, virtual network and
//! certificates management services. Every field is optional because the
//! service omits unset attributes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One page of a paginated List call
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Token for the next page; `None` on the last page
    pub next_page: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
        }
    }

    pub fn with_next(items: Vec<T>, next_page: impl Into<String>) -> Self {
        Self {
            items,
            next_page: Some(next_page.into()),
        }
    }
}

/// Load balancer as returned by List/Get
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerRecord {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub lifecycle_state: Option<String>,
    pub is_private: Option<bool>,
    pub shape_name: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ip_addresses: Vec<IpAddressRecord>,
    #[serde(default)]
    pub listeners: HashMap<String, ListenerRecord>,
    #[serde(default)]
    pub routing_policies: HashMap<String, RoutingPolicyRecord>,
    #[serde(default)]
    pub backend_sets: HashMap<String, BackendSetRecord>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub network_security_group_ids: Vec<String>,
    #[serde(default)]
    pub certificates: HashMap<String, CertificateRecord>,
    #[serde(default)]
    pub hostnames: HashMap<String, HostnameRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressRecord {
    pub ip_address: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerRecord {
    pub name: Option<String>,
    pub default_backend_set_name: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub routing_policy_name: Option<String>,
    pub ssl_configuration: Option<SslConfigurationRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslConfigurationRecord {
    pub certificate_name: Option<String>,
    #[serde(default)]
    pub certificate_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingPolicyRecord {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSetRecord {
    pub name: Option<String>,
    pub policy: Option<String>,
    pub health_checker: Option<HealthCheckerRecord>,
    #[serde(default)]
    pub backends: Vec<BackendRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckerRecord {
    pub protocol: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRecord {
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub port: Option<u16>,
}

/// Certificate bundle attached directly to a load balancer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub certificate_name: Option<String>,
    pub public_certificate: Option<String>,
    pub ca_certificate: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostnameRecord {
    pub name: Option<String>,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSetHealthRecord {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendHealthRecord {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetRecord {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub cidr_block: Option<String>,
    pub vcn_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcnRecord {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroupRecord {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

/// Certificate held by the certificates management service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCertificateRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub current_version: Option<CertificateVersionSummaryRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateVersionSummaryRecord {
    pub version_number: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateVersionRecord {
    pub version_number: Option<i64>,
    pub validity: Option<ValidityRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityRecord {
    pub time_of_validity_not_before: Option<DateTime<Utc>>,
    pub time_of_validity_not_after: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_balancer_record_from_service_json() {
        let json = serde_json::json!({
            "id": "ocid1.loadbalancer.oc1..aaa",
            "displayName": "edge-lb",
            "lifecycleState": "ACTIVE",
            "isPrivate": false,
            "shapeName": "flexible",
            "timeCreated": "2024-03-01T10:00:00.000Z",
            "ipAddresses": [{ "ipAddress": "203.0.113.10", "isPublic": true }],
            "listeners": {
                "https": {
                    "name": "https",
                    "defaultBackendSetName": "web",
                    "port": 443,
                    "protocol": "HTTP",
                    "sslConfiguration": { "certificateName": "cert-a" }
                }
            },
            "subnetIds": ["ocid1.subnet.oc1..s1"]
        });

        let record: LoadBalancerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.display_name.as_deref(), Some("edge-lb"));
        assert_eq!(record.listeners["https"].port, Some(443));
        assert_eq!(
            record.listeners["https"]
                .ssl_configuration
                .as_ref()
                .and_then(|s| s.certificate_name.as_deref()),
            Some("cert-a")
        );
        assert!(record.backend_sets.is_empty());
        assert!(record.network_security_group_ids.is_empty());
        assert!(record.time_created.is_some());
    }
}
