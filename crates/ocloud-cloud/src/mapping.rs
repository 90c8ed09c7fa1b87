//! Base mapping from a List/Get record to the domain model
//!
//! Pure and synchronous. Enrichment later replaces raw IDs with resolved
//! names but never reads anything this step did not produce.

use crate::model::{BackendSet, LoadBalancer};
use crate::records::{BackendSetRecord, HealthCheckerRecord, ListenerRecord, LoadBalancerRecord};
use std::collections::{BTreeMap, BTreeSet};

impl From<&LoadBalancerRecord> for LoadBalancer {
    fn from(record: &LoadBalancerRecord) -> Self {
        let id = record.id.clone().unwrap_or_default();

        let lb_type = if record.is_private.unwrap_or(false) {
            "Private"
        } else {
            "Public"
        };

        let ip_addresses = record
            .ip_addresses
            .iter()
            .filter_map(|ip| {
                let addr = ip.ip_address.as_deref().filter(|a| !a.is_empty())?;
                Some(match ip.is_public {
                    Some(true) => format!("{} (public)", addr),
                    Some(false) => format!("{} (private)", addr),
                    None => addr.to_string(),
                })
            })
            .collect();

        let listeners = record
            .listeners
            .iter()
            .map(|(name, listener)| (name.clone(), listener_summary(listener)))
            .collect();

        let backend_sets = record
            .backend_sets
            .iter()
            .map(|(name, set)| (name.clone(), base_backend_set(name, set)))
            .collect();

        let mut ssl_certificates: Vec<String> = record.certificates.keys().cloned().collect();
        ssl_certificates.sort();

        LoadBalancer {
            ocid: id.clone(),
            id,
            name: record.display_name.clone().unwrap_or_default(),
            state: record.lifecycle_state.clone().unwrap_or_default(),
            lb_type: lb_type.to_string(),
            shape: record.shape_name.clone().unwrap_or_default(),
            ip_addresses,
            listeners,
            backend_sets,
            backend_health: BTreeMap::new(),
            subnets: record.subnet_ids.clone(),
            nsgs: record.network_security_group_ids.clone(),
            vcn_id: String::new(),
            vcn_name: String::new(),
            routing_policies: routing_policies(record),
            use_ssl: record
                .listeners
                .values()
                .any(|l| l.ssl_configuration.is_some()),
            hostnames: hostnames(record),
            ssl_certificates,
            created: record.time_created,
        }
    }
}

/// `"proto:port → backend set"`
fn listener_summary(listener: &ListenerRecord) -> String {
    let port = listener.port.unwrap_or(0);
    let proto = if listener.ssl_configuration.is_some() || port == 443 || port == 8443 {
        "https"
    } else if listener
        .protocol
        .as_deref()
        .is_some_and(|p| p.eq_ignore_ascii_case("tcp"))
    {
        "tcp"
    } else {
        "http"
    };
    let backend = listener.default_backend_set_name.as_deref().unwrap_or("");
    format!("{}:{} → {}", proto, port, backend)
}

fn base_backend_set(name: &str, set: &BackendSetRecord) -> BackendSet {
    BackendSet {
        name: name.to_string(),
        policy: set.policy.clone().unwrap_or_default(),
        health_checker: set
            .health_checker
            .as_ref()
            .map(health_checker_summary)
            .unwrap_or_default(),
        // Filled by enrichment
        backends: Vec::new(),
    }
}

/// `"PROTO:PORT"`, or empty when no protocol can be derived.
fn health_checker_summary(checker: &HealthCheckerRecord) -> String {
    let port = checker.port.unwrap_or(0);
    let mut proto = checker
        .protocol
        .as_deref()
        .map(str::to_ascii_uppercase)
        .unwrap_or_default();

    match port {
        443 | 8443 => proto = "HTTPS".to_string(),
        80 if proto.is_empty() => proto = "HTTP".to_string(),
        _ => {}
    }

    if proto.is_empty() {
        String::new()
    } else {
        format!("{}:{}", proto, port)
    }
}

/// Policies referenced by listeners, else every defined policy. Sorted.
fn routing_policies(record: &LoadBalancerRecord) -> Vec<String> {
    let referenced: BTreeSet<String> = record
        .listeners
        .values()
        .filter_map(|l| l.routing_policy_name.clone())
        .filter(|name| !name.is_empty())
        .collect();

    if !referenced.is_empty() {
        return referenced.into_iter().collect();
    }

    record
        .routing_policies
        .keys()
        .filter(|name| !name.is_empty())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn hostnames(record: &LoadBalancerRecord) -> Vec<String> {
    let mut names: Vec<String> = record
        .hostnames
        .iter()
        .filter_map(|(key, host)| match host.hostname.as_deref() {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            _ => Some(key.trim().to_string()).filter(|k| !k.is_empty()),
        })
        .collect();
    names.sort();
    names
}
