//! Load balancer domain model
//!
//! A [`LoadBalancer`] is built fresh for every call: base mapping fills it from
//! the List/Get record and enrichment adds resolved names on top. Maps are
//! ordered so JSON output and tables are stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fully described load balancer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    pub ocid: String,
    pub name: String,
    pub state: String,
    #[serde(rename = "type")]
    pub lb_type: String,
    pub shape: String,
    pub ip_addresses: Vec<String>,

    /// Listener name -> `"proto:port → backend set"`
    pub listeners: BTreeMap<String, String>,
    pub backend_sets: BTreeMap<String, BackendSet>,

    /// Backend set name -> aggregate health status (upper case)
    pub backend_health: BTreeMap<String, String>,

    /// Subnet IDs, replaced by `"Name (CIDR)"` once resolved
    pub subnets: Vec<String>,

    /// NSG IDs, replaced by display names once resolved
    pub nsgs: Vec<String>,
    pub vcn_id: String,
    pub vcn_name: String,
    pub routing_policies: Vec<String>,
    pub use_ssl: bool,
    pub hostnames: Vec<String>,

    /// Certificate names, with `" (Expires: YYYY-MM-DD)"` when known
    pub ssl_certificates: Vec<String>,
    pub created: Option<DateTime<Utc>>,
}

impl LoadBalancer {
    pub fn is_private(&self) -> bool {
        self.lb_type == "Private"
    }

    /// Aggregate health of a backend set, if it has been fetched
    pub fn health_of(&self, backend_set: &str) -> Option<&str> {
        self.backend_health.get(backend_set).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSet {
    pub name: String,
    pub policy: String,

    /// `"PROTO:PORT"`, empty when no health checker is configured
    pub health_checker: String,
    pub backends: Vec<Backend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    /// IP address of the backend
    pub name: String,
    pub port: u16,
    pub status: BackendStatus,
}

impl Backend {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            status: BackendStatus::Unknown,
        }
    }

    /// Whether the backend has enough addressing to be probed
    pub fn is_probeable(&self) -> bool {
        !self.name.is_empty() && self.port > 0
    }

    /// Backend name as the health API expects it
    pub fn health_key(&self) -> String {
        format!("{}:{}", self.name, self.port)
    }
}

/// Health of a single backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackendStatus {
    Ok,
    Warning,
    Critical,
    #[default]
    Unknown,
}

impl BackendStatus {
    /// Parse a status reported by the remote API; anything unrecognised is `Unknown`.
    pub fn from_remote(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "OK" => BackendStatus::Ok,
            "WARNING" => BackendStatus::Warning,
            "CRITICAL" => BackendStatus::Critical,
            _ => BackendStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendStatus::Ok => "OK",
            BackendStatus::Warning => "WARNING",
            BackendStatus::Critical => "CRITICAL",
            BackendStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
