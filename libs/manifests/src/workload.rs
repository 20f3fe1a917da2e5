//! Workload description and validation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::quantity;

/// Label key used for the deployment selector and the service selector.
pub const APP_LABEL: &str = "app";

/// Maximum length of a DNS-1123 label.
const MAX_LABEL_LEN: usize = 63;

/// Longest workload name that still leaves room for the `-service` suffix.
const MAX_WORKLOAD_NAME_LEN: usize = MAX_LABEL_LEN - "-service".len();

/// How the workload's Service is exposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
}

impl ServiceType {
    /// Kubernetes spelling of the service type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::ClusterIP => "ClusterIP",
            ServiceType::NodePort => "NodePort",
            ServiceType::LoadBalancer => "LoadBalancer",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clusterip" => Ok(ServiceType::ClusterIP),
            "nodeport" => Ok(ServiceType::NodePort),
            "loadbalancer" => Ok(ServiceType::LoadBalancer),
            other => Err(format!(
                "unknown service type '{other}' (expected ClusterIP, NodePort or LoadBalancer)"
            )),
        }
    }
}

/// CPU and memory requests/limits for the workload container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub cpu_request: String,
    pub cpu_limit: String,
    pub memory_request: String,
    pub memory_limit: String,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            cpu_request: "100m".to_string(),
            cpu_limit: "200m".to_string(),
            memory_request: "128Mi".to_string(),
            memory_limit: "256Mi".to_string(),
        }
    }
}

/// A single-container workload to run on the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Deployment name, also the container name and the `app` label value.
    pub name: String,

    /// Container image reference.
    pub image: String,

    /// Target namespace.
    pub namespace: String,

    /// Desired replica count.
    pub replicas: i32,

    /// Container resources.
    pub resources: ResourceSpec,

    /// Container ports, each mirrored as a service port.
    pub ports: Vec<i32>,

    /// Service exposure type.
    pub service_type: ServiceType,
}

impl WorkloadSpec {
    /// Create a workload with default namespace, resources and one replica.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            namespace: "default".to_string(),
            replicas: 1,
            resources: ResourceSpec::default(),
            ports: Vec::new(),
            service_type: ServiceType::default(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = i32>) -> Self {
        self.ports = ports.into_iter().collect();
        self
    }

    pub fn with_resources(mut self, resources: ResourceSpec) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = service_type;
        self
    }

    /// Validate names, ports and resource quantities.
    pub fn validate(&self) -> Result<(), ManifestError> {
        validate_label("name", &self.name, MAX_WORKLOAD_NAME_LEN)?;
        // The Service reuses the name and must be a DNS-1035 label.
        if !self.name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(ManifestError::InvalidName {
                field: "name",
                value: self.name.clone(),
                reason: "must start with a lowercase letter".to_string(),
            });
        }
        validate_label("namespace", &self.namespace, MAX_LABEL_LEN)?;

        if self.image.trim().is_empty() {
            return Err(ManifestError::EmptyImage);
        }

        if self.replicas < 0 {
            return Err(ManifestError::NegativeReplicas(self.replicas));
        }

        let mut seen = BTreeSet::new();
        for &port in &self.ports {
            if !(1..=65535).contains(&port) {
                return Err(ManifestError::PortOutOfRange(port));
            }
            if !seen.insert(port) {
                return Err(ManifestError::DuplicatePort(port));
            }
        }

        let r = &self.resources;
        check_request_limit("cpu", &r.cpu_request, &r.cpu_limit)?;
        check_request_limit("memory", &r.memory_request, &r.memory_limit)?;

        Ok(())
    }
}

fn check_request_limit(
    resource: &'static str,
    request: &str,
    limit: &str,
) -> Result<(), ManifestError> {
    let (request_field, limit_field) = match resource {
        "cpu" => ("cpu_request", "cpu_limit"),
        _ => ("memory_request", "memory_limit"),
    };
    let req = quantity::parse(request).ok_or_else(|| ManifestError::InvalidQuantity {
        field: request_field,
        value: request.to_string(),
    })?;
    let lim = quantity::parse(limit).ok_or_else(|| ManifestError::InvalidQuantity {
        field: limit_field,
        value: limit.to_string(),
    })?;

    if req > lim {
        return Err(ManifestError::RequestExceedsLimit {
            resource,
            request: request.to_string(),
            limit: limit.to_string(),
        });
    }
    Ok(())
}

/// Check a DNS-1123 label: lowercase alphanumerics and '-', starting and
/// ending with an alphanumeric.
fn validate_label(field: &'static str, value: &str, max_len: usize) -> Result<(), ManifestError> {
    let invalid = |reason: String| ManifestError::InvalidName {
        field,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("must not be empty".to_string()));
    }
    if value.len() > max_len {
        return Err(invalid(format!("must be at most {max_len} characters")));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "may only contain lowercase letters, digits and '-'".to_string(),
        ));
    }
    if value.starts_with('-') || value.ends_with('-') {
        return Err(invalid(
            "must start and end with a letter or digit".to_string(),
        ));
    }
    Ok(())
}
