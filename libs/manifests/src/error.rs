//! Error types for manifest validation.

use thiserror::Error;

/// Errors raised while validating a workload or building its manifests.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ManifestError {
    /// A resource name is not a valid DNS-1123 label.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidName {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The container image is empty.
    #[error("container image cannot be empty")]
    EmptyImage,

    /// Replica count is negative.
    #[error("replicas must be non-negative, got {0}")]
    NegativeReplicas(i32),

    /// A port is outside 1..=65535.
    #[error("port {0} is out of range (1-65535)")]
    PortOutOfRange(i32),

    /// The same port was given more than once.
    #[error("port {0} specified multiple times")]
    DuplicatePort(i32),

    /// A resource quantity could not be parsed.
    #[error("invalid quantity '{value}' for {field}")]
    InvalidQuantity { field: &'static str, value: String },

    /// A request exceeds its limit.
    #[error("{resource} request {request} exceeds limit {limit}")]
    RequestExceedsLimit {
        resource: &'static str,
        request: String,
        limit: String,
    },

    /// A Service needs at least one port.
    #[error("workload '{0}' exposes no ports, cannot build a service")]
    NoPorts(String),

    /// Invalid autoscaling parameters.
    #[error("invalid scaling: {0}")]
    InvalidScaling(String),
}

impl ManifestError {
    /// Returns true if the error concerns a resource name.
    pub fn is_name_error(&self) -> bool {
        matches!(self, ManifestError::InvalidName { .. })
    }
}
