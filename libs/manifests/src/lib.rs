//! # minikeda-manifests
//!
//! Builders for the Kubernetes objects minikeda creates on a local cluster.
//!
//! ## Objects
//!
//! - `Deployment` (`apps/v1`): one container, labelled `app=<name>`
//! - `Service` (`v1`): `<name>-service`, selecting `app=<name>`
//! - `ScaledObject` (`keda.sh/v1alpha1`): `<name>-scaledobject`, targeting the deployment
//!
//! All builders are pure. They validate the [`WorkloadSpec`] first and never
//! touch the network.

mod deployment;
mod error;
mod quantity;
mod scaled_object;
mod service;
mod workload;

pub use deployment::build_deployment;
pub use error::ManifestError;
pub use quantity::parse_quantity;
pub use scaled_object::{
    build_scaled_object, scaled_object_name, ScaleTargetRef, ScaleTrigger, ScaledObject,
    ScaledObjectSpec, ScalingSpec,
};
pub use service::{build_service, service_name};
pub use workload::{ResourceSpec, ServiceType, WorkloadSpec, APP_LABEL};

/// Re-export of the Kubernetes API types the builders produce.
pub use k8s_openapi;
