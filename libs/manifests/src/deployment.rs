//! Deployment builder.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use crate::error::ManifestError;
use crate::workload::{WorkloadSpec, APP_LABEL};

/// Build the `apps/v1` Deployment for a workload.
pub fn build_deployment(spec: &WorkloadSpec) -> Result<Deployment, ManifestError> {
    spec.validate()?;

    let labels = app_labels(&spec.name);
    let r = &spec.resources;

    let container = Container {
        name: spec.name.clone(),
        image: Some(spec.image.clone()),
        resources: Some(ResourceRequirements {
            requests: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity(r.cpu_request.clone())),
                ("memory".to_string(), Quantity(r.memory_request.clone())),
            ])),
            limits: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity(r.cpu_limit.clone())),
                ("memory".to_string(), Quantity(r.memory_limit.clone())),
            ])),
            ..Default::default()
        }),
        ports: Some(
            spec.ports
                .iter()
                .map(|&port| ContainerPort {
                    container_port: port,
                    ..Default::default()
                })
                .collect(),
        ),
        ..Default::default()
    };

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.namespace.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

pub(crate) fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), name.to_string())])
}
