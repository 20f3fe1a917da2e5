//! Service builder.

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::deployment::app_labels;
use crate::error::ManifestError;
use crate::workload::WorkloadSpec;

/// Name of the Service fronting a workload.
pub fn service_name(workload: &str) -> String {
    format!("{workload}-service")
}

/// Build the `v1` Service selecting the workload's pods.
///
/// Every container port is published with `port == targetPort`.
pub fn build_service(spec: &WorkloadSpec) -> Result<Service, ManifestError> {
    spec.validate()?;

    if spec.ports.is_empty() {
        return Err(ManifestError::NoPorts(spec.name.clone()));
    }

    let ports = spec
        .ports
        .iter()
        .map(|&port| ServicePort {
            port,
            target_port: Some(IntOrString::Int(port)),
            ..Default::default()
        })
        .collect();

    Ok(Service {
        metadata: ObjectMeta {
            name: Some(service_name(&spec.name)),
            namespace: Some(spec.namespace.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(app_labels(&spec.name)),
            ports: Some(ports),
            type_: Some(spec.service_type.as_str().to_string()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::ServiceType;
    use serde_json::json;

    #[test]
    fn service_selects_app_and_mirrors_ports() {
        let spec = WorkloadSpec::new("example-deployment", "nginx:latest").with_ports([80, 443]);
        let value = serde_json::to_value(build_service(&spec).unwrap()).unwrap();

        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "Service");
        assert_eq!(value["metadata"]["name"], "example-deployment-service");
        assert_eq!(value["metadata"]["namespace"], "default");
        assert_eq!(
            value["spec"],
            json!({
                "selector": { "app": "example-deployment" },
                "ports": [
                    { "port": 80, "targetPort": 80 },
                    { "port": 443, "targetPort": 443 }
                ],
                "type": "ClusterIP"
            })
        );
    }

    #[test]
    fn node_port_type_is_carried() {
        let spec = WorkloadSpec::new("web", "nginx")
            .with_ports([8080])
            .with_service_type(ServiceType::NodePort);
        let service = build_service(&spec).unwrap();
        assert_eq!(service.spec.unwrap().type_.as_deref(), Some("NodePort"));
    }

    #[test]
    fn workload_without_ports_has_no_service() {
        let spec = WorkloadSpec::new("worker", "busybox");
        assert_eq!(
            build_service(&spec),
            Err(ManifestError::NoPorts("worker".to_string()))
        );
    }
}
