//! Workload flags shared by `deploy` and `up`.

use std::time::Duration;

use clap::Args;
use minikeda_manifests::{ResourceSpec, ScalingSpec, ServiceType, WorkloadSpec};
use minikeda_runbook::WorkloadPlan;

#[derive(Debug, Clone, Args)]
pub struct WorkloadArgs {
    /// Deployment name (the service is `<name>-service`).
    #[arg(long, default_value = "example-deployment")]
    pub name: String,

    /// Container image.
    #[arg(long, default_value = "nginx:latest")]
    pub image: String,

    /// Target namespace.
    #[arg(long, short = 'n', default_value = "default")]
    pub namespace: String,

    #[arg(long, default_value_t = 1)]
    pub replicas: i32,

    /// Container port, also published by the service. Repeatable.
    #[arg(long = "port", default_values_t = [80], conflicts_with = "no_ports")]
    pub ports: Vec<i32>,

    /// Expose no ports and create no service.
    #[arg(long)]
    pub no_ports: bool,

    #[arg(long, default_value = "100m")]
    pub cpu_request: String,

    #[arg(long, default_value = "200m")]
    pub cpu_limit: String,

    #[arg(long, default_value = "128Mi")]
    pub memory_request: String,

    #[arg(long, default_value = "256Mi")]
    pub memory_limit: String,

    /// Service type (ClusterIP, NodePort, LoadBalancer).
    #[arg(long, default_value = "ClusterIP")]
    pub service_type: ServiceType,

    /// KEDA trigger type.
    #[arg(long, default_value = "cpu")]
    pub trigger: String,

    /// Trigger target value.
    #[arg(long, default_value_t = 50)]
    pub threshold: u32,

    #[arg(long)]
    pub min_replicas: Option<i32>,

    #[arg(long)]
    pub max_replicas: Option<i32>,

    /// Do not create a ScaledObject.
    #[arg(long)]
    pub no_scale: bool,

    /// Wait up to this many seconds for the deployment to become healthy.
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,
}

impl WorkloadArgs {
    pub fn into_plan(self) -> WorkloadPlan {
        let ports = if self.no_ports { Vec::new() } else { self.ports };

        let workload = WorkloadSpec::new(self.name, self.image)
            .with_namespace(self.namespace)
            .with_replicas(self.replicas)
            .with_ports(ports)
            .with_service_type(self.service_type)
            .with_resources(ResourceSpec {
                cpu_request: self.cpu_request,
                cpu_limit: self.cpu_limit,
                memory_request: self.memory_request,
                memory_limit: self.memory_limit,
            });

        let scaling = (!self.no_scale).then(|| ScalingSpec {
            trigger: self.trigger,
            threshold: self.threshold,
            min_replicas: self.min_replicas,
            max_replicas: self.max_replicas,
        });

        WorkloadPlan {
            workload,
            scaling,
            wait: self.wait.map(Duration::from_secs),
        }
    }
}
