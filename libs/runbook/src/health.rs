//! Deployment health by UID.

use std::fmt;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cluster::ClusterApi;
use crate::error::{Result, RunbookError};

/// Health of a deployment as seen from its replica counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeploymentHealth {
    Healthy,
    Unhealthy,
    #[serde(rename = "Not Found")]
    NotFound,
}

impl DeploymentHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentHealth::Healthy => "Healthy",
            DeploymentHealth::Unhealthy => "Unhealthy",
            DeploymentHealth::NotFound => "Not Found",
        }
    }
}

impl fmt::Display for DeploymentHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Healthy iff ready replicas equal desired replicas, both defaulting to 0.
pub fn evaluate(status: Option<&DeploymentStatus>) -> DeploymentHealth {
    let (ready, replicas) = replica_counts(status);
    if ready == replicas {
        DeploymentHealth::Healthy
    } else {
        DeploymentHealth::Unhealthy
    }
}

fn replica_counts(status: Option<&DeploymentStatus>) -> (i32, i32) {
    let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
    let replicas = status.and_then(|s| s.replicas).unwrap_or(0);
    (ready, replicas)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub uid: String,
    pub namespace: String,
    /// Deployment name, when found.
    pub name: Option<String>,
    pub health: DeploymentHealth,
    pub ready_replicas: i32,
    pub replicas: i32,
}

/// Whether the controller has finished rolling out the deployment: the
/// status exists, reflects the current generation and every desired
/// replica is ready. Unlike [`evaluate`], a missing status is not done.
pub fn rollout_complete(deployment: &Deployment) -> bool {
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };
    if let Some(generation) = deployment.metadata.generation {
        if status.observed_generation.unwrap_or(0) < generation {
            return false;
        }
    }
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    status.ready_replicas.unwrap_or(0) >= desired
}

async fn find_deployment<C: ClusterApi + ?Sized>(
    cluster: &C,
    uid: &str,
    namespace: &str,
) -> Result<Option<Deployment>> {
    let deployments = cluster.list_deployments(namespace).await?;
    Ok(deployments
        .into_iter()
        .find(|d| d.metadata.uid.as_deref() == Some(uid)))
}

fn build_report(uid: &str, namespace: &str, found: Option<&Deployment>) -> HealthReport {
    match found {
        Some(deployment) => {
            let status = deployment.status.as_ref();
            let (ready_replicas, replicas) = replica_counts(status);
            HealthReport {
                uid: uid.to_string(),
                namespace: namespace.to_string(),
                name: deployment.metadata.name.clone(),
                health: evaluate(status),
                ready_replicas,
                replicas,
            }
        }
        None => HealthReport {
            uid: uid.to_string(),
            namespace: namespace.to_string(),
            name: None,
            health: DeploymentHealth::NotFound,
            ready_replicas: 0,
            replicas: 0,
        },
    }
}

/// Look up a deployment by UID in `namespace` and evaluate its health.
pub async fn deployment_health<C: ClusterApi + ?Sized>(
    cluster: &C,
    uid: &str,
    namespace: &str,
) -> Result<HealthReport> {
    let found = find_deployment(cluster, uid, namespace).await?;
    let report = build_report(uid, namespace, found.as_ref());

    info!(
        uid,
        name = report.name.as_deref().unwrap_or("-"),
        health = %report.health,
        "Deployment health"
    );
    Ok(report)
}

/// Poll every `interval` until the rollout is complete or `timeout`
/// elapses.
///
/// A deployment that is not found is returned immediately: a UID never
/// comes back once gone. A deployment whose rollout has not completed
/// counts as Unhealthy here even when [`evaluate`] would say Healthy.
pub async fn wait_for_healthy<C: ClusterApi + ?Sized>(
    cluster: &C,
    uid: &str,
    namespace: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<HealthReport> {
    let started = Instant::now();

    loop {
        let found = find_deployment(cluster, uid, namespace).await?;
        let mut report = build_report(uid, namespace, found.as_ref());
        match found.as_ref() {
            None => return Ok(report),
            Some(deployment) if rollout_complete(deployment) => {
                report.health = DeploymentHealth::Healthy;
                info!(uid, name = report.name.as_deref().unwrap_or("-"), "Deployment rolled out");
                return Ok(report);
            }
            Some(_) => report.health = DeploymentHealth::Unhealthy,
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(RunbookError::Timeout {
                resource: format!("deployment {uid}"),
                elapsed,
                last: report.health,
            });
        }

        debug!(
            uid,
            ready = report.ready_replicas,
            desired = report.replicas,
            "Deployment not ready yet"
        );
        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}
