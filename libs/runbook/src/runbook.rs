//! Sequential runbook orchestration.

use std::future::Future;
use std::time::Duration;

use minikeda_manifests::{
    build_deployment, build_scaled_object, build_service, service_name, ScalingSpec, WorkloadSpec,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cluster::{ClusterApi, CreatedResource};
use crate::error::Result;
use crate::health::{self, HealthReport};
use crate::helm::{Helm, HelmStatus, KedaChart};
use crate::kubectl::{Kubectl, VerifyReport, VerifyTargets};
use crate::minikube::{ClusterState, Minikube, StartOutcome};
use crate::tools::{self, ToolCheck, ToolRunner};

/// Interval between health polls.
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Environment-level settings for the runbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunbookConfig {
    /// Kubeconfig context used for the API client, helm and kubectl.
    pub kube_context: String,

    /// `minikube start --driver` value; minikube picks one when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minikube_driver: Option<String>,

    /// Run the official installer when helm is missing.
    pub install_helm: bool,

    pub keda: KedaChart,
}

impl Default for RunbookConfig {
    fn default() -> Self {
        Self {
            kube_context: "minikube".to_string(),
            minikube_driver: None,
            install_helm: false,
            keda: KedaChart::default(),
        }
    }
}

/// A workload plus how to scale it and whether to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadPlan {
    pub workload: WorkloadSpec,
    /// `None` skips the ScaledObject.
    pub scaling: Option<ScalingSpec>,
    /// Poll health up to this long after creation; single check when `None`.
    pub wait: Option<Duration>,
}

impl WorkloadPlan {
    pub fn new(workload: WorkloadSpec) -> Self {
        Self {
            workload,
            scaling: Some(ScalingSpec::default()),
            wait: None,
        }
    }

    /// nginx on port 80, scaled on CPU at 50.
    pub fn example() -> Self {
        Self::new(WorkloadSpec::new("example-deployment", "nginx:latest").with_ports([80]))
    }

    pub fn verify_targets(&self, keda_namespace: &str) -> VerifyTargets {
        VerifyTargets {
            namespace: self.workload.namespace.clone(),
            deployment: self.workload.name.clone(),
            service: (!self.workload.ports.is_empty()).then(|| service_name(&self.workload.name)),
            keda_namespace: keda_namespace.to_string(),
        }
    }
}

/// Objects created for a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub deployment: CreatedResource,
    pub service: Option<CreatedResource>,
    pub scaled_object: Option<CreatedResource>,
}

impl DeployReport {
    pub fn deployment_uid(&self) -> Option<&str> {
        self.deployment.uid.as_deref()
    }
}

/// Everything `up` did, in order.
#[derive(Debug, Clone, Serialize)]
pub struct UpReport {
    pub prerequisites: Vec<ToolCheck>,
    pub cluster: StartOutcome,
    pub helm: HelmStatus,
    pub keda_pods: String,
    pub deploy: DeployReport,
    pub health: Option<HealthReport>,
    pub verify: VerifyReport,
}

pub struct Runbook<R> {
    runner: R,
    config: RunbookConfig,
}

impl<R: ToolRunner> Runbook<R> {
    pub fn new(runner: R, config: RunbookConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &RunbookConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn minikube(&self) -> Minikube<'_, R> {
        Minikube::new(&self.runner)
    }

    fn helm(&self) -> Helm<'_, R> {
        Helm::new(&self.runner).with_kube_context(&self.config.kube_context)
    }

    fn kubectl(&self) -> Kubectl<'_, R> {
        Kubectl::new(&self.runner).with_context(&self.config.kube_context)
    }

    pub async fn check_prerequisites(&self) -> Result<Vec<ToolCheck>> {
        info!("Checking prerequisites");
        let checks = tools::check_prerequisites(&self.runner).await?;
        for check in checks.iter().filter(|c| !c.available) {
            warn!(tool = %check.tool, "Prerequisite not available");
        }
        Ok(checks)
    }

    pub async fn cluster_status(&self) -> Result<ClusterState> {
        self.minikube().status().await
    }

    pub async fn ensure_cluster(&self) -> Result<StartOutcome> {
        info!("Ensuring Minikube is running");
        self.minikube()
            .ensure_running(self.config.minikube_driver.as_deref())
            .await
    }

    pub async fn ensure_helm(&self) -> Result<HelmStatus> {
        info!("Checking Helm");
        self.helm().ensure_installed(self.config.install_helm).await
    }

    /// Add the chart repo, refresh it and install the KEDA release.
    pub async fn install_keda(&self) -> Result<()> {
        let chart = &self.config.keda;
        let helm = self.helm();
        helm.add_repo(&chart.repo_name, &chart.repo_url).await?;
        helm.update_repos().await?;
        helm.install_keda(chart).await?;
        info!(namespace = %chart.namespace, "KEDA installed");
        Ok(())
    }

    /// `kubectl get pods -n <keda namespace>`.
    pub async fn verify_keda(&self) -> Result<String> {
        info!("Verifying KEDA installation");
        self.kubectl()
            .get("pods", Some(self.config.keda.namespace.as_str()))
            .await
    }

    /// Build every manifest first, then create them one after another.
    pub async fn deploy_workload<C: ClusterApi + ?Sized>(
        &self,
        cluster: &C,
        plan: &WorkloadPlan,
    ) -> Result<DeployReport> {
        let workload = &plan.workload;
        let deployment = build_deployment(workload)?;
        let service = if workload.ports.is_empty() {
            warn!(name = %workload.name, "Workload has no ports, skipping service");
            None
        } else {
            Some(build_service(workload)?)
        };
        let scaled_object = plan
            .scaling
            .as_ref()
            .map(|scaling| build_scaled_object(workload, scaling))
            .transpose()?;

        info!(name = %workload.name, namespace = %workload.namespace, image = %workload.image, "Creating workload");
        let deployment = cluster.create_deployment(&deployment).await?;

        let service = match service {
            Some(service) => Some(cluster.create_service(&service).await?),
            None => None,
        };
        let scaled_object = match scaled_object {
            Some(so) => Some(cluster.create_scaled_object(&so).await?),
            None => None,
        };

        Ok(DeployReport {
            deployment,
            service,
            scaled_object,
        })
    }

    /// Health of a created deployment, polling when the plan asks to wait.
    pub async fn check_health<C: ClusterApi + ?Sized>(
        &self,
        cluster: &C,
        uid: &str,
        namespace: &str,
        wait: Option<Duration>,
    ) -> Result<HealthReport> {
        match wait {
            Some(timeout) => {
                health::wait_for_healthy(cluster, uid, namespace, timeout, HEALTH_POLL_INTERVAL)
                    .await
            }
            None => health::deployment_health(cluster, uid, namespace).await,
        }
    }

    pub async fn verify(&self, targets: &VerifyTargets) -> Result<VerifyReport> {
        info!("Verifying cluster state");
        self.kubectl().verify(targets).await
    }

    pub async fn expose(&self, service: &str, namespace: &str) -> Result<Vec<String>> {
        info!(service, namespace, "Exposing service");
        self.minikube().service_url(service, namespace).await
    }

    /// Run every step in order: cluster, client, helm, KEDA, workload,
    /// health, `kubectl get` verification.
    ///
    /// `connect` is only called once the cluster is running.
    pub async fn up<C, F, Fut>(&self, connect: F, plan: &WorkloadPlan) -> Result<UpReport>
    where
        C: ClusterApi,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C>>,
    {
        let prerequisites = self.check_prerequisites().await?;
        let cluster_outcome = self.ensure_cluster().await?;
        let cluster = connect().await?;
        let helm = self.ensure_helm().await?;
        self.install_keda().await?;
        let keda_pods = self.verify_keda().await?;

        let deploy = self.deploy_workload(&cluster, plan).await?;
        let health = match deploy.deployment_uid() {
            Some(uid) => Some(
                self.check_health(&cluster, uid, &plan.workload.namespace, plan.wait)
                    .await?,
            ),
            None => {
                warn!("API server returned no UID for the deployment, skipping health check");
                None
            }
        };

        let verify = self
            .verify(&plan.verify_targets(&self.config.keda.namespace))
            .await?;

        Ok(UpReport {
            prerequisites,
            cluster: cluster_outcome,
            helm,
            keda_pods,
            deploy,
            health,
            verify,
        })
    }
}
