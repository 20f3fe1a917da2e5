//! End-to-end runbook flow against scripted tools and an in-memory cluster.
//!
//! Mirrors a first run on a fresh laptop:
//! 1. minikube is stopped and gets started
//! 2. helm is present, KEDA chart is installed
//! 3. the example workload is created and its health checked

use std::sync::Arc;
use std::time::Duration;

use minikeda_manifests::WorkloadSpec;
use minikeda_runbook::health::{deployment_health, wait_for_healthy};
use minikeda_runbook::{
    ClusterApi, DeploymentHealth, HelmStatus, MockCluster, MockRunner, Runbook, RunbookConfig,
    RunbookError, StartOutcome, Tool, ToolOutput, WorkloadPlan,
};

const STOPPED: &str = "minikube\ntype: Control Plane\nhost: Stopped\nkubelet: Stopped\napiserver: Stopped\n";
const RUNNING: &str = "minikube\ntype: Control Plane\nhost: Running\nkubelet: Running\napiserver: Running\n";
const KEDA_PODS: &str = "NAME READY STATUS RESTARTS AGE\nkeda-operator-7c9f6d7d5-fghij 1/1 Running 0 1m\n";

fn fresh_machine() -> MockRunner {
    machine_without_helm().respond("helm version", ToolOutput::ok("v3.16.2+g13654a5"))
}

fn machine_without_helm() -> MockRunner {
    MockRunner::new()
        .respond("docker --version", ToolOutput::ok("Docker version 27.3.1"))
        .respond("minikube version", ToolOutput::ok("v1.34.0"))
        .respond("kubectl version", ToolOutput::ok("Client Version: v1.31.2"))
        .respond("minikube status", ToolOutput::failed(7, "").with_stdout(STOPPED))
        .respond("kubectl get pods -n keda", ToolOutput::ok(KEDA_PODS))
        .respond(
            "kubectl get deployments",
            ToolOutput::ok("NAME READY UP-TO-DATE AVAILABLE AGE\nexample-deployment 1/1 1 1 5s\n"),
        )
        .respond(
            "kubectl get services",
            ToolOutput::ok("NAME TYPE CLUSTER-IP\nexample-deployment-service ClusterIP 10.96.0.12\n"),
        )
}

fn mock_cluster() -> Arc<MockCluster> {
    Arc::new(MockCluster::new())
}

#[tokio::test]
async fn test_up_runs_every_step_in_order() {
    let runbook = Runbook::new(fresh_machine(), RunbookConfig::default());
    let cluster = mock_cluster();

    let report = runbook
        .up(
            || {
                let cluster = Arc::clone(&cluster);
                async move { Ok::<_, RunbookError>(cluster) }
            },
            &WorkloadPlan::example(),
        )
        .await
        .unwrap();

    assert_eq!(report.cluster, StartOutcome::Started);
    assert_eq!(report.helm.version(), "v3.16.2+g13654a5");
    assert!(report.keda_pods.contains("keda-operator"));
    assert!(report.prerequisites.iter().all(|c| c.available));

    let health = report.health.expect("health checked");
    assert_eq!(health.health, DeploymentHealth::Healthy);
    assert_eq!(health.name.as_deref(), Some("example-deployment"));

    assert!(report.verify.is_satisfied());

    assert_eq!(cluster.deployments().len(), 1);
    assert_eq!(cluster.services().len(), 1);
    assert_eq!(cluster.scaled_objects().len(), 1);

    let calls: Vec<String> = runbook
        .runner()
        .calls()
        .into_iter()
        .filter(|c| !c.contains("version"))
        .collect();
    assert_eq!(
        calls,
        vec![
            "minikube status",
            "minikube start",
            "helm repo add kedacore https://kedacore.github.io/charts",
            "helm repo update",
            "helm upgrade --install keda kedacore/keda --namespace keda --create-namespace --wait --timeout 5m0s --kube-context minikube",
            "kubectl get pods -n keda --context minikube",
            "kubectl get deployments -n default --context minikube",
            "kubectl get services -n default --context minikube",
            "kubectl get pods -n keda --context minikube",
        ]
    );
}

#[tokio::test]
async fn test_up_skips_start_when_running() {
    let runner = MockRunner::new()
        .respond("minikube status", ToolOutput::ok(RUNNING))
        .respond("kubectl get pods", ToolOutput::ok(KEDA_PODS));
    let runbook = Runbook::new(runner, RunbookConfig::default());

    let report = runbook
        .up(|| async { Ok::<_, RunbookError>(MockCluster::new()) }, &WorkloadPlan::example())
        .await
        .unwrap();

    assert_eq!(report.cluster, StartOutcome::AlreadyRunning);
    assert!(!runbook.runner().was_called("minikube start"));
}

#[tokio::test]
async fn test_up_aborts_when_helm_missing() {
    let runner = fresh_machine().missing("helm");
    let runbook = Runbook::new(runner, RunbookConfig::default());
    let cluster = mock_cluster();

    let err = runbook
        .up(
            || {
                let cluster = Arc::clone(&cluster);
                async move { Ok::<_, RunbookError>(cluster) }
            },
            &WorkloadPlan::example(),
        )
        .await
        .unwrap_err();

    assert!(err.is_tool_missing());
    assert!(!runbook.runner().was_called("helm repo add"));
    assert!(cluster.deployments().is_empty());
}

#[tokio::test]
async fn test_up_installs_helm_when_allowed() {
    // Absent for the prerequisite probe and the first check, present after
    // the installer ran.
    let runner = machine_without_helm()
        .respond_missing("helm version")
        .respond_missing("helm version")
        .respond("helm version", ToolOutput::ok("v3.16.2+g13654a5"));
    let config = RunbookConfig {
        install_helm: true,
        ..RunbookConfig::default()
    };
    let runbook = Runbook::new(runner, config);

    let report = runbook
        .up(
            || async { Ok::<_, RunbookError>(MockCluster::new()) },
            &WorkloadPlan::example(),
        )
        .await
        .unwrap();

    let helm_check = report
        .prerequisites
        .iter()
        .find(|c| c.tool == Tool::Helm)
        .unwrap();
    assert!(!helm_check.available);
    assert_eq!(report.helm, HelmStatus::Installed("v3.16.2+g13654a5".to_string()));
    assert!(runbook.runner().was_called("sh -c curl -fsSL"));
    assert!(runbook.runner().was_called("helm upgrade --install keda"));
}

#[tokio::test]
async fn test_up_aborts_when_keda_install_fails() {
    let runner = fresh_machine().respond(
        "helm upgrade",
        ToolOutput::failed(1, "Error: Kubernetes cluster unreachable"),
    );
    let runbook = Runbook::new(runner, RunbookConfig::default());
    let cluster = mock_cluster();

    let err = runbook
        .up(
            || {
                let cluster = Arc::clone(&cluster);
                async move { Ok::<_, RunbookError>(cluster) }
            },
            &WorkloadPlan::example(),
        )
        .await
        .unwrap_err();

    match err {
        RunbookError::CommandFailed { command, stderr, .. } => {
            assert!(command.starts_with("helm upgrade --install keda"));
            assert_eq!(stderr, "Error: Kubernetes cluster unreachable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!runbook.runner().was_called("kubectl get pods"));
    assert!(cluster.deployments().is_empty());
}

#[tokio::test]
async fn test_second_deploy_reports_conflict() {
    let runbook = Runbook::new(MockRunner::new(), RunbookConfig::default());
    let cluster = MockCluster::new();
    let plan = WorkloadPlan::example();

    runbook.deploy_workload(&cluster, &plan).await.unwrap();
    let err = runbook.deploy_workload(&cluster, &plan).await.unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_health_by_uid() {
    let runbook = Runbook::new(MockRunner::new(), RunbookConfig::default());
    let cluster = MockCluster::new();
    let plan = WorkloadPlan::new(
        WorkloadSpec::new("api", "nginx:latest")
            .with_ports([8080])
            .with_replicas(2),
    );

    let report = runbook.deploy_workload(&cluster, &plan).await.unwrap();
    let uid = report.deployment_uid().unwrap().to_string();

    cluster.set_deployment_status("api", 1, 2);
    let health = deployment_health(&cluster, &uid, "default").await.unwrap();
    assert_eq!(health.health, DeploymentHealth::Unhealthy);
    assert_eq!((health.ready_replicas, health.replicas), (1, 2));

    cluster.set_deployment_status("api", 2, 2);
    let health = deployment_health(&cluster, &uid, "default").await.unwrap();
    assert_eq!(health.health, DeploymentHealth::Healthy);

    let missing = deployment_health(&cluster, "no-such-uid", "default")
        .await
        .unwrap();
    assert_eq!(missing.health, DeploymentHealth::NotFound);

    let other_ns = deployment_health(&cluster, &uid, "kube-system").await.unwrap();
    assert_eq!(other_ns.health, DeploymentHealth::NotFound);
}

#[tokio::test]
async fn test_wait_for_healthy_times_out() {
    let cluster = MockCluster::new();
    let runbook = Runbook::new(MockRunner::new(), RunbookConfig::default());
    let report = runbook
        .deploy_workload(&cluster, &WorkloadPlan::example())
        .await
        .unwrap();
    cluster.set_deployment_status("example-deployment", 0, 1);

    let err = wait_for_healthy(
        &cluster,
        report.deployment_uid().unwrap(),
        "default",
        Duration::from_millis(30),
        Duration::from_millis(10),
    )
    .await
    .unwrap_err();

    match err {
        RunbookError::Timeout { last, .. } => assert_eq!(last, DeploymentHealth::Unhealthy),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_wait_for_healthy_ignores_fresh_deployment_without_status() {
    let cluster = MockCluster::new();
    let runbook = Runbook::new(MockRunner::new(), RunbookConfig::default());
    let plan = WorkloadPlan::new(
        WorkloadSpec::new("api", "nginx:latest")
            .with_ports([80])
            .with_replicas(3),
    );
    let report = runbook.deploy_workload(&cluster, &plan).await.unwrap();
    let uid = report.deployment_uid().unwrap().to_string();

    // A single check reads the missing status as 0/0.
    let single = deployment_health(&cluster, &uid, "default").await.unwrap();
    assert_eq!(single.health, DeploymentHealth::Healthy);

    let err = wait_for_healthy(
        &cluster,
        &uid,
        "default",
        Duration::from_millis(30),
        Duration::from_millis(10),
    )
    .await
    .unwrap_err();
    match err {
        RunbookError::Timeout { last, .. } => assert_eq!(last, DeploymentHealth::Unhealthy),
        other => panic!("unexpected error: {other}"),
    }

    cluster.set_deployment_status("api", 3, 3);
    let ready = wait_for_healthy(
        &cluster,
        &uid,
        "default",
        Duration::from_millis(30),
        Duration::from_millis(10),
    )
    .await
    .unwrap();
    assert_eq!(ready.health, DeploymentHealth::Healthy);
    assert_eq!((ready.ready_replicas, ready.replicas), (3, 3));
}

#[tokio::test]
async fn test_wait_for_healthy_returns_not_found_immediately() {
    let cluster = MockCluster::new();
    let report = wait_for_healthy(
        &cluster,
        "gone",
        "default",
        Duration::from_secs(60),
        Duration::from_secs(1),
    )
    .await
    .unwrap();
    assert_eq!(report.health, DeploymentHealth::NotFound);
}

#[tokio::test]
async fn test_cluster_api_through_arc() {
    let cluster: Arc<dyn ClusterApi> = Arc::new(MockCluster::new());
    assert!(cluster.list_deployments("default").await.unwrap().is_empty());
}
