//! Minikube wrapper.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::tools::ToolRunner;

const MINIKUBE: &str = "minikube";

/// Components reported by `minikube status` that must all be running.
const COMPONENTS: [&str; 3] = ["host", "kubelet", "apiserver"];

/// Local cluster state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum ClusterState {
    Running,
    /// Not (fully) running, with the first offending component.
    Stopped(String),
}

impl ClusterState {
    pub fn is_running(&self) -> bool {
        matches!(self, ClusterState::Running)
    }
}

/// What `ensure_running` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    AlreadyRunning,
    Started,
}

/// Parse the text printed by `minikube status`.
pub fn parse_status(output: &str) -> ClusterState {
    let components: Vec<(&str, &str)> = output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| COMPONENTS.contains(key))
        .collect();

    if components.is_empty() {
        return if output.contains("Running") {
            ClusterState::Running
        } else {
            ClusterState::Stopped(output.trim().to_string())
        };
    }

    match components.iter().find(|(_, value)| *value != "Running") {
        None => ClusterState::Running,
        Some((key, value)) => ClusterState::Stopped(format!("{key}: {value}")),
    }
}

pub struct Minikube<'a, R: ?Sized> {
    runner: &'a R,
}

impl<'a, R: ToolRunner + ?Sized> Minikube<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Query the cluster state.
    ///
    /// `minikube status` exits non-zero for a stopped or missing cluster;
    /// that is reported as [`ClusterState::Stopped`], not as an error.
    pub async fn status(&self) -> Result<ClusterState> {
        let output = self.runner.run(MINIKUBE, &["status"]).await?;
        let state = parse_status(&output.stdout);

        if output.success() {
            return Ok(state);
        }

        let state = match state {
            ClusterState::Stopped(detail) if !detail.is_empty() => ClusterState::Stopped(detail),
            _ => {
                let stderr = output.stderr.trim();
                ClusterState::Stopped(if stderr.is_empty() {
                    format!("minikube status exited with {:?}", output.code)
                } else {
                    stderr.lines().next().unwrap_or(stderr).to_string()
                })
            }
        };
        Ok(state)
    }

    /// `minikube start`, optionally with a driver.
    pub async fn start(&self, driver: Option<&str>) -> Result<()> {
        let driver_flag = driver.map(|d| format!("--driver={d}"));
        let mut args = vec!["start"];
        if let Some(flag) = driver_flag.as_deref() {
            args.push(flag);
        }
        self.runner.run_checked(MINIKUBE, &args).await?;
        Ok(())
    }

    /// Start the cluster unless it is already running.
    pub async fn ensure_running(&self, driver: Option<&str>) -> Result<StartOutcome> {
        match self.status().await? {
            ClusterState::Running => {
                info!("Minikube is already running");
                Ok(StartOutcome::AlreadyRunning)
            }
            ClusterState::Stopped(detail) => {
                info!(%detail, driver = driver.unwrap_or("default"), "Starting Minikube");
                self.start(driver).await?;
                Ok(StartOutcome::Started)
            }
        }
    }

    /// URLs for a service via `minikube service --url`.
    pub async fn service_url(&self, service: &str, namespace: &str) -> Result<Vec<String>> {
        let stdout = self
            .runner
            .run_checked(MINIKUBE, &["service", service, "-n", namespace, "--url"])
            .await?;
        let urls: Vec<String> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| line.contains("://"))
            .map(str::to_string)
            .collect();
        if urls.is_empty() {
            warn!(service, namespace, "minikube returned no service URL");
        }
        Ok(urls)
    }
}
