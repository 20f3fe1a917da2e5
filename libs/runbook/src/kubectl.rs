//! Read-only `kubectl get` verification.

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::tools::ToolRunner;

const KUBECTL: &str = "kubectl";

/// A row of `kubectl get pods` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodRow {
    pub name: String,
    pub ready: String,
    pub status: String,
}

impl PodRow {
    pub fn is_running(&self) -> bool {
        self.status == "Running"
    }
}

/// Parse the default table printed by `kubectl get pods`.
pub fn parse_pods(table: &str) -> Vec<PodRow> {
    table
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let name = cols.next()?;
            let ready = cols.next()?;
            let status = cols.next()?;
            (name != "NAME").then(|| PodRow {
                name: name.to_string(),
                ready: ready.to_string(),
                status: status.to_string(),
            })
        })
        .collect()
}

/// Whether a `kubectl get` table has a row named `name`.
pub fn table_lists(table: &str, name: &str) -> bool {
    table
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|first| first == name)
}

/// What the verification step expects to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyTargets {
    pub namespace: String,
    pub deployment: String,
    /// `None` when the workload has no Service to look for.
    pub service: Option<String>,
    pub keda_namespace: String,
}

/// Raw `kubectl get` output plus the checks derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub deployments: String,
    pub services: String,
    pub keda_pods_output: String,
    pub deployment_listed: bool,
    pub service_listed: bool,
    pub keda_pods: Vec<PodRow>,
}

impl VerifyReport {
    /// Expected deployment and service are listed and every KEDA pod runs.
    pub fn is_satisfied(&self) -> bool {
        self.deployment_listed
            && self.service_listed
            && !self.keda_pods.is_empty()
            && self.keda_pods.iter().all(PodRow::is_running)
    }
}

pub struct Kubectl<'a, R: ?Sized> {
    runner: &'a R,
    context: Option<&'a str>,
}

impl<'a, R: ToolRunner + ?Sized> Kubectl<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            context: None,
        }
    }

    pub fn with_context(mut self, context: &'a str) -> Self {
        self.context = Some(context);
        self
    }

    /// `kubectl get <resource> [-n <namespace>]`, returning the table text.
    pub async fn get(&self, resource: &str, namespace: Option<&str>) -> Result<String> {
        let mut args = vec!["get", resource];
        if let Some(ns) = namespace {
            args.extend(["-n", ns]);
        }
        if let Some(context) = self.context {
            args.extend(["--context", context]);
        }
        self.runner.run_checked(KUBECTL, &args).await
    }

    pub async fn verify(&self, targets: &VerifyTargets) -> Result<VerifyReport> {
        let namespace = Some(targets.namespace.as_str());
        let deployments = self.get("deployments", namespace).await?;
        let services = self.get("services", namespace).await?;
        let keda_pods_output = self
            .get("pods", Some(targets.keda_namespace.as_str()))
            .await?;

        let report = VerifyReport {
            deployment_listed: table_lists(&deployments, &targets.deployment),
            service_listed: targets
                .service
                .as_deref()
                .is_none_or(|service| table_lists(&services, service)),
            keda_pods: parse_pods(&keda_pods_output),
            deployments,
            services,
            keda_pods_output,
        };
        info!(
            deployment_listed = report.deployment_listed,
            service_listed = report.service_listed,
            keda_pods = report.keda_pods.len(),
            "Verification finished"
        );
        Ok(report)
    }
}
