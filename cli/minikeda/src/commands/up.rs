//! Up command - run the whole runbook end to end.

use anyhow::Result;
use clap::Args;
use minikeda_runbook::{DeploymentHealth, HelmStatus, KubeCluster, StartOutcome, UpReport};

use crate::error::CliError;
use crate::output::{
    print_output, print_section, print_single, print_success, print_warning, OutputFormat,
};

use super::deploy::{next_steps, resource_rows};
use super::prereqs::ToolRow;
use super::workload::WorkloadArgs;
use super::CommandContext;

#[derive(Debug, Args)]
pub struct UpCommand {
    #[command(flatten)]
    workload: WorkloadArgs,

    /// Install Helm with the official script if it is missing.
    #[arg(long)]
    install_helm: bool,
}

fn cluster_line(outcome: StartOutcome) -> &'static str {
    match outcome {
        StartOutcome::AlreadyRunning => "Minikube already running",
        StartOutcome::Started => "Minikube started",
    }
}

fn helm_line(status: &HelmStatus) -> String {
    match status {
        HelmStatus::AlreadyInstalled(v) => format!("Helm {v} found"),
        HelmStatus::Installed(v) => format!("Helm {v} installed"),
    }
}

fn print_report(report: &UpReport, keda_namespace: &str) {
    let rows: Vec<ToolRow> = report.prerequisites.iter().map(ToolRow::from).collect();
    print_output(&rows, OutputFormat::Table);

    print_success(cluster_line(report.cluster));
    print_success(&helm_line(&report.helm));
    print_section(
        &format!("kubectl get pods -n {keda_namespace}"),
        &report.keda_pods,
    );

    print_output(&resource_rows(&report.deploy), OutputFormat::Table);

    if let Some(health) = &report.health {
        let line = format!(
            "Deployment {} health status: {} ({}/{} ready)",
            report.deploy.deployment.name, health.health, health.ready_replicas, health.replicas
        );
        if health.health == DeploymentHealth::Healthy {
            print_success(&line);
        } else {
            print_warning(&line);
        }
    }

    print_section("kubectl get deployments", &report.verify.deployments);
    print_section("kubectl get services", &report.verify.services);

    println!();
    for step in next_steps(&report.deploy) {
        println!("{}: {}", step.label, step.cmd);
    }
}

impl UpCommand {
    pub async fn run(self, mut ctx: CommandContext) -> Result<()> {
        ctx.config.runbook.install_helm |= self.install_helm;
        let plan = self.workload.into_plan();
        let runbook = ctx.runbook();
        let context = ctx.config.runbook.kube_context.clone();

        let report = runbook
            .up(|| KubeCluster::connect(&context), &plan)
            .await?;

        match ctx.format {
            OutputFormat::Json => print_single(&report),
            OutputFormat::Table => print_report(&report, &runbook.config().keda.namespace),
        }

        if let Some(health) = &report.health {
            if plan.wait.is_some() && health.health != DeploymentHealth::Healthy {
                return Err(CliError::Unhealthy {
                    name: report.deploy.deployment.name.clone(),
                    health: health.health.to_string(),
                }
                .into());
            }
        }
        if !report.verify.is_satisfied() {
            return Err(CliError::VerificationFailed(
                "kubectl listings do not show the expected resources".to_string(),
            )
            .into());
        }

        if ctx.format == OutputFormat::Table {
            print_success("Runbook complete");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helm_line_mentions_version() {
        assert_eq!(
            helm_line(&HelmStatus::Installed("v3.16.2".to_string())),
            "Helm v3.16.2 installed"
        );
        assert_eq!(
            helm_line(&HelmStatus::AlreadyInstalled("v3.15.0".to_string())),
            "Helm v3.15.0 found"
        );
    }

    #[test]
    fn cluster_line_reflects_outcome() {
        assert_eq!(cluster_line(StartOutcome::Started), "Minikube started");
        assert_eq!(
            cluster_line(StartOutcome::AlreadyRunning),
            "Minikube already running"
        );
    }
}
