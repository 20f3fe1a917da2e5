//! Verify command - read-only `kubectl get` checks.

use anyhow::Result;
use clap::Args;
use minikeda_manifests::service_name;
use minikeda_runbook::VerifyTargets;

use crate::error::CliError;
use crate::output::{print_section, print_single, print_success, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Deployment expected in the listing.
    #[arg(long, default_value = "example-deployment")]
    name: String,

    /// Namespace of the deployment and service.
    #[arg(long, short = 'n', default_value = "default")]
    namespace: String,

    /// Do not expect a service for the deployment.
    #[arg(long)]
    no_service: bool,
}

impl VerifyCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let runbook = ctx.runbook();
        let targets = VerifyTargets {
            service: (!self.no_service).then(|| service_name(&self.name)),
            deployment: self.name,
            namespace: self.namespace,
            keda_namespace: runbook.config().keda.namespace.clone(),
        };

        let report = runbook.verify(&targets).await?;

        match ctx.format {
            OutputFormat::Json => print_single(&serde_json::json!({
                "targets": targets,
                "report": report,
                "satisfied": report.is_satisfied(),
            })),
            OutputFormat::Table => {
                print_section("kubectl get deployments", &report.deployments);
                print_section("kubectl get services", &report.services);
                print_section(
                    &format!("kubectl get pods -n {}", targets.keda_namespace),
                    &report.keda_pods_output,
                );
            }
        }

        if !report.is_satisfied() {
            let mut problems = Vec::new();
            if !report.deployment_listed {
                problems.push(format!("deployment '{}' not listed", targets.deployment));
            }
            if !report.service_listed {
                if let Some(service) = &targets.service {
                    problems.push(format!("service '{service}' not listed"));
                }
            }
            if report.keda_pods.is_empty() {
                problems.push("no KEDA pods found".to_string());
            } else if !report.keda_pods.iter().all(|p| p.is_running()) {
                problems.push("some KEDA pods are not running".to_string());
            }
            return Err(CliError::VerificationFailed(problems.join("; ")).into());
        }

        if ctx.format == OutputFormat::Table {
            print_success("Deployment, service and KEDA pods are present");
        }
        Ok(())
    }
}
