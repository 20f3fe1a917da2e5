//! Health command - look up a deployment by UID.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use minikeda_runbook::DeploymentHealth;

use crate::error::CliError;
use crate::output::{print_info, print_single, print_success, print_warning, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct HealthCommand {
    /// Deployment UID (printed by `deploy` and `up`).
    uid: String,

    /// Namespace to search.
    #[arg(long, short = 'n', default_value = "default")]
    namespace: String,

    /// Poll for up to this many seconds until healthy.
    #[arg(long, value_name = "SECS")]
    wait: Option<u64>,
}

impl HealthCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let runbook = ctx.runbook();
        let cluster = ctx.cluster().await?;

        let report = runbook
            .check_health(
                &cluster,
                &self.uid,
                &self.namespace,
                self.wait.map(Duration::from_secs),
            )
            .await?;

        match ctx.format {
            OutputFormat::Json => print_single(&report),
            OutputFormat::Table => {
                let name = report.name.as_deref().unwrap_or(&report.uid);
                match report.health {
                    DeploymentHealth::Healthy => print_success(&format!(
                        "Deployment {name} health status: {} ({}/{} ready)",
                        report.health, report.ready_replicas, report.replicas
                    )),
                    DeploymentHealth::Unhealthy => print_warning(&format!(
                        "Deployment {name} health status: {} ({}/{} ready)",
                        report.health, report.ready_replicas, report.replicas
                    )),
                    DeploymentHealth::NotFound => print_info(&format!(
                        "Deployment with ID {} not found in namespace {}",
                        report.uid, report.namespace
                    )),
                }
            }
        }

        if report.health != DeploymentHealth::Healthy {
            return Err(CliError::Unhealthy {
                name: report.name.unwrap_or(report.uid),
                health: report.health.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
