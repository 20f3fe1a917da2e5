//! Deploy command - create the Deployment, Service and ScaledObject.

use anyhow::Result;
use clap::Args;
use minikeda_runbook::{CreatedResource, DeployReport, HealthReport};
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_output, print_receipt, OutputFormat, Receipt, ReceiptNextStep};

use super::workload::WorkloadArgs;
use super::CommandContext;

#[derive(Debug, Args)]
pub struct DeployCommand {
    #[command(flatten)]
    workload: WorkloadArgs,
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct ResourceRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "UID")]
    uid: String,
}

impl From<&CreatedResource> for ResourceRow {
    fn from(resource: &CreatedResource) -> Self {
        Self {
            kind: resource.kind.to_string(),
            name: resource.name.clone(),
            namespace: resource.namespace.clone(),
            uid: resource.uid.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub(crate) fn resource_rows(report: &DeployReport) -> Vec<ResourceRow> {
    std::iter::once(&report.deployment)
        .chain(report.service.as_ref())
        .chain(report.scaled_object.as_ref())
        .map(ResourceRow::from)
        .collect()
}

/// Suggested follow-up commands after a deploy.
pub(crate) fn next_steps(report: &DeployReport) -> Vec<ReceiptNextStep> {
    let mut next = Vec::new();
    if let Some(uid) = report.deployment_uid() {
        next.push(ReceiptNextStep {
            label: "Health",
            cmd: format!(
                "minikeda health {uid} -n {}",
                report.deployment.namespace
            ),
        });
    }
    next.push(ReceiptNextStep {
        label: "Verify",
        cmd: format!(
            "minikeda verify --name {} -n {}",
            report.deployment.name, report.deployment.namespace
        ),
    });
    if let Some(service) = &report.service {
        next.push(ReceiptNextStep {
            label: "Open",
            cmd: format!("minikeda expose {} -n {}", service.name, service.namespace),
        });
    }
    next
}

#[derive(Debug, Serialize)]
struct DeployView<'a> {
    resources: &'a DeployReport,
    health: Option<&'a HealthReport>,
}

impl DeployCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let plan = self.workload.into_plan();
        let runbook = ctx.runbook();
        let cluster = ctx.cluster().await?;

        let report = runbook.deploy_workload(&cluster, &plan).await?;

        let health = match plan.wait {
            Some(timeout) => {
                let uid = report.deployment_uid().ok_or(CliError::MissingUid)?;
                Some(
                    runbook
                        .check_health(&cluster, uid, &plan.workload.namespace, Some(timeout))
                        .await?,
                )
            }
            None => None,
        };

        let next = next_steps(&report);
        let mut message = format!(
            "Deployment {} created in namespace {}",
            report.deployment.name, report.deployment.namespace
        );
        if let Some(health) = &health {
            message.push_str(&format!(" ({})", health.health));
        }

        print_receipt(
            ctx.format,
            Receipt {
                message,
                status: "created",
                kind: "deploy",
                resource_key: "deploy",
                resource: &DeployView {
                    resources: &report,
                    health: health.as_ref(),
                },
                next: &next,
            },
        );
        if ctx.format == OutputFormat::Table {
            print_output(&resource_rows(&report), ctx.format);
        }

        Ok(())
    }
}
