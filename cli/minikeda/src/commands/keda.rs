//! KEDA commands (install via Helm, verify pods).

use anyhow::Result;
use clap::{Args, Subcommand};
use minikeda_runbook::kubectl::parse_pods;
use minikeda_runbook::PodRow;
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{
    print_output, print_receipt, print_success, OutputFormat, Receipt, ReceiptNextStep,
};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct KedaCommand {
    #[command(subcommand)]
    command: KedaSubcommand,
}

#[derive(Debug, Subcommand)]
enum KedaSubcommand {
    /// Add the kedacore repo and install the KEDA chart.
    Install {
        /// Chart version (latest when omitted).
        #[arg(long)]
        version: Option<String>,

        /// How long helm waits for the KEDA pods, e.g. `10m`.
        #[arg(long)]
        timeout: Option<String>,

        /// Install Helm with the official script if it is missing.
        #[arg(long)]
        install_helm: bool,
    },

    /// List pods in the KEDA namespace.
    Verify,
}

#[derive(Debug, Serialize, Tabled)]
struct PodView {
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "Ready")]
    ready: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<PodRow> for PodView {
    fn from(row: PodRow) -> Self {
        Self {
            name: row.name,
            ready: row.ready,
            status: row.status,
        }
    }
}

impl KedaCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            KedaSubcommand::Install {
                version,
                timeout,
                install_helm,
            } => install(ctx, version, timeout, install_helm).await,
            KedaSubcommand::Verify => verify(ctx).await,
        }
    }
}

async fn install(
    mut ctx: CommandContext,
    version: Option<String>,
    timeout: Option<String>,
    install_helm: bool,
) -> Result<()> {
    if version.is_some() {
        ctx.config.runbook.keda.version = version;
    }
    if let Some(timeout) = timeout {
        ctx.config.runbook.keda.timeout = timeout;
    }
    ctx.config.runbook.install_helm |= install_helm;

    let runbook = ctx.runbook();
    let helm = runbook.ensure_helm().await?;
    runbook.install_keda().await?;

    let chart = &runbook.config().keda;
    let next = [ReceiptNextStep {
        label: "Verify",
        cmd: "minikeda keda verify".to_string(),
    }];
    print_receipt(
        ctx.format,
        Receipt {
            message: format!(
                "KEDA release '{}' installed in namespace '{}' (helm {})",
                chart.release,
                chart.namespace,
                helm.version()
            ),
            status: "installed",
            kind: "keda.install",
            resource_key: "chart",
            resource: chart,
            next: &next,
        },
    );
    Ok(())
}

async fn verify(ctx: CommandContext) -> Result<()> {
    let runbook = ctx.runbook();
    let output = runbook.verify_keda().await?;
    let pods = parse_pods(&output);

    let all_running = !pods.is_empty() && pods.iter().all(PodRow::is_running);
    let namespace = runbook.config().keda.namespace.clone();

    let views: Vec<PodView> = pods.into_iter().map(PodView::from).collect();
    print_output(&views, ctx.format);

    if !all_running {
        return Err(CliError::VerificationFailed(format!(
            "not all KEDA pods in namespace '{namespace}' are running"
        ))
        .into());
    }
    if ctx.format == OutputFormat::Table {
        print_success("KEDA is running");
    }
    Ok(())
}
