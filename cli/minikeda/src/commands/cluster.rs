//! Cluster commands (minikube status / start).

use anyhow::Result;
use clap::{Args, Subcommand};
use minikeda_runbook::{ClusterState, StartOutcome};

use crate::output::{print_info, print_single, print_success, print_warning, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct ClusterCommand {
    #[command(subcommand)]
    command: ClusterSubcommand,
}

#[derive(Debug, Subcommand)]
enum ClusterSubcommand {
    /// Show whether Minikube is running.
    Status,

    /// Start Minikube unless it is already running.
    Start,
}

impl ClusterCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ClusterSubcommand::Status => status(ctx).await,
            ClusterSubcommand::Start => start(ctx).await,
        }
    }
}

async fn status(ctx: CommandContext) -> Result<()> {
    let state = ctx.runbook().cluster_status().await?;

    match ctx.format {
        OutputFormat::Json => print_single(&state),
        OutputFormat::Table => match &state {
            ClusterState::Running => print_success("Minikube is running"),
            ClusterState::Stopped(detail) => {
                print_warning(&format!("Minikube is not running ({detail})"));
                print_info("Start it with: minikeda cluster start");
            }
        },
    }
    Ok(())
}

async fn start(ctx: CommandContext) -> Result<()> {
    let outcome = ctx.runbook().ensure_cluster().await?;

    match ctx.format {
        OutputFormat::Json => print_single(&serde_json::json!({ "outcome": outcome })),
        OutputFormat::Table => match outcome {
            StartOutcome::AlreadyRunning => print_info("Minikube is already running"),
            StartOutcome::Started => print_success("Minikube started"),
        },
    }
    Ok(())
}
