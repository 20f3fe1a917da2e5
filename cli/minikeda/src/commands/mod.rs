//! CLI commands.

mod cluster;
mod config;
mod deploy;
mod expose;
mod health;
mod keda;
mod prereqs;
mod up;
mod verify;
mod workload;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use minikeda_runbook::{KubeCluster, ProcessRunner, Runbook};
use tracing::debug;

use crate::config::Config;
use crate::output::OutputFormat;

/// minikeda - Run a local Minikube cluster with KEDA and a sample workload.
#[derive(Debug, Parser)]
#[command(name = "minikeda")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Kubeconfig context for the API client, helm and kubectl.
    #[arg(long, global = true, env = "MINIKEDA_CONTEXT")]
    context: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that docker, minikube, kubectl and helm are installed.
    Prereqs(prereqs::PrereqsCommand),

    /// Inspect or start the local Minikube cluster.
    Cluster(cluster::ClusterCommand),

    /// Install or verify KEDA.
    Keda(keda::KedaCommand),

    /// Create a Deployment, Service and ScaledObject.
    Deploy(deploy::DeployCommand),

    /// Show the health of a deployment by UID.
    Health(health::HealthCommand),

    /// List deployments, services and KEDA pods with kubectl.
    Verify(verify::VerifyCommand),

    /// Print the URL of a service through minikube.
    Expose(expose::ExposeCommand),

    /// Run the whole runbook: cluster, KEDA, workload, verification.
    Up(up::UpCommand),

    /// Show or reset the saved configuration.
    Config(config::ConfigCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    pub fn log_json(&self) -> bool {
        self.log_json
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        if let Some(context) = self.context {
            config.runbook.kube_context = context;
        }
        debug!(
            context = %config.runbook.kube_context,
            driver = config.runbook.minikube_driver.as_deref().unwrap_or("default"),
            "Loaded configuration"
        );

        let ctx = CommandContext {
            config,
            format: self.format,
        };

        match self.command {
            Commands::Prereqs(cmd) => cmd.run(ctx).await,
            Commands::Cluster(cmd) => cmd.run(ctx).await,
            Commands::Keda(cmd) => cmd.run(ctx).await,
            Commands::Deploy(cmd) => cmd.run(ctx).await,
            Commands::Health(cmd) => cmd.run(ctx).await,
            Commands::Verify(cmd) => cmd.run(ctx).await,
            Commands::Expose(cmd) => cmd.run(ctx).await,
            Commands::Up(cmd) => cmd.run(ctx).await,
            Commands::Config(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("minikeda {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Runbook backed by real processes.
    pub fn runbook(&self) -> Runbook<ProcessRunner> {
        Runbook::new(ProcessRunner::new(), self.config.runbook.clone())
    }

    /// API client for the configured kubeconfig context.
    pub async fn cluster(&self) -> Result<KubeCluster> {
        Ok(KubeCluster::connect(&self.config.runbook.kube_context).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "minikeda", "verify", "--format", "json", "--context", "kind-dev", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.context.as_deref(), Some("kind-dev"));
        assert_eq!(cli.verbosity(), 2);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["minikeda", "--format", "yaml", "version"]).is_err());
    }
}
