//! minikeda - local Minikube + KEDA runbook
//!
//! Starts a local cluster, installs KEDA with Helm, creates a sample
//! workload through the Kubernetes API and verifies it with `kubectl get`.

use anyhow::Result;
use clap::Parser;

mod commands;
mod config;
mod error;
mod logging;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbosity(), cli.log_json());

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
