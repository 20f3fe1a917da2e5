//! Config commands (saved defaults for context, driver and chart).

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::{config_path, Config};
use crate::output::{print_single, print_success, OutputFormat};

use super::CommandContext;

/// Manage the saved CLI configuration.
#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommand {
    /// Show the effective configuration (file, env and flags applied).
    Show,

    /// Update saved values.
    Set(SetArgs),

    /// Delete saved values and go back to defaults.
    Reset,

    /// Print the config file location.
    Path,
}

#[derive(Debug, Args)]
struct SetArgs {
    /// Kubeconfig context.
    #[arg(long = "kube-context")]
    kube_context: Option<String>,

    /// Minikube driver, e.g. `docker`.
    #[arg(long)]
    driver: Option<String>,

    /// KEDA chart version.
    #[arg(long)]
    keda_version: Option<String>,

    /// Install Helm automatically when it is missing.
    #[arg(long)]
    install_helm: Option<bool>,
}

impl SetArgs {
    fn is_empty(&self) -> bool {
        self.kube_context.is_none()
            && self.driver.is_none()
            && self.keda_version.is_none()
            && self.install_helm.is_none()
    }

    fn apply(self, config: &mut Config) {
        let runbook = &mut config.runbook;
        if let Some(context) = self.kube_context {
            runbook.kube_context = context;
        }
        if let Some(driver) = self.driver {
            runbook.minikube_driver = Some(driver).filter(|d| !d.is_empty());
        }
        if let Some(version) = self.keda_version {
            runbook.keda.version = Some(version).filter(|v| !v.is_empty());
        }
        if let Some(install_helm) = self.install_helm {
            runbook.install_helm = install_helm;
        }
    }
}

impl ConfigCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ConfigSubcommand::Show => show(ctx),
            ConfigSubcommand::Set(args) => set(ctx, args),
            ConfigSubcommand::Reset => reset(ctx),
            ConfigSubcommand::Path => path(ctx),
        }
    }
}

fn show(ctx: CommandContext) -> Result<()> {
    let runbook = &ctx.config.runbook;
    match ctx.format {
        OutputFormat::Json => print_single(&ctx.config),
        OutputFormat::Table => {
            println!("kube_context: {}", runbook.kube_context);
            println!(
                "minikube_driver: {}",
                runbook.minikube_driver.as_deref().unwrap_or("-")
            );
            println!("install_helm: {}", runbook.install_helm);
            println!("keda.chart: {}", runbook.keda.chart_ref());
            println!("keda.repo_url: {}", runbook.keda.repo_url);
            println!("keda.release: {}", runbook.keda.release);
            println!("keda.namespace: {}", runbook.keda.namespace);
            println!(
                "keda.version: {}",
                runbook.keda.version.as_deref().unwrap_or("latest")
            );
            println!("keda.timeout: {}", runbook.keda.timeout);
        }
    }
    Ok(())
}

fn set(ctx: CommandContext, args: SetArgs) -> Result<()> {
    if args.is_empty() {
        anyhow::bail!("Nothing to set; pass at least one option (see `minikeda config set --help`)");
    }

    // Env and flag overrides must not leak into the file.
    let path = config_path()?;
    let mut saved = Config::load_from(&path)?;
    args.apply(&mut saved);
    saved.save_to(&path)?;

    match ctx.format {
        OutputFormat::Json => print_single(&saved),
        OutputFormat::Table => print_success(&format!("Saved {}", path.display())),
    }
    Ok(())
}

fn reset(ctx: CommandContext) -> Result<()> {
    Config::default().save()?;

    match ctx.format {
        OutputFormat::Json => print_single(&serde_json::json!({ "ok": true })),
        OutputFormat::Table => print_success("Configuration reset to defaults"),
    }
    Ok(())
}

fn path(ctx: CommandContext) -> Result<()> {
    let path = config_path()?;
    match ctx.format {
        OutputFormat::Json => print_single(&serde_json::json!({ "path": path })),
        OutputFormat::Table => println!("{}", path.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_only_touches_given_fields() {
        let mut config = Config::default();
        SetArgs {
            kube_context: None,
            driver: Some("docker".to_string()),
            keda_version: None,
            install_helm: Some(true),
        }
        .apply(&mut config);

        assert_eq!(config.runbook.kube_context, "minikube");
        assert_eq!(config.runbook.minikube_driver.as_deref(), Some("docker"));
        assert!(config.runbook.install_helm);
        assert_eq!(config.runbook.keda.version, None);
    }

    #[test]
    fn empty_values_clear_optional_fields() {
        let mut config = Config::default();
        config.runbook.keda.version = Some("2.15.1".to_string());
        SetArgs {
            kube_context: None,
            driver: None,
            keda_version: Some(String::new()),
            install_helm: None,
        }
        .apply(&mut config);
        assert_eq!(config.runbook.keda.version, None);
    }
}
