//! Error handling and display for the CLI.

use colored::Colorize;
use minikeda_runbook::RunbookError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Missing prerequisites: {}", .0.join(", "))]
    MissingPrerequisites(Vec<String>),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Deployment '{name}' is {health}")]
    Unhealthy { name: String, health: String },

    #[error("Deployment was created without a UID, cannot check health")]
    MissingUid,
}

/// Hint printed under an error, if there is one worth giving.
fn hint(err: &anyhow::Error) -> Option<String> {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::MissingPrerequisites(_) => Some(
                "Install the missing tools: Docker, Minikube, kubectl and Helm.".to_string(),
            ),
            CliError::VerificationFailed(_) => Some(
                "KEDA pods may still be starting. Retry `minikeda verify` in a minute.".to_string(),
            ),
            _ => None,
        };
    }

    match err.downcast_ref::<RunbookError>()? {
        RunbookError::ToolMissing { tool } if tool == "helm" => Some(
            "Install Helm, or rerun with --install-helm to run the official installer.".to_string(),
        ),
        RunbookError::ToolMissing { tool } => Some(format!(
            "Install `{tool}` and make sure it is on your PATH. Run `minikeda prereqs` to check."
        )),
        RunbookError::Kubeconfig(_) => Some(
            "Is the cluster running? Run `minikeda cluster start`, or pass --context.".to_string(),
        ),
        RunbookError::Kube(_) => Some(
            "Check that Minikube is running: `minikeda cluster status`.".to_string(),
        ),
        RunbookError::AlreadyExists { kind, name, namespace } => Some(format!(
            "Delete it first: `kubectl delete {} {name} -n {namespace}`.",
            kind.to_lowercase()
        )),
        RunbookError::Manifest(_) => Some("Fix the workload flags and retry.".to_string()),
        _ => None,
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(hint) = hint(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_helm_suggests_installer_flag() {
        let err = anyhow::Error::new(RunbookError::ToolMissing {
            tool: "helm".to_string(),
        });
        assert!(hint(&err).unwrap().contains("--install-helm"));
    }

    #[test]
    fn conflict_suggests_delete_command() {
        let err = anyhow::Error::new(RunbookError::AlreadyExists {
            kind: "Deployment",
            name: "web".to_string(),
            namespace: "default".to_string(),
        });
        assert_eq!(
            hint(&err).as_deref(),
            Some("Delete it first: `kubectl delete deployment web -n default`.")
        );
    }

    #[test]
    fn missing_prerequisites_message_lists_tools() {
        let err = CliError::MissingPrerequisites(vec!["docker".to_string(), "helm".to_string()]);
        assert_eq!(err.to_string(), "Missing prerequisites: docker, helm");
    }

    #[test]
    fn plain_errors_have_no_hint() {
        assert!(hint(&anyhow::anyhow!("boom")).is_none());
    }
}
