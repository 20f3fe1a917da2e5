//! Runbook errors.

use std::time::Duration;

use minikeda_manifests::ManifestError;
use thiserror::Error;

use crate::health::DeploymentHealth;

pub type Result<T, E = RunbookError> = std::result::Result<T, E>;

/// Errors raised by a runbook step.
///
/// There is no recovery: a failed step aborts the run and the operator
/// fixes the environment.
#[derive(Debug, Error)]
pub enum RunbookError {
    /// A required binary is not on `PATH`.
    #[error("required tool '{tool}' was not found on PATH")]
    ToolMissing { tool: String },

    /// A tool ran but exited unsuccessfully.
    #[error("command `{command}` failed ({}): {stderr}", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The manifests for the workload are invalid.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The kubeconfig could not be loaded for the requested context.
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// The API server rejected a request.
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// An object with the same name is already present.
    #[error("{kind} '{name}' already exists in namespace '{namespace}'")]
    AlreadyExists {
        kind: &'static str,
        name: String,
        namespace: String,
    },

    /// Polling ran out of time.
    #[error("timed out after {elapsed:?} waiting for {resource} (last status: {last})")]
    Timeout {
        resource: String,
        elapsed: Duration,
        last: DeploymentHealth,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl RunbookError {
    /// Returns true if a binary was missing.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, RunbookError::ToolMissing { .. })
    }

    /// Returns true if the API reported a name conflict.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, RunbookError::AlreadyExists { .. })
    }
}
