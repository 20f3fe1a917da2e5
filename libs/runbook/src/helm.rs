//! Helm wrapper and the KEDA chart coordinates.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, RunbookError};
use crate::tools::{Tool, ToolRunner};

const HELM: &str = "helm";

/// Official Helm 3 installer script.
pub const HELM_INSTALL_SCRIPT_URL: &str =
    "https://raw.githubusercontent.com/helm/helm/main/scripts/get-helm-3";

/// Where to fetch KEDA from and where to install it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KedaChart {
    pub repo_name: String,
    pub repo_url: String,
    pub chart: String,
    pub release: String,
    pub namespace: String,
    /// Chart version; latest when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// How long helm waits for the release's pods to become ready.
    pub timeout: String,
}

impl Default for KedaChart {
    fn default() -> Self {
        Self {
            repo_name: "kedacore".to_string(),
            repo_url: "https://kedacore.github.io/charts".to_string(),
            chart: "keda".to_string(),
            release: "keda".to_string(),
            namespace: "keda".to_string(),
            version: None,
            timeout: "5m0s".to_string(),
        }
    }
}

impl KedaChart {
    /// `<repo>/<chart>` reference passed to helm.
    pub fn chart_ref(&self) -> String {
        format!("{}/{}", self.repo_name, self.chart)
    }
}

/// What `ensure_installed` found or did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "version", rename_all = "snake_case")]
pub enum HelmStatus {
    AlreadyInstalled(String),
    Installed(String),
}

impl HelmStatus {
    pub fn version(&self) -> &str {
        match self {
            HelmStatus::AlreadyInstalled(v) | HelmStatus::Installed(v) => v,
        }
    }
}

pub struct Helm<'a, R: ?Sized> {
    runner: &'a R,
    kube_context: Option<&'a str>,
}

impl<'a, R: ToolRunner + ?Sized> Helm<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            kube_context: None,
        }
    }

    /// Target a specific kubeconfig context for cluster operations.
    pub fn with_kube_context(mut self, context: &'a str) -> Self {
        self.kube_context = Some(context);
        self
    }

    pub async fn version(&self) -> Result<String> {
        self.runner
            .run_checked(HELM, Tool::Helm.version_args())
            .await
    }

    /// Make sure `helm` is available, running the official installer when
    /// it is missing and `install_if_missing` is set.
    pub async fn ensure_installed(&self, install_if_missing: bool) -> Result<HelmStatus> {
        match self.version().await {
            Ok(version) => {
                info!(%version, "Helm is already installed");
                Ok(HelmStatus::AlreadyInstalled(version))
            }
            Err(RunbookError::ToolMissing { .. }) if install_if_missing => {
                warn!(url = HELM_INSTALL_SCRIPT_URL, "Helm not found, installing");
                let script = format!("curl -fsSL {HELM_INSTALL_SCRIPT_URL} | bash");
                self.runner.run_checked("sh", &["-c", &script]).await?;
                let version = self.version().await?;
                Ok(HelmStatus::Installed(version))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn add_repo(&self, name: &str, url: &str) -> Result<()> {
        self.runner
            .run_checked(HELM, &["repo", "add", name, url])
            .await?;
        Ok(())
    }

    pub async fn update_repos(&self) -> Result<()> {
        self.runner.run_checked(HELM, &["repo", "update"]).await?;
        Ok(())
    }

    /// Install (or upgrade) the KEDA release, creating its namespace.
    ///
    /// Blocks until the KEDA pods are ready or the chart timeout expires.
    pub async fn install_keda(&self, chart: &KedaChart) -> Result<()> {
        let chart_ref = chart.chart_ref();
        let mut args = vec![
            "upgrade",
            "--install",
            chart.release.as_str(),
            chart_ref.as_str(),
            "--namespace",
            chart.namespace.as_str(),
            "--create-namespace",
            "--wait",
            "--timeout",
            chart.timeout.as_str(),
        ];
        if let Some(version) = chart.version.as_deref() {
            args.extend(["--version", version]);
        }
        if let Some(context) = self.kube_context {
            args.extend(["--kube-context", context]);
        }

        info!(release = %chart.release, chart = %chart_ref, namespace = %chart.namespace, "Installing KEDA");
        self.runner.run_checked(HELM, &args).await?;
        Ok(())
    }
}
