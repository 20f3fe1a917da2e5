//! Prerequisite check (docker, minikube, kubectl, helm).

use anyhow::Result;
use clap::Args;
use minikeda_runbook::ToolCheck;
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_output, print_success, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct PrereqsCommand {}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct ToolRow {
    #[tabled(rename = "Tool")]
    tool: String,
    #[tabled(rename = "Available")]
    available: bool,
    #[tabled(rename = "Version")]
    version: String,
}

impl From<&ToolCheck> for ToolRow {
    fn from(check: &ToolCheck) -> Self {
        Self {
            tool: check.tool.to_string(),
            available: check.available,
            version: check.version.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Names of the tools that are not available.
pub(crate) fn missing_tools(checks: &[ToolCheck]) -> Vec<String> {
    checks
        .iter()
        .filter(|c| !c.available)
        .map(|c| c.tool.to_string())
        .collect()
}

impl PrereqsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let checks = ctx.runbook().check_prerequisites().await?;

        let rows: Vec<ToolRow> = checks.iter().map(ToolRow::from).collect();
        print_output(&rows, ctx.format);

        let missing = missing_tools(&checks);
        if !missing.is_empty() {
            return Err(CliError::MissingPrerequisites(missing).into());
        }

        if ctx.format == OutputFormat::Table {
            print_success("All prerequisites are installed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minikeda_runbook::Tool;

    #[test]
    fn rows_show_dash_for_missing_version() {
        let check = ToolCheck {
            tool: Tool::Helm,
            available: false,
            version: None,
        };
        let row = ToolRow::from(&check);
        assert_eq!(row.tool, "helm");
        assert_eq!(row.version, "-");
    }

    #[test]
    fn missing_tools_lists_unavailable_only() {
        let checks = vec![
            ToolCheck {
                tool: Tool::Docker,
                available: true,
                version: Some("Docker version 27.3.1".to_string()),
            },
            ToolCheck {
                tool: Tool::Kubectl,
                available: false,
                version: None,
            },
        ];
        assert_eq!(missing_tools(&checks), vec!["kubectl".to_string()]);
    }
}
