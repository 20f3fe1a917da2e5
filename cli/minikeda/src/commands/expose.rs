//! Expose command - `minikube service <name> --url`.

use anyhow::Result;
use clap::Args;

use crate::output::{print_info, print_single, print_warning, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct ExposeCommand {
    /// Service name, e.g. `example-deployment-service`.
    service: String,

    #[arg(long, short = 'n', default_value = "default")]
    namespace: String,
}

impl ExposeCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let urls = ctx.runbook().expose(&self.service, &self.namespace).await?;

        match ctx.format {
            OutputFormat::Json => print_single(&serde_json::json!({
                "service": self.service,
                "namespace": self.namespace,
                "urls": urls,
            })),
            OutputFormat::Table => {
                if urls.is_empty() {
                    print_warning(&format!(
                        "No URL for {}; it may need --service-type NodePort",
                        self.service
                    ));
                }
                for url in &urls {
                    println!("{url}");
                }
                if !urls.is_empty() {
                    print_info("Keep this terminal open if minikube runs a tunnel");
                }
            }
        }
        Ok(())
    }
}
