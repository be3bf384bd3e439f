use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::{
    cli::error::Error,
    cluster::KubeConnector,
    command::SystemRunner,
    config::Config,
    pipeline::{self, DeployTarget, Orchestrator, Summary},
};

/// The default command: provision everything that is missing, then deploy.
#[derive(Args, Clone, Debug)]
pub struct DeployCommand {
    #[arg(value_name = "RESOURCE_GROUP", help = "Azure resource group to deploy into")]
    pub resource_group: Option<String>,

    #[arg(value_name = "CLUSTER_NAME", help = "Name of the AKS cluster")]
    pub cluster_name: Option<String>,

    #[arg(
        value_name = "REGISTRY_NAME",
        help = "Name of the Azure Container Registry, also substituted into the deployment \
                manifest"
    )]
    pub registry_name: Option<String>,

    #[arg(long, help = "Azure region for a newly created resource group. Overrides the config file.")]
    pub location: Option<String>,

    #[arg(
        long = "external-ip-timeout-seconds",
        value_name = "SECONDS",
        help = "How long to wait for the public service's external IP. 0 waits without a \
                deadline."
    )]
    pub external_ip_timeout_seconds: Option<u64>,

    #[arg(long = "skip-build", help = "Reuse the images already pushed to the registry.")]
    pub skip_build: bool,
}

impl DeployCommand {
    /// # Errors
    ///
    /// Returns [`pipeline::Error::Usage`] when a positional argument is absent
    /// or blank.
    pub fn target(&self) -> Result<DeployTarget, pipeline::Error> {
        DeployTarget::try_new(
            self.resource_group.clone(),
            self.cluster_name.clone(),
            self.registry_name.clone(),
        )
    }

    /// Command line options take precedence over the config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(location) = &self.location {
            config.location.clone_from(location);
        }
        if let Some(timeout) = self.external_ip_timeout_seconds {
            config.external_ip_timeout_seconds = timeout;
        }
    }

    pub async fn run(self, target: DeployTarget, config: Config) -> Result<i32, Error> {
        let cancel = CancellationToken::new();
        let ctrl_c = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for Ctrl-C, error: {err}");
                    return;
                }
                tracing::info!("Interrupted, stopping the running command");
                cancel.cancel();
            }
        });

        let connector = KubeConnector::new(config.namespace.clone());
        let orchestrator =
            Orchestrator::new(SystemRunner, connector, config).skip_build(self.skip_build);
        let result = orchestrator.run(&target, &cancel).await;
        ctrl_c.abort();

        print_summary(&target, &result?);
        Ok(0)
    }
}

fn print_summary(target: &DeployTarget, summary: &Summary) {
    println!("\n🎉 Deployment complete");
    println!("   Application:    http://{}", summary.external_address);
    println!("   Resource group: {}", target.resource_group);
    println!("   AKS cluster:    {}", target.cluster_name);
    println!("   Registry:       {} ({})", target.registry_name, summary.login_server);

    let tolerated = summary.tolerated().collect::<Vec<_>>();
    if !tolerated.is_empty() {
        println!("\n   Finished with {} warning(s):", tolerated.len());
        for (step, message) in tolerated {
            println!("   - {}: {message}", step.name);
        }
    }
}
