mod cli;
mod client;
mod errors;
mod orchestrator;

use cli::Cli;
use cli::Command;
use cli::InstallArgs;
use errors::Error;
use orchestrator::InstallOutcome;
use orchestrator::Orchestrator;

use clap::Parser;
use kinstall_api::Component;
use kinstall_api::SkipSet;
use kinstall_installers::DiscoveryEngineInstaller;
use kinstall_installers::NetworkingInstaller;
use kinstall_installers::ObservabilityOverlay;
use kinstall_installers::SecurityAgentInstaller;

/*
 * The skip list is validated before we ever talk to the cluster, so a
 * typo fails fast without needing a kubeconfig.
 */
async fn install(cli: &Cli, args: &InstallArgs) -> Result<(), Error> {
    let skip = SkipSet::validate(&args.skip_names()[..])?;
    let opts = args.options();
    log::debug!("Install options: {:?}", opts);

    let kube_client = client::kube_client(cli.kubeconfig.as_deref(), cli.context.as_deref()).await?;

    let orchestrator = Orchestrator::standard(
	Box::new(NetworkingInstaller::new(kube_client.clone(), opts.networking.clone())),
	Box::new(ObservabilityOverlay::new(kube_client.clone(), opts.observability.clone())),
	Box::new(SecurityAgentInstaller::new(kube_client.clone(), opts.security_agent.clone())),
	Box::new(DiscoveryEngineInstaller::new(kube_client.clone(), opts.discovery_engine.clone())),
    );

    for step in orchestrator.steps() {
	log::debug!("Planned step {} ({:?})", step.component(), step.policy());
    }

    let report = orchestrator.run(&skip).await?;
    report.log_summary();

    if let Some(InstallOutcome::Failed(_)) = report.outcome(Component::Networking) {
	log::warn!("Networking is not installed; workloads may lack pod connectivity");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match &cli.command {
	Command::Install(args) => install(&cli, args).await,
    };

    if let Err(err) = result {
	log::error!("{}", err);
	std::process::exit(1);
    }
}
