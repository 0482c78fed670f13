use kinstall_api::DiscoveryEngineOptions;
use kinstall_api::Encryption;
use kinstall_api::InstallOptions;
use kinstall_api::NetworkingOptions;
use kinstall_api::ObservabilityOptions;
use kinstall_api::SecurityAgentOptions;
use kinstall_api::options::DEFAULT_DISCOVERY_ENGINE_IMAGE;
use kinstall_api::options::DEFAULT_HELM_VALUES_SECRET_NAME;
use kinstall_api::options::DEFAULT_NAMESPACE;
use kinstall_api::options::DEFAULT_NETWORKING_VERSION;
use kinstall_api::options::DEFAULT_SECURITY_AGENT_IMAGE;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;
use std::time::Duration;

/// Install the networking layer, runtime-security agent and discovery
/// engine in a Kubernetes cluster.
#[derive(Parser, Debug)]
#[command(name = "kinstall", version)]
pub struct Cli {
    /// Path to the kubeconfig file (defaults to $KUBECONFIG or ~/.kube/config)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install the networking layer, security agent and discovery engine
    Install(InstallArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Skip installing a component { networking | security-agent | discovery-engine }
    #[arg(short = 's', long, value_name = "NAMES")]
    pub skip: Vec<String>,

    /// Namespace for resources
    #[arg(short = 'n', long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Security agent daemonset image to use
    #[arg(short = 'i', long, default_value = DEFAULT_SECURITY_AGENT_IMAGE)]
    pub image: String,

    /// Networking version to install
    #[arg(long, default_value = DEFAULT_NETWORKING_VERSION)]
    pub version: String,

    /// Base networking version for configuration purposes, when --version isn't a release tag
    #[arg(long, hide = true, default_value = DEFAULT_NETWORKING_VERSION)]
    pub base_version: String,

    /// Unique cluster identifier for multi-cluster
    #[arg(long, default_value_t = 0)]
    pub cluster_id: u8,

    /// Wait for status to report success (no errors)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = true, default_missing_value = "true")]
    pub wait: bool,

    /// Maximum time to wait for status
    #[arg(long, default_value = "5m", value_parser = humantime::parse_duration)]
    pub wait_duration: Duration,

    /// Restart pods which are not being managed by the networking agent
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = true, default_missing_value = "true")]
    pub restart_unmanaged_pods: bool,

    /// Enable encryption of all workloads traffic { disabled | ipsec | wireguard }
    #[arg(long, default_value = "disabled")]
    pub encryption: Encryption,

    /// Enable encryption of all node to node traffic
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = false, default_missing_value = "true")]
    pub node_encryption: bool,

    /// Timeout for the networking agent to become ready before restarting unmanaged pods
    #[arg(long = "cilium-ready-timeout", default_value = "5m", value_parser = humantime::parse_duration)]
    pub ready_timeout: Duration,

    /// Roll back installed resources on failure
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value_t = true, default_missing_value = "true")]
    pub rollback: bool,

    /// Secret name to store the generated values in (same namespace as the install)
    #[arg(long, default_value = DEFAULT_HELM_VALUES_SECRET_NAME)]
    pub helm_values_secret_name: String,

    /// Discovery engine image to use
    #[arg(long, default_value = DEFAULT_DISCOVERY_ENGINE_IMAGE)]
    pub discovery_engine_image: String,
}

impl InstallArgs {

    /*
     * Splits every --skip value on commas. An empty value names nothing,
     * so `--skip "$UNSET"` skips no component.
     */
    pub fn skip_names(&self) -> Vec<&str> {
	self.skip.iter()
	    .filter(|raw| !raw.is_empty())
	    .flat_map(|raw| raw.split(','))
	    .collect()
    }

    /* Freezes the parsed flags into the options handed to the installers */
    pub fn options(&self) -> InstallOptions {
	let networking = NetworkingOptions{
	    namespace: self.namespace.clone(),
	    version: self.version.clone(),
	    base_version: self.base_version.clone(),
	    cluster_id: self.cluster_id,
	    wait: self.wait,
	    wait_duration: self.wait_duration,
	    restart_unmanaged_pods: self.restart_unmanaged_pods,
	    encryption: self.encryption,
	    node_encryption: self.node_encryption,
	    ready_timeout: self.ready_timeout,
	    rollback: self.rollback,
	    helm_values_secret_name: self.helm_values_secret_name.clone(),
	};
	let security_agent = SecurityAgentOptions{
	    image: self.image.clone(),
	    ..SecurityAgentOptions::default()
	};
	let discovery_engine = DiscoveryEngineOptions{
	    image: self.discovery_engine_image.clone(),
	    ..DiscoveryEngineOptions::default()
	};

	InstallOptions::new(&self.namespace,
			    networking,
			    ObservabilityOptions::default(),
			    security_agent,
			    discovery_engine)
    }
}
