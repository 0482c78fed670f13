use kinstall_api as api;
use kinstall_api::Component;
use kinstall_api::InstallerError;
use kinstall_api::SecurityAgentOptions;

use crate::apply;
use crate::manifests;
use crate::manifests::Workload;

use async_trait::async_trait;
use kube::Client as KubeClient;

pub const AGENT_NAME: &str = "security-agent";

pub struct SecurityAgentInstaller {
    kube_client: KubeClient,
    opts: SecurityAgentOptions,
}

/*
 * The agent enforces policies on every node, so it needs the host's pid
 * namespace and a privileged container.
 */
pub fn agent_workload(opts: &SecurityAgentOptions) -> Workload {
    Workload{
	name: String::from(AGENT_NAME),
	namespace: opts.namespace.clone(),
	labels: manifests::labels(Component::SecurityAgent, AGENT_NAME),
	image: opts.image.clone(),
	service_account: String::from(AGENT_NAME),
	host_pid: true,
	privileged: true,
	..Workload::default()
    }
}

impl SecurityAgentInstaller {

    pub fn new(kube_client: KubeClient, opts: SecurityAgentOptions) -> Self {
	Self{
	    kube_client,
	    opts,
	}
    }
}

#[async_trait]
impl api::Installer for SecurityAgentInstaller {

    fn component(&self) -> Component {
	Component::SecurityAgent
    }

    async fn install(&self) -> Result<(), InstallerError> {
	let ns = self.opts.namespace.as_str();
	let labels = manifests::labels(Component::SecurityAgent, AGENT_NAME);
	log::info!("Installing security agent {} in namespace {}", self.opts.image, ns);

	apply::ensure_namespace(&self.kube_client, None, ns).await?;

	let sa = manifests::service_account(AGENT_NAME, ns, &labels);
	apply::apply(&self.kube_client, None, &sa).await?;
	apply::apply(&self.kube_client, None, &agent_workload(&self.opts).daemon_set()).await?;

	log::info!("Security agent installed");
	Ok(())
    }
}
