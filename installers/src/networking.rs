use kinstall_api as api;
use kinstall_api::Component;
use kinstall_api::Encryption;
use kinstall_api::InstallerError;
use kinstall_api::NetworkingOptions;

use crate::apply;
use crate::apply::Tracker;
use crate::crypto;
use crate::manifests;
use crate::manifests::ConfigMount;
use crate::manifests::Workload;
use crate::values;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::api::DeleteParams as KubeDeleteParams;
use kube::api::ListParams as KubeListParams;
use std::collections::BTreeMap;

pub const AGENT_NAME: &str = "networking-agent";
pub const AGENT_CONFIG_NAME: &str = "networking-agent-config";
pub const IPSEC_SECRET_NAME: &str = "networking-ipsec-keys";
const AGENT_IMAGE: &str = "quay.io/cilium/cilium";
const AGENT_CONFIG_DIR: &str = "/tmp/networking/config-map";

/*
 * NetworkingInstaller rolls the CNI agent out as a DaemonSet and keeps
 * track of what it applied so a failed install can be rolled back.
 */
pub struct NetworkingInstaller {
    kube_client: KubeClient,
    opts: NetworkingOptions,
    applied: Tracker,
}

/* Pods the agent doesn't manage yet: controller owned and not on the host network */
pub fn is_unmanaged_pod(pod: &Pod, agent_namespace: &str) -> bool {
    if pod.metadata.namespace.as_deref() == Some(agent_namespace) {
	return false;
    }
    let owned = pod.metadata.owner_references.as_ref().is_some_and(|refs| !refs.is_empty());
    let host_network = pod.spec.as_ref().and_then(|spec| spec.host_network).unwrap_or(false);

    owned && !host_network
}

pub fn agent_workload(opts: &NetworkingOptions) -> Workload {
    Workload{
	name: String::from(AGENT_NAME),
	namespace: opts.namespace.clone(),
	labels: manifests::labels(Component::Networking, AGENT_NAME),
	image: format!("{}:{}", AGENT_IMAGE, opts.version),
	service_account: String::from(AGENT_NAME),
	args: vec![format!("--config-dir={}", AGENT_CONFIG_DIR)],
	config: Some(ConfigMount{
	    config_map: String::from(AGENT_CONFIG_NAME),
	    mount_path: String::from(AGENT_CONFIG_DIR),
	}),
	host_network: true,
	privileged: true,
	..Workload::default()
    }
}

impl NetworkingInstaller {

    pub fn new(kube_client: KubeClient, opts: NetworkingOptions) -> Self {
	Self{
	    kube_client,
	    opts,
	    applied: Tracker::default(),
	}
    }

    async fn apply_ipsec_keys(&self, labels: &BTreeMap<String, String>) -> Result<(), InstallerError> {
	let mut data = BTreeMap::new();
	data.insert(String::from("keys"), crypto::ipsec_key()?.into_bytes());

	let secret = manifests::secret(IPSEC_SECRET_NAME, &self.opts.namespace, labels, None, data);
	apply::apply(&self.kube_client, Some(&self.applied), &secret).await?;
	Ok(())
    }

    /*
     * Deletes pods that started before the agent was up so their
     * controllers recreate them on the new network.
     */
    async fn restart_unmanaged_pods(&self) -> Result<(), InstallerError> {
	let pods: KubeApi<Pod> = KubeApi::all(self.kube_client.clone());
	let mut restarted = 0;

	for pod in pods.list(&KubeListParams::default()).await? {
	    if !is_unmanaged_pod(&pod, &self.opts.namespace) {
		continue;
	    }
	    let (name, namespace) = match (&pod.metadata.name, &pod.metadata.namespace) {
		(Some(name), Some(namespace)) => (name.clone(), namespace.clone()),
		_ => continue,
	    };

	    log::debug!("Restarting unmanaged pod {}/{}", namespace, name);
	    let api: KubeApi<Pod> = KubeApi::namespaced(self.kube_client.clone(), &namespace);
	    if let Err(err) = api.delete(&name, &KubeDeleteParams::default()).await {
		log::warn!("Unable to restart pod {}/{}: {}", namespace, name, err);
		continue;
	    }
	    restarted += 1;
	}

	log::info!("Restarted {} unmanaged pod(s)", restarted);
	Ok(())
    }
}

#[async_trait]
impl api::Installer for NetworkingInstaller {

    fn component(&self) -> Component {
	Component::Networking
    }

    async fn install(&self) -> Result<(), InstallerError> {
	let ns = self.opts.namespace.as_str();
	let labels = manifests::labels(Component::Networking, AGENT_NAME);
	log::info!("Installing networking {} in namespace {}", self.opts.version, ns);

	apply::ensure_namespace(&self.kube_client, Some(&self.applied), ns).await?;

	let values = values::networking_values(&self.opts);
	let secret = manifests::secret(&self.opts.helm_values_secret_name, ns, &labels, None, values::to_secret_data(&values)?);
	apply::apply(&self.kube_client, Some(&self.applied), &secret).await?;

	if self.opts.encryption == Encryption::Ipsec {
	    self.apply_ipsec_keys(&labels).await?;
	}

	let sa = manifests::service_account(AGENT_NAME, ns, &labels);
	apply::apply(&self.kube_client, Some(&self.applied), &sa).await?;

	let config = manifests::config_map(AGENT_CONFIG_NAME, ns, &labels, values::agent_config(&self.opts));
	apply::apply(&self.kube_client, Some(&self.applied), &config).await?;

	apply::apply(&self.kube_client, Some(&self.applied), &agent_workload(&self.opts).daemon_set()).await?;

	if self.opts.wait {
	    apply::wait_for_daemon_set(&self.kube_client, ns, AGENT_NAME, self.opts.wait_duration).await?;
	}

	if self.opts.restart_unmanaged_pods {
	    apply::wait_for_daemon_set(&self.kube_client, ns, AGENT_NAME, self.opts.ready_timeout).await?;
	    self.restart_unmanaged_pods().await?;
	}

	log::info!("Networking installed");
	Ok(())
    }

    async fn rollback_installation(&self) -> Result<(), InstallerError> {
	if !self.opts.rollback {
	    log::warn!("Rollback disabled, leaving {} applied object(s) in place", self.applied.applied().len());
	    return Ok(());
	}

	self.applied.rollback(&self.kube_client).await
    }
}
