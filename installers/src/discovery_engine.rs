use kinstall_api as api;
use kinstall_api::Component;
use kinstall_api::DiscoveryEngineOptions;
use kinstall_api::InstallerError;

use crate::apply;
use crate::manifests;
use crate::manifests::ConfigMount;
use crate::manifests::Workload;

use async_trait::async_trait;
use kube::Client as KubeClient;
use std::collections::BTreeMap;

pub const ENGINE_NAME: &str = "discovery-engine";
pub const ENGINE_CONFIG_NAME: &str = "discovery-engine-config";
const ENGINE_CONFIG_DIR: &str = "/etc/discovery-engine";

pub struct DiscoveryEngineInstaller {
    kube_client: KubeClient,
    opts: DiscoveryEngineOptions,
}

pub fn engine_config(opts: &DiscoveryEngineOptions) -> BTreeMap<String, String> {
    let mut config = BTreeMap::new();

    /* the engine keeps its observations in a local sqlite file */
    config.insert(String::from("database-driver"), String::from("sqlite3"));
    config.insert(String::from("database-path"), String::from("/var/lib/discovery-engine/discovery.db"));
    config.insert(String::from("watch-namespace"), String::new());
    config.insert(String::from("engine-namespace"), opts.namespace.clone());
    config
}

pub fn engine_workload(opts: &DiscoveryEngineOptions) -> Workload {
    Workload{
	name: String::from(ENGINE_NAME),
	namespace: opts.namespace.clone(),
	labels: manifests::labels(Component::DiscoveryEngine, ENGINE_NAME),
	image: opts.image.clone(),
	service_account: String::from(ENGINE_NAME),
	args: vec![format!("--config-path={}", ENGINE_CONFIG_DIR)],
	config: Some(ConfigMount{
	    config_map: String::from(ENGINE_CONFIG_NAME),
	    mount_path: String::from(ENGINE_CONFIG_DIR),
	}),
	..Workload::default()
    }
}

impl DiscoveryEngineInstaller {

    pub fn new(kube_client: KubeClient, opts: DiscoveryEngineOptions) -> Self {
	Self{
	    kube_client,
	    opts,
	}
    }
}

#[async_trait]
impl api::Installer for DiscoveryEngineInstaller {

    fn component(&self) -> Component {
	Component::DiscoveryEngine
    }

    async fn install(&self) -> Result<(), InstallerError> {
	let ns = self.opts.namespace.as_str();
	let labels = manifests::labels(Component::DiscoveryEngine, ENGINE_NAME);
	log::info!("Installing discovery engine {} in namespace {}", self.opts.image, ns);

	apply::ensure_namespace(&self.kube_client, None, ns).await?;

	let sa = manifests::service_account(ENGINE_NAME, ns, &labels);
	apply::apply(&self.kube_client, None, &sa).await?;

	let config = manifests::config_map(ENGINE_CONFIG_NAME, ns, &labels, engine_config(&self.opts));
	apply::apply(&self.kube_client, None, &config).await?;

	apply::apply(&self.kube_client, None, &engine_workload(&self.opts).deployment(1)).await?;

	log::info!("Discovery engine installed");
	Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_points_at_install_namespace() {
	let opts = DiscoveryEngineOptions{ namespace: String::from("discovery"), ..DiscoveryEngineOptions::default() };
	let config = engine_config(&opts);

	assert_eq!(config.get("engine-namespace").map(String::as_str), Some("discovery"));
	assert_eq!(config.get("database-driver").map(String::as_str), Some("sqlite3"));
    }

    #[test]
    fn engine_is_a_single_replica_deployment() {
	let deploy = engine_workload(&DiscoveryEngineOptions::default()).deployment(1);
	assert_eq!(deploy.spec.unwrap().replicas, Some(1));
    }
}
