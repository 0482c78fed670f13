use crate::errors::Error;

use kube::Client as KubeClient;
use kube::Config as KubeConfig;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use std::path::Path;

/*
 * Builds the cluster client from an explicit kubeconfig and/or context,
 * falling back to the usual inference (KUBECONFIG, ~/.kube/config,
 * in-cluster service account).
 */
pub async fn kube_client(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<KubeClient, Error> {
    let options = KubeConfigOptions{
	context: context.map(String::from),
	..KubeConfigOptions::default()
    };

    let config = match (kubeconfig, context) {
	(Some(path), _) => {
	    log::debug!("Loading kubeconfig from {}", path.display());
	    let kubeconfig = Kubeconfig::read_from(path)?;
	    KubeConfig::from_custom_kubeconfig(kubeconfig, &options).await?
	},
	(None, Some(_)) => KubeConfig::from_kubeconfig(&options).await?,
	(None, None) => KubeConfig::infer().await?,
    };

    log::debug!("Using cluster {}", config.cluster_url);
    Ok(KubeClient::try_from(config)?)
}
