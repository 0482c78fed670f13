use kinstall_api::Component;
use kinstall_api::InstallerError;
use kinstall_api::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {

    /* a fail-fast step failed; the remaining steps were not attempted */
    #[error("unable to install {component}: {source}")]
    Installer {
	component: Component,
	#[source]
	source: InstallerError,
    },
}

#[derive(Error, Debug)]
pub enum Error {

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("unable to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("unable to infer cluster configuration: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    /* encapsulate a kube-rust error */
    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),
}
