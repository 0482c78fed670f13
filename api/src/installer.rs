use crate::component::Component;
use crate::errors::InstallerError;
use async_trait::async_trait;

/*
 * Installer is the seam between the orchestrator and whatever actually
 * puts a component on the cluster. Implementations own their client
 * handle and options; the orchestrator only sequences them.
 */
#[async_trait]
pub trait Installer: Send + Sync {

    fn component(&self) -> Component;

    async fn install(&self) -> Result<(), InstallerError>;

    /*
     * Undo whatever install() managed to create. Installers without
     * rollback support keep the default.
     */
    async fn rollback_installation(&self) -> Result<(), InstallerError> {
	Ok(())
    }
}

/* Layers relay/certificate observability on top of a networking install. */
#[async_trait]
pub trait ObservabilityEnabler: Send + Sync {

    async fn enable(&self) -> Result<(), InstallerError>;
}
