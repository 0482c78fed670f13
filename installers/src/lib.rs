/*
 * kinstall/installers - kube-rs implementations of the installer traits
 * from kinstall-api. Everything is applied server-side under the
 * `kinstall` field manager.
 */

pub mod apply;
pub mod crypto;
pub mod manifests;
pub mod values;

pub mod discovery_engine;
pub use discovery_engine::DiscoveryEngineInstaller;

pub mod networking;
pub use networking::NetworkingInstaller;

pub mod observability;
pub use observability::ObservabilityOverlay;

pub mod security_agent;
pub use security_agent::SecurityAgentInstaller;
