/*
 * kinstall/api - the component vocabulary, skip set, install options and
 * installer traits shared by the kinstall binary and its installers.
 */

pub mod component;
pub use component::Component;

pub mod errors;
pub use errors::InstallerError;
pub use errors::ValidationError;

pub mod installer;
pub use installer::Installer;
pub use installer::ObservabilityEnabler;

pub mod options;
pub use options::DiscoveryEngineOptions;
pub use options::Encryption;
pub use options::InstallOptions;
pub use options::NetworkingOptions;
pub use options::ObservabilityOptions;
pub use options::SecurityAgentOptions;

pub mod skip;
pub use skip::SkipSet;
