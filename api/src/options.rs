use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "kube-system";
pub const DEFAULT_NETWORKING_VERSION: &str = "v1.14.5";
pub const DEFAULT_HELM_VALUES_SECRET_NAME: &str = "networking-helm-values";
pub const DEFAULT_WAIT_DURATION: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SECURITY_AGENT_IMAGE: &str = "kubearmor/kubearmor:stable";
pub const DEFAULT_DISCOVERY_ENGINE_IMAGE: &str = "accuknox/discovery-engine:latest";

/* Transparent encryption mode for workload traffic */
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    #[default]
    Disabled,
    Ipsec,
    Wireguard,
}

impl Encryption {

    pub fn as_str(&self) -> &'static str {
	match self {
	    Encryption::Disabled => "disabled",
	    Encryption::Ipsec => "ipsec",
	    Encryption::Wireguard => "wireguard",
	}
    }

    pub fn enabled(&self) -> bool {
	*self != Encryption::Disabled
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	f.write_str(self.as_str())
    }
}

impl FromStr for Encryption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
	match s {
	    "disabled" => Ok(Encryption::Disabled),
	    "ipsec" => Ok(Encryption::Ipsec),
	    "wireguard" => Ok(Encryption::Wireguard),
	    other => Err(format!("unsupported encryption mode {:?}, expected one of: disabled, ipsec, wireguard", other)),
	}
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkingOptions {
    pub namespace: String,
    pub version: String,

    /* version used to pick configuration defaults when `version` isn't a release tag */
    pub base_version: String,
    pub cluster_id: u8,
    pub wait: bool,
    pub wait_duration: Duration,
    pub restart_unmanaged_pods: bool,
    pub encryption: Encryption,
    pub node_encryption: bool,

    /* how long the agent may take to become ready before unmanaged pods are restarted */
    pub ready_timeout: Duration,
    pub rollback: bool,
    pub helm_values_secret_name: String,
}

impl Default for NetworkingOptions {
    fn default() -> Self {
	Self{
	    namespace: DEFAULT_NAMESPACE.to_string(),
	    version: DEFAULT_NETWORKING_VERSION.to_string(),
	    base_version: DEFAULT_NETWORKING_VERSION.to_string(),
	    cluster_id: 0,
	    wait: true,
	    wait_duration: DEFAULT_WAIT_DURATION,
	    restart_unmanaged_pods: true,
	    encryption: Encryption::Disabled,
	    node_encryption: false,
	    ready_timeout: DEFAULT_READY_TIMEOUT,
	    rollback: true,
	    helm_values_secret_name: DEFAULT_HELM_VALUES_SECRET_NAME.to_string(),
	}
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityOptions {
    pub namespace: String,

    /* the relay image tracks the networking version */
    pub version: String,
    pub relay: bool,
    pub create_ca: bool,
    pub redact_helm_cert_keys: bool,
    pub helm_values_secret_name: String,
}

impl Default for ObservabilityOptions {
    fn default() -> Self {
	Self{
	    namespace: DEFAULT_NAMESPACE.to_string(),
	    version: DEFAULT_NETWORKING_VERSION.to_string(),
	    relay: true,
	    create_ca: true,
	    redact_helm_cert_keys: true,
	    helm_values_secret_name: DEFAULT_HELM_VALUES_SECRET_NAME.to_string(),
	}
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityAgentOptions {
    pub namespace: String,
    pub image: String,
}

impl Default for SecurityAgentOptions {
    fn default() -> Self {
	Self{
	    namespace: DEFAULT_NAMESPACE.to_string(),
	    image: DEFAULT_SECURITY_AGENT_IMAGE.to_string(),
	}
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryEngineOptions {
    pub namespace: String,
    pub image: String,
}

impl Default for DiscoveryEngineOptions {
    fn default() -> Self {
	Self{
	    namespace: DEFAULT_NAMESPACE.to_string(),
	    image: DEFAULT_DISCOVERY_ENGINE_IMAGE.to_string(),
	}
    }
}

/*
 * InstallOptions is everything one `kinstall install` run needs. It is
 * built once from the parsed arguments and only read afterwards.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct InstallOptions {
    pub namespace: String,
    pub networking: NetworkingOptions,
    pub observability: ObservabilityOptions,
    pub security_agent: SecurityAgentOptions,
    pub discovery_engine: DiscoveryEngineOptions,
}

impl InstallOptions {

    /*
     * Bundles the per-component options, stamping the shared namespace
     * (and the settings the overlay inherits from networking) on each.
     */
    pub fn new(namespace: &str,
	       networking: NetworkingOptions,
	       observability: ObservabilityOptions,
	       security_agent: SecurityAgentOptions,
	       discovery_engine: DiscoveryEngineOptions) -> Self {
	let observability = ObservabilityOptions{
	    namespace: namespace.to_string(),
	    version: networking.version.clone(),
	    helm_values_secret_name: networking.helm_values_secret_name.clone(),
	    ..observability
	};

	Self{
	    namespace: namespace.to_string(),
	    networking: NetworkingOptions{ namespace: namespace.to_string(), ..networking },
	    observability,
	    security_agent: SecurityAgentOptions{ namespace: namespace.to_string(), ..security_agent },
	    discovery_engine: DiscoveryEngineOptions{ namespace: namespace.to_string(), ..discovery_engine },
	}
    }
}

impl Default for InstallOptions {
    fn default() -> Self {
	InstallOptions::new(DEFAULT_NAMESPACE,
			    NetworkingOptions::default(),
			    ObservabilityOptions::default(),
			    SecurityAgentOptions::default(),
			    DiscoveryEngineOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_parses_known_modes_only() {
	assert_eq!("disabled".parse::<Encryption>(), Ok(Encryption::Disabled));
	assert_eq!("ipsec".parse::<Encryption>(), Ok(Encryption::Ipsec));
	assert_eq!("wireguard".parse::<Encryption>(), Ok(Encryption::Wireguard));
	assert!("IPsec".parse::<Encryption>().is_err());
	assert!(!Encryption::Disabled.enabled());
	assert!(Encryption::Wireguard.enabled());
    }

    #[test]
    fn new_propagates_namespace_everywhere() {
	let opts = InstallOptions::new("security",
				       NetworkingOptions::default(),
				       ObservabilityOptions::default(),
				       SecurityAgentOptions::default(),
				       DiscoveryEngineOptions::default());

	assert_eq!(opts.namespace, "security");
	assert_eq!(opts.networking.namespace, "security");
	assert_eq!(opts.observability.namespace, "security");
	assert_eq!(opts.security_agent.namespace, "security");
	assert_eq!(opts.discovery_engine.namespace, "security");
    }

    #[test]
    fn observability_inherits_networking_version_and_secret() {
	let networking = NetworkingOptions{
	    version: "v1.15.0".to_string(),
	    helm_values_secret_name: "my-values".to_string(),
	    ..NetworkingOptions::default()
	};
	let opts = InstallOptions::new(DEFAULT_NAMESPACE,
				       networking,
				       ObservabilityOptions::default(),
				       SecurityAgentOptions::default(),
				       DiscoveryEngineOptions::default());

	assert_eq!(opts.observability.version, "v1.15.0");
	assert_eq!(opts.observability.helm_values_secret_name, "my-values");
    }

    #[test]
    fn defaults() {
	let opts = NetworkingOptions::default();
	assert!(opts.wait && opts.rollback && opts.restart_unmanaged_pods);
	assert!(!opts.node_encryption);
	assert_eq!(opts.encryption, Encryption::Disabled);
	assert_eq!(opts.wait_duration, Duration::from_secs(300));
	assert_eq!(SecurityAgentOptions::default().image, "kubearmor/kubearmor:stable");
    }
}
