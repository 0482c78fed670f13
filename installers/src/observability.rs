use kinstall_api as api;
use kinstall_api::Component;
use kinstall_api::InstallerError;
use kinstall_api::ObservabilityOptions;

use crate::apply;
use crate::crypto;
use crate::manifests;
use crate::manifests::Workload;
use crate::values;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use std::collections::BTreeMap;

pub const RELAY_NAME: &str = "observability-relay";
pub const CA_SECRET_NAME: &str = "observability-ca";
pub const RELAY_PORT: i32 = 4245;
const RELAY_IMAGE: &str = "quay.io/cilium/hubble-relay";
const CA_COMMON_NAME: &str = "observability-ca.kinstall";
const CA_VALIDITY_DAYS: u32 = 3 * 365;
const CA_CERT_KEY: &str = "tls.crt";
const CA_KEY_KEY: &str = "tls.key";

/*
 * ObservabilityOverlay layers the relay and its certificate authority on
 * top of an installed networking agent.
 */
pub struct ObservabilityOverlay {
    kube_client: KubeClient,
    opts: ObservabilityOptions,
}

pub fn relay_workload(opts: &ObservabilityOptions) -> Workload {
    Workload{
	name: String::from(RELAY_NAME),
	namespace: opts.namespace.clone(),
	labels: manifests::labels(Component::Networking, RELAY_NAME),
	image: format!("{}:{}", RELAY_IMAGE, opts.version),
	service_account: String::from(RELAY_NAME),
	args: vec![format!("--listen-address=:{}", RELAY_PORT)],
	port: Some(RELAY_PORT),
	..Workload::default()
    }
}

/* Reads a CA back out of its TLS Secret; both halves must be present */
pub fn existing_ca(secret: Option<&Secret>) -> Option<crypto::CertificateAuthority> {
    let data = secret?.data.as_ref()?;
    let pem = |key: &str| data.get(key)
	.and_then(|bytes| String::from_utf8(bytes.0.clone()).ok())
	.filter(|pem| !pem.trim().is_empty());

    Some(crypto::CertificateAuthority{
	cert_pem: pem(CA_CERT_KEY)?,
	key_pem: pem(CA_KEY_KEY)?,
    })
}

impl ObservabilityOverlay {

    pub fn new(kube_client: KubeClient, opts: ObservabilityOptions) -> Self {
	Self{
	    kube_client,
	    opts,
	}
    }

    /*
     * Loads the CA stored by an earlier run, generating and storing a new
     * one only when none exists and create_ca is set.
     */
    async fn ensure_ca(&self, labels: &BTreeMap<String, String>) -> Result<Option<crypto::CertificateAuthority>, InstallerError> {
	let ns = self.opts.namespace.as_str();
	let secrets: KubeApi<Secret> = KubeApi::namespaced(self.kube_client.clone(), ns);

	let stored = secrets.get_opt(CA_SECRET_NAME).await?;
	if let Some(ca) = existing_ca(stored.as_ref()) {
	    log::info!("Using existing observability certificate authority {}/{}", ns, CA_SECRET_NAME);
	    return Ok(Some(ca));
	}
	if stored.is_some() {
	    log::warn!("Secret {}/{} has no usable {} and {}", ns, CA_SECRET_NAME, CA_CERT_KEY, CA_KEY_KEY);
	}
	if !self.opts.create_ca {
	    log::warn!("No observability certificate authority found and CA creation is disabled");
	    return Ok(None);
	}

	log::info!("Creating observability certificate authority");
	let ca = crypto::generate_ca(CA_COMMON_NAME, CA_VALIDITY_DAYS)?;

	let mut data = BTreeMap::new();
	data.insert(String::from(CA_CERT_KEY), ca.cert_pem.clone().into_bytes());
	data.insert(String::from(CA_KEY_KEY), ca.key_pem.clone().into_bytes());

	let secret = manifests::secret(CA_SECRET_NAME, ns, labels, Some("kubernetes.io/tls"), data);
	apply::apply(&self.kube_client, None, &secret).await?;
	Ok(Some(ca))
    }

    async fn enable_relay(&self, labels: &BTreeMap<String, String>) -> Result<(), InstallerError> {
	let ns = self.opts.namespace.as_str();
	log::info!("Enabling observability relay in namespace {}", ns);

	let sa = manifests::service_account(RELAY_NAME, ns, labels);
	apply::apply(&self.kube_client, None, &sa).await?;
	apply::apply(&self.kube_client, None, &relay_workload(&self.opts).deployment(1)).await?;

	let svc = manifests::service(RELAY_NAME, ns, labels, RELAY_PORT);
	apply::apply(&self.kube_client, None, &svc).await?;
	Ok(())
    }

    /* Merges the overlay into the values Secret the networking install stored */
    async fn update_values(&self, labels: &BTreeMap<String, String>, ca: Option<&crypto::CertificateAuthority>) -> Result<(), InstallerError> {
	let ns = self.opts.namespace.as_str();
	let name = self.opts.helm_values_secret_name.as_str();
	let secrets: KubeApi<Secret> = KubeApi::namespaced(self.kube_client.clone(), ns);

	let stored = secrets.get_opt(name).await?;
	if stored.is_none() {
	    log::warn!("Values secret {}/{} not found, starting from an empty document", ns, name);
	}
	let bytes = stored.as_ref()
	    .and_then(|secret| secret.data.as_ref())
	    .and_then(|data| data.get(values::VALUES_KEY))
	    .map(|bytes| bytes.0.as_slice());

	let mut doc = values::from_secret_data(bytes)?;
	values::enable_observability(&mut doc, &self.opts, ca);
	if self.opts.redact_helm_cert_keys {
	    values::redact_cert_keys(&mut doc);
	}

	let secret = manifests::secret(name, ns, labels, None, values::to_secret_data(&doc)?);
	apply::apply(&self.kube_client, None, &secret).await?;
	Ok(())
    }
}

#[async_trait]
impl api::ObservabilityEnabler for ObservabilityOverlay {

    async fn enable(&self) -> Result<(), InstallerError> {
	let labels = manifests::labels(Component::Networking, RELAY_NAME);

	let ca = self.ensure_ca(&labels).await?;

	if self.opts.relay {
	    self.enable_relay(&labels).await?;
	}

	self.update_values(&labels, ca.as_ref()).await?;
	log::info!("Observability enabled");
	Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;

    fn ca_secret(entries: &[(&str, &str)]) -> Secret {
	let data = entries.iter()
	    .map(|(key, value)| (key.to_string(), ByteString(value.as_bytes().to_vec())))
	    .collect();
	Secret{
	    data: Some(data),
	    ..Secret::default()
	}
    }

    #[test]
    fn stored_ca_is_reused() {
	let secret = ca_secret(&[("tls.crt", "CERT"), ("tls.key", "KEY")]);
	let ca = existing_ca(Some(&secret)).unwrap();

	assert_eq!(ca.cert_pem, "CERT");
	assert_eq!(ca.key_pem, "KEY");
    }

    #[test]
    fn missing_or_partial_ca_is_not_reused() {
	assert!(existing_ca(None).is_none());
	assert!(existing_ca(Some(&Secret::default())).is_none());
	assert!(existing_ca(Some(&ca_secret(&[("tls.crt", "CERT")]))).is_none());
	assert!(existing_ca(Some(&ca_secret(&[("tls.crt", "CERT"), ("tls.key", "")]))).is_none());
    }

    #[test]
    fn relay_tracks_networking_version_and_exposes_its_port() {
	let opts = ObservabilityOptions{
	    namespace: String::from("net"),
	    version: String::from("v1.15.1"),
	    ..ObservabilityOptions::default()
	};
	let deploy = relay_workload(&opts).deployment(1);
	let container = &deploy.spec.unwrap().template.spec.unwrap().containers[0];

	assert_eq!(deploy.metadata.namespace.as_deref(), Some("net"));
	assert_eq!(container.image.as_deref(), Some("quay.io/cilium/hubble-relay:v1.15.1"));
	assert_eq!(container.ports.as_ref().map(|p| p[0].container_port), Some(RELAY_PORT));
    }
}
