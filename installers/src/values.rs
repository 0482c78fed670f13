use kinstall_api::Encryption;
use kinstall_api::InstallerError;
use kinstall_api::NetworkingOptions;
use kinstall_api::ObservabilityOptions;

use crate::crypto::CertificateAuthority;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use std::collections::BTreeMap;

/* the data key the values document is stored under in its Secret */
pub const VALUES_KEY: &str = "values.json";

/*
 * Renders the networking values document. It is persisted in the values
 * Secret so later steps (and later runs) can see what was installed.
 */
pub fn networking_values(opts: &NetworkingOptions) -> Value {
    json!({
	"version": opts.version,
	"baseVersion": opts.base_version,
	"cluster": {
	    "id": opts.cluster_id,
	},
	"encryption": {
	    "enabled": opts.encryption.enabled(),
	    "type": opts.encryption,
	    "nodeEncryption": opts.node_encryption,
	},
    })
}

/*
 * The agent reads its configuration as flat key/value files from the
 * mounted ConfigMap.
 */
pub fn agent_config(opts: &NetworkingOptions) -> BTreeMap<String, String> {
    let mut config = BTreeMap::new();

    config.insert(String::from("cluster-id"), opts.cluster_id.to_string());
    config.insert(String::from("base-version"), opts.base_version.clone());
    config.insert(String::from("enable-ipsec"), (opts.encryption == Encryption::Ipsec).to_string());
    config.insert(String::from("enable-wireguard"), (opts.encryption == Encryption::Wireguard).to_string());
    config.insert(String::from("encrypt-node"), (opts.encryption.enabled() && opts.node_encryption).to_string());
    config
}

/* Merges the observability overlay into an existing values document */
pub fn enable_observability(values: &mut Value, opts: &ObservabilityOptions, ca: Option<&CertificateAuthority>) {
    if !values.is_object() {
	*values = Value::Object(Map::new());
    }

    let mut overlay = json!({
	"enabled": true,
	"relay": {
	    "enabled": opts.relay,
	},
    });
    if let Some(ca) = ca {
	overlay["tls"] = json!({
	    "ca": {
		"cert": ca.cert_pem,
		"key": ca.key_pem,
	    },
	});
    }

    values["observability"] = overlay;
}

/*
 * Strips private keys from every cert/key pair in the document so the
 * stored values never carry key material.
 */
pub fn redact_cert_keys(values: &mut Value) {
    match values {
	Value::Object(map) => {
	    if map.contains_key("cert") {
		map.remove("key");
	    }
	    for child in map.values_mut() {
		redact_cert_keys(child);
	    }
	},
	Value::Array(items) => {
	    for item in items {
		redact_cert_keys(item);
	    }
	},
	_ => {},
    }
}

pub fn to_secret_data(values: &Value) -> Result<BTreeMap<String, Vec<u8>>, InstallerError> {
    let encoded = serde_json::to_vec_pretty(values)
	.map_err(|source| InstallerError::Serialize{ what: String::from("values"), source })?;

    let mut data = BTreeMap::new();
    data.insert(String::from(VALUES_KEY), encoded);
    Ok(data)
}

/* Reads a values document back; missing or empty data yields an empty one */
pub fn from_secret_data(data: Option<&[u8]>) -> Result<Value, InstallerError> {
    match data {
	None => Ok(Value::Object(Map::new())),
	Some(bytes) if bytes.is_empty() => Ok(Value::Object(Map::new())),
	Some(bytes) => serde_json::from_slice(bytes)
	    .map_err(|source| InstallerError::Serialize{ what: String::from("stored values"), source }),
    }
}
