use kinstall_api::Component;

use k8s_openapi::ByteString;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::apps::v1::DaemonSetSpec;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::core::v1::ConfigMapVolumeSource;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::ContainerPort;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::core::v1::SecurityContext;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::core::v1::ServicePort;
use k8s_openapi::api::core::v1::ServiceSpec;
use k8s_openapi::api::core::v1::Volume;
use k8s_openapi::api::core::v1::VolumeMount;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "kinstall";

const CONFIG_VOLUME: &str = "config";

/*
 * Labels stamped on everything we create. The name label doubles as the
 * workload selector, so it must stay stable across upgrades.
 */
pub fn labels(component: Component, app: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();

    labels.insert(String::from(LABEL_NAME), app.to_string());
    labels.insert(String::from(LABEL_PART_OF), component.to_string());
    labels.insert(String::from(LABEL_MANAGED_BY), String::from(MANAGED_BY));
    labels
}

fn selector_labels(labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels.iter()
	.filter(|(k, _)| k.as_str() == LABEL_NAME)
	.map(|(k, v)| (k.clone(), v.clone()))
	.collect()
}

pub fn object_meta(name: &str, namespace: Option<&str>, labels: &BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta{
	name: Some(name.to_string()),
	namespace: namespace.map(String::from),
	labels: Some(labels.clone()),
	..ObjectMeta::default()
    }
}

pub fn namespace(name: &str) -> Namespace {
    let mut labels = BTreeMap::new();
    labels.insert(String::from(LABEL_MANAGED_BY), String::from(MANAGED_BY));

    Namespace{
	metadata: object_meta(name, None, &labels),
	..Namespace::default()
    }
}

pub fn service_account(name: &str, namespace: &str, labels: &BTreeMap<String, String>) -> ServiceAccount {
    ServiceAccount{
	metadata: object_meta(name, Some(namespace), labels),
	..ServiceAccount::default()
    }
}

pub fn config_map(name: &str, namespace: &str, labels: &BTreeMap<String, String>, data: BTreeMap<String, String>) -> ConfigMap {
    ConfigMap{
	metadata: object_meta(name, Some(namespace), labels),
	data: Some(data),
	..ConfigMap::default()
    }
}

pub fn secret(name: &str, namespace: &str, labels: &BTreeMap<String, String>, type_: Option<&str>, data: BTreeMap<String, Vec<u8>>) -> Secret {
    let data = data.into_iter()
	.map(|(k, v)| (k, ByteString(v)))
	.collect();

    Secret{
	metadata: object_meta(name, Some(namespace), labels),
	type_: type_.map(String::from),
	data: Some(data),
	..Secret::default()
    }
}

pub fn service(name: &str, namespace: &str, labels: &BTreeMap<String, String>, port: i32) -> Service {
    Service{
	metadata: object_meta(name, Some(namespace), labels),
	spec: Some(ServiceSpec{
	    selector: Some(selector_labels(labels)),
	    ports: Some(vec![ServicePort{
		name: Some(String::from("grpc")),
		port,
		target_port: Some(IntOrString::Int(port)),
		..ServicePort::default()
	    }]),
	    ..ServiceSpec::default()
	}),
	..Service::default()
    }
}

/* A ConfigMap mounted read-only into the workload container */
#[derive(Debug, Clone)]
pub struct ConfigMount {
    pub config_map: String,
    pub mount_path: String,
}

/*
 * Workload describes the single-container pods every component runs.
 * It renders into either a DaemonSet or a Deployment.
 */
#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub image: String,
    pub service_account: String,
    pub args: Vec<String>,
    pub port: Option<i32>,
    pub config: Option<ConfigMount>,
    pub host_network: bool,
    pub host_pid: bool,
    pub privileged: bool,
}

impl Workload {

    fn container(&self) -> Container {
	Container{
	    name: self.name.clone(),
	    image: Some(self.image.clone()),
	    args: if self.args.is_empty() { None } else { Some(self.args.clone()) },
	    ports: self.port.map(|port| vec![ContainerPort{
		container_port: port,
		..ContainerPort::default()
	    }]),
	    security_context: self.privileged.then(|| SecurityContext{
		privileged: Some(true),
		..SecurityContext::default()
	    }),
	    volume_mounts: self.config.as_ref().map(|config| vec![VolumeMount{
		name: String::from(CONFIG_VOLUME),
		mount_path: config.mount_path.clone(),
		read_only: Some(true),
		..VolumeMount::default()
	    }]),
	    ..Container::default()
	}
    }

    pub fn pod_template(&self) -> PodTemplateSpec {
	PodTemplateSpec{
	    metadata: Some(ObjectMeta{
		labels: Some(self.labels.clone()),
		..ObjectMeta::default()
	    }),
	    spec: Some(PodSpec{
		containers: vec![self.container()],
		service_account_name: Some(self.service_account.clone()),
		host_network: self.host_network.then_some(true),
		host_pid: self.host_pid.then_some(true),
		volumes: self.config.as_ref().map(|config| vec![Volume{
		    name: String::from(CONFIG_VOLUME),
		    config_map: Some(ConfigMapVolumeSource{
			name: config.config_map.clone(),
			..ConfigMapVolumeSource::default()
		    }),
		    ..Volume::default()
		}]),
		..PodSpec::default()
	    }),
	}
    }

    fn selector(&self) -> LabelSelector {
	LabelSelector{
	    match_labels: Some(selector_labels(&self.labels)),
	    ..LabelSelector::default()
	}
    }

    pub fn daemon_set(&self) -> DaemonSet {
	DaemonSet{
	    metadata: object_meta(&self.name, Some(&self.namespace), &self.labels),
	    spec: Some(DaemonSetSpec{
		selector: self.selector(),
		template: self.pod_template(),
		..DaemonSetSpec::default()
	    }),
	    ..DaemonSet::default()
	}
    }

    pub fn deployment(&self, replicas: i32) -> Deployment {
	Deployment{
	    metadata: object_meta(&self.name, Some(&self.namespace), &self.labels),
	    spec: Some(DeploymentSpec{
		replicas: Some(replicas),
		selector: self.selector(),
		template: self.pod_template(),
		..DeploymentSpec::default()
	    }),
	    ..Deployment::default()
	}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload() -> Workload {
	Workload{
	    name: String::from("security-agent"),
	    namespace: String::from("kube-system"),
	    labels: labels(Component::SecurityAgent, "security-agent"),
	    image: String::from("kubearmor/kubearmor:stable"),
	    service_account: String::from("security-agent"),
	    config: Some(ConfigMount{
		config_map: String::from("security-agent-config"),
		mount_path: String::from("/etc/security-agent"),
	    }),
	    host_pid: true,
	    privileged: true,
	    ..Workload::default()
	}
    }

    #[test]
    fn daemon_set_selector_matches_its_pod_template() {
	let ds = workload().daemon_set();
	let spec = ds.spec.unwrap();
	let selector = spec.selector.match_labels.unwrap();
	let pod_labels = spec.template.metadata.unwrap().labels.unwrap();

	assert_eq!(selector.len(), 1);
	for (k, v) in selector {
	    assert_eq!(pod_labels.get(&k), Some(&v));
	}
    }

    #[test]
    fn pod_template_carries_workload_settings() {
	let template = workload().pod_template();
	let spec = template.spec.unwrap();
	let container = &spec.containers[0];

	assert_eq!(container.image.as_deref(), Some("kubearmor/kubearmor:stable"));
	assert_eq!(container.security_context.as_ref().and_then(|s| s.privileged), Some(true));
	assert!(container.env.is_none());
	assert_eq!(spec.host_pid, Some(true));
	assert_eq!(spec.host_network, None);

	let volumes = spec.volumes.unwrap();
	assert_eq!(volumes[0].config_map.as_ref().map(|c| c.name.as_str()), Some("security-agent-config"));
    }

    #[test]
    fn deployment_has_requested_replicas() {
	let deploy = workload().deployment(2);
	assert_eq!(deploy.spec.unwrap().replicas, Some(2));
	assert_eq!(deploy.metadata.namespace.as_deref(), Some("kube-system"));
    }

    #[test]
    fn service_selects_on_name_label_only() {
	let svc = service("relay", "kube-system", &labels(Component::Networking, "relay"), 4245);
	let selector = svc.spec.unwrap().selector.unwrap();

	assert_eq!(selector.len(), 1);
	assert_eq!(selector.get(LABEL_NAME).map(String::as_str), Some("relay"));
    }

    #[test]
    fn labels_mark_component_and_manager() {
	let labels = labels(Component::DiscoveryEngine, "discovery-engine");
	assert_eq!(labels.get(LABEL_PART_OF).map(String::as_str), Some("discovery-engine"));
	assert_eq!(labels.get(LABEL_MANAGED_BY).map(String::as_str), Some(MANAGED_BY));
    }
}
