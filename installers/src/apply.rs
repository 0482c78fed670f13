use kinstall_api::InstallerError;

use crate::manifests;

use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::Api as KubeApi;
use kube::Client as KubeClient;
use kube::Error as KubeError;
use kube::Resource;
use kube::api::DeleteParams as KubeDeleteParams;
use kube::api::Patch as KubePatch;
use kube::api::PatchParams as KubePatchParams;
use kube::api::PostParams as KubePostParams;
use kube::runtime::wait::await_condition;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

/* server-side apply field manager for every object we own */
pub const FIELD_MANAGER: &str = "kinstall";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    Namespace,
    Secret,
    ServiceAccount,
    ConfigMap,
    Service,
    DaemonSet,
    Deployment,
}

/* Maps a k8s-openapi type onto the Kind we record for rollback */
pub trait TrackedKind {
    const KIND: Kind;
}

impl TrackedKind for Secret { const KIND: Kind = Kind::Secret; }
impl TrackedKind for ServiceAccount { const KIND: Kind = Kind::ServiceAccount; }
impl TrackedKind for ConfigMap { const KIND: Kind = Kind::ConfigMap; }
impl TrackedKind for Service { const KIND: Kind = Kind::Service; }
impl TrackedKind for DaemonSet { const KIND: Kind = Kind::DaemonSet; }
impl TrackedKind for Deployment { const KIND: Kind = Kind::Deployment; }

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRef {
    pub kind: Kind,
    pub namespace: String,
    pub name: String,
}

/*
 * Tracker remembers, in order, every object an installer created so a
 * failed install can be unwound newest-first.
 */
#[derive(Debug, Default)]
pub struct Tracker {
    applied: Mutex<Vec<AppliedRef>>,
}

impl Tracker {

    pub fn record(&self, kind: Kind, namespace: &str, name: &str) {
	let mut applied = match self.applied.lock() {
	    Ok(guard) => guard,
	    Err(poisoned) => poisoned.into_inner(),
	};
	let object = AppliedRef{
	    kind,
	    namespace: namespace.to_string(),
	    name: name.to_string(),
	};

	if !applied.contains(&object) {
	    applied.push(object);
	}
    }

    pub fn applied(&self) -> Vec<AppliedRef> {
	match self.applied.lock() {
	    Ok(guard) => guard.clone(),
	    Err(poisoned) => poisoned.into_inner().clone(),
	}
    }

    fn take(&self) -> Vec<AppliedRef> {
	let mut applied = match self.applied.lock() {
	    Ok(guard) => guard,
	    Err(poisoned) => poisoned.into_inner(),
	};
	std::mem::take(&mut *applied)
    }

    /*
     * Deletes every recorded object, newest first. Deletion carries on past
     * individual failures; the error reports how many were left behind.
     */
    pub async fn rollback(&self, kube_client: &KubeClient) -> Result<(), InstallerError> {
	let mut failed = 0;

	for object in self.take().into_iter().rev() {
	    log::info!("Rolling back {:?} {}/{}", object.kind, object.namespace, object.name);

	    if let Err(err) = delete_applied(kube_client, &object).await {
		failed += 1;
		log::error!("Unable to delete {:?} {}/{}: {}", object.kind, object.namespace, object.name, err);
	    }
	}

	if failed > 0 {
	    return Err(InstallerError::Other(format!("{} object(s) could not be rolled back", failed)));
	}
	Ok(())
    }
}

async fn delete_applied(kube_client: &KubeClient, object: &AppliedRef) -> Result<(), KubeError> {
    let (ns, name) = (object.namespace.as_str(), object.name.as_str());

    match object.kind {
	Kind::Namespace => delete(KubeApi::<Namespace>::all(kube_client.clone()), name).await,
	Kind::Secret => delete(KubeApi::<Secret>::namespaced(kube_client.clone(), ns), name).await,
	Kind::ServiceAccount => delete(KubeApi::<ServiceAccount>::namespaced(kube_client.clone(), ns), name).await,
	Kind::ConfigMap => delete(KubeApi::<ConfigMap>::namespaced(kube_client.clone(), ns), name).await,
	Kind::Service => delete(KubeApi::<Service>::namespaced(kube_client.clone(), ns), name).await,
	Kind::DaemonSet => delete(KubeApi::<DaemonSet>::namespaced(kube_client.clone(), ns), name).await,
	Kind::Deployment => delete(KubeApi::<Deployment>::namespaced(kube_client.clone(), ns), name).await,
    }
}

/* Deletes `name`, treating an already missing object as success */
async fn delete<K>(api: KubeApi<K>, name: &str) -> Result<(), KubeError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    match api.delete(name, &KubeDeleteParams::background()).await {
	Ok(_) => Ok(()),
	Err(KubeError::Api(resp)) if resp.code == 404 => Ok(()),
	Err(err) => Err(err),
    }
}

/*
 * Server-side applies a namespaced object and records it in the tracker,
 * if the caller keeps one.
 */
pub async fn apply<K>(kube_client: &KubeClient, tracker: Option<&Tracker>, obj: &K) -> Result<K, InstallerError>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + TrackedKind + Clone + DeserializeOwned + Serialize + Debug,
{
    let meta = obj.meta();
    let (name, namespace) = match (&meta.name, &meta.namespace) {
	(Some(name), Some(namespace)) => (name.clone(), namespace.clone()),
	_ => {
	    let errmsg = format!("{} is missing a name or namespace", K::kind(&()));
	    return Err(InstallerError::Other(errmsg));
	}
    };

    log::debug!("Applying {} {}/{}", K::kind(&()), namespace, name);
    let api: KubeApi<K> = KubeApi::namespaced(kube_client.clone(), &namespace);
    let params = KubePatchParams::apply(FIELD_MANAGER).force();
    let applied = api.patch(&name, &params, &KubePatch::Apply(obj)).await?;

    if let Some(tracker) = tracker {
	tracker.record(K::KIND, &namespace, &name);
    }
    Ok(applied)
}

/*
 * Creates the namespace when it's missing. Only a namespace we created
 * ourselves is recorded, so a rollback never removes a pre-existing one.
 */
pub async fn ensure_namespace(kube_client: &KubeClient, tracker: Option<&Tracker>, name: &str) -> Result<(), InstallerError> {
    let namespaces: KubeApi<Namespace> = KubeApi::all(kube_client.clone());

    if namespaces.get_opt(name).await?.is_some() {
	log::debug!("Namespace {} already exists", name);
	return Ok(());
    }

    log::info!("Creating namespace {}", name);
    namespaces.create(&KubePostParams::default(), &manifests::namespace(name)).await?;
    if let Some(tracker) = tracker {
	tracker.record(Kind::Namespace, "", name);
    }
    Ok(())
}

pub fn is_daemon_set_ready(ds: Option<&DaemonSet>) -> bool {
    let status = match ds.and_then(|ds| ds.status.as_ref()) {
	Some(status) => status,
	None => return false,
    };
    let generation = ds.and_then(|ds| ds.metadata.generation);

    let observed = generation.is_none() || status.observed_generation >= generation;
    let updated = status.updated_number_scheduled.unwrap_or(0);

    observed
	&& status.desired_number_scheduled > 0
	&& status.number_ready == status.desired_number_scheduled
	&& updated == status.desired_number_scheduled
}

pub async fn wait_for_daemon_set(kube_client: &KubeClient, namespace: &str, name: &str, timeout: Duration) -> Result<(), InstallerError> {
    let api: KubeApi<DaemonSet> = KubeApi::namespaced(kube_client.clone(), namespace);
    let what = format!("daemonset {}/{} to become ready", namespace, name);

    log::info!("Waiting up to {:?} for {}", timeout, what);
    match tokio::time::timeout(timeout, await_condition(api, name, is_daemon_set_ready)).await {
	Err(_) => Err(InstallerError::Timeout{ what, after: timeout }),
	Ok(Err(err)) => Err(InstallerError::Other(format!("watching {}: {}", what, err))),
	Ok(Ok(_)) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DaemonSetStatus;
    use kube::api::ObjectMeta;

    fn daemon_set(generation: i64, status: DaemonSetStatus) -> DaemonSet {
	DaemonSet{
	    metadata: ObjectMeta{
		generation: Some(generation),
		..ObjectMeta::default()
	    },
	    status: Some(status),
	    ..DaemonSet::default()
	}
    }

    #[test]
    fn daemon_set_readiness() {
	let ready = DaemonSetStatus{
	    desired_number_scheduled: 3,
	    number_ready: 3,
	    updated_number_scheduled: Some(3),
	    observed_generation: Some(2),
	    ..DaemonSetStatus::default()
	};
	assert!(is_daemon_set_ready(Some(&daemon_set(2, ready.clone()))));

	/* status is from an older spec */
	assert!(!is_daemon_set_ready(Some(&daemon_set(3, ready.clone()))));

	let rolling = DaemonSetStatus{ number_ready: 2, ..ready.clone() };
	assert!(!is_daemon_set_ready(Some(&daemon_set(2, rolling))));

	let unscheduled = DaemonSetStatus{ desired_number_scheduled: 0, number_ready: 0, updated_number_scheduled: None, ..ready };
	assert!(!is_daemon_set_ready(Some(&daemon_set(2, unscheduled))));

	assert!(!is_daemon_set_ready(None));
    }

    #[test]
    fn tracker_keeps_order_and_ignores_duplicates() {
	let tracker = Tracker::default();
	tracker.record(Kind::Namespace, "", "net");
	tracker.record(Kind::Secret, "net", "values");
	tracker.record(Kind::DaemonSet, "net", "agent");
	tracker.record(Kind::Secret, "net", "values");

	let kinds: Vec<Kind> = tracker.applied().iter().map(|o| o.kind).collect();
	assert_eq!(kinds, vec![Kind::Namespace, Kind::Secret, Kind::DaemonSet]);

	assert_eq!(tracker.take().len(), 3);
	assert!(tracker.applied().is_empty());
    }
}
