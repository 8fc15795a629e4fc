//! In-memory fakes of the management and hosted cluster clients

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;

use permission_granter_operator::adapters::grant_builder::GrantObject;
use permission_granter_operator::adapters::local_client::{ClusterKey, LocalClient};
use permission_granter_operator::adapters::remote_client::{
    CreateOutcome, GrantTarget, RemoteClientFactory,
};
use permission_granter_operator::crd::{HostedCluster, HostedClusterSpec};
use permission_granter_operator::{Error, Result};

pub const NAMESPACE: &str = "clusters";

// ============================================================================
// Builders
// ============================================================================

pub fn hosted_cluster(name: &str, annotations: &[(&str, &str)]) -> HostedCluster {
    let annotations: BTreeMap<String, String> = annotations
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    HostedCluster {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            resource_version: Some("1".to_string()),
            annotations: if annotations.is_empty() {
                None
            } else {
                Some(annotations)
            },
            ..Default::default()
        },
        spec: HostedClusterSpec::default(),
    }
}

pub fn secret(namespace: &str, name: &str, data: &[(&str, &[u8])]) -> Secret {
    let data: BTreeMap<String, ByteString> = data
        .iter()
        .map(|(k, v)| (k.to_string(), ByteString(v.to_vec())))
        .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

pub fn kubeconfig_yaml(server: &str) -> String {
    format!(
        r#"apiVersion: v1
kind: Config
current-context: admin
clusters:
- name: hosted
  cluster:
    server: {server}
contexts:
- name: admin
  context:
    cluster: hosted
    user: admin
users:
- name: admin
  user:
    token: not-a-real-token
"#
    )
}

// ============================================================================
// Management cluster
// ============================================================================

/// Fake management cluster with optimistic concurrency on annotation writes
#[derive(Default)]
pub struct FakeLocalClient {
    clusters: Mutex<HashMap<ClusterKey, HostedCluster>>,
    secrets: Mutex<HashMap<(String, String), Secret>>,
    persists: AtomicUsize,
    reject_persist: AtomicBool,
}

impl FakeLocalClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_cluster(&self, cluster: HostedCluster) {
        let key = ClusterKey::from(&cluster);
        self.clusters.lock().unwrap().insert(key, cluster);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let namespace = secret.metadata.namespace.clone().unwrap_or_default();
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.secrets.lock().unwrap().insert((namespace, name), secret);
    }

    pub fn cluster(&self, name: &str) -> Option<HostedCluster> {
        self.clusters
            .lock()
            .unwrap()
            .get(&ClusterKey::new(NAMESPACE, name))
            .cloned()
    }

    pub fn annotations(&self, name: &str) -> BTreeMap<String, String> {
        self.cluster(name)
            .and_then(|c| c.metadata.annotations)
            .unwrap_or_default()
    }

    /// Simulate another writer updating the HostedCluster
    pub fn bump_resource_version(&self, name: &str) {
        let mut clusters = self.clusters.lock().unwrap();
        if let Some(cluster) = clusters.get_mut(&ClusterKey::new(NAMESPACE, name)) {
            let next = next_version(cluster.metadata.resource_version.as_deref());
            cluster.metadata.resource_version = Some(next);
        }
    }

    pub fn reject_persists(&self, reject: bool) {
        self.reject_persist.store(reject, Ordering::SeqCst);
    }

    pub fn persist_count(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }
}

fn next_version(current: Option<&str>) -> String {
    let version: u64 = current.and_then(|v| v.parse().ok()).unwrap_or(0);
    (version + 1).to_string()
}

#[async_trait]
impl LocalClient for FakeLocalClient {
    async fn get_hosted_cluster(&self, key: &ClusterKey) -> Result<Option<HostedCluster>> {
        Ok(self.clusters.lock().unwrap().get(key).cloned())
    }

    async fn persist_annotations(&self, cluster: &HostedCluster) -> Result<()> {
        self.persists.fetch_add(1, Ordering::SeqCst);

        if self.reject_persist.load(Ordering::SeqCst) {
            return Err(Error::PersistFailed("rejected by fake".to_string()));
        }

        let key = ClusterKey::from(cluster);
        let mut clusters = self.clusters.lock().unwrap();
        let stored = clusters
            .get_mut(&key)
            .ok_or_else(|| Error::PersistFailed(format!("{} does not exist", key)))?;

        if stored.metadata.resource_version != cluster.metadata.resource_version {
            return Err(Error::PersistFailed(format!(
                "{} was modified concurrently",
                key
            )));
        }

        // Merge patch semantics: keys are added or overwritten, never removed
        stored
            .metadata
            .annotations
            .get_or_insert_with(Default::default)
            .extend(cluster.metadata.annotations.clone().unwrap_or_default());
        stored.metadata.resource_version =
            Some(next_version(stored.metadata.resource_version.as_deref()));
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

// ============================================================================
// Hosted clusters
// ============================================================================

/// Fake hosted cluster recording every create call
#[derive(Default)]
pub struct FakeGrantTarget {
    created: Mutex<Vec<GrantObject>>,
    attempts: AtomicUsize,
    objects: Mutex<HashMap<(String, String), GrantObject>>,
    fail_creates: AtomicBool,
    hang_creates: AtomicBool,
}

impl FakeGrantTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> Vec<GrantObject> {
        self.created.lock().unwrap().clone()
    }

    pub fn create_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make every create wait forever, like an unresponsive API server
    pub fn hang_creates(&self, hang: bool) {
        self.hang_creates.store(hang, Ordering::SeqCst);
    }

    /// Current members of the group `name`
    pub fn group_members(&self, name: &str) -> Option<Vec<String>> {
        match self
            .objects
            .lock()
            .unwrap()
            .get(&("Group".to_string(), name.to_string()))
        {
            Some(GrantObject::Group(group)) => Some(group.users.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl GrantTarget for FakeGrantTarget {
    async fn create(&self, object: &GrantObject) -> Result<CreateOutcome> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.hang_creates.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }

        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Error::RemoteCreateFailed(format!(
                "{} {} rejected by fake",
                object.kind(),
                object.name()
            )));
        }

        let id = (object.kind().to_string(), object.name().to_string());
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&id) {
            // Existing groups take the new members, anything else is kept
            if let GrantObject::Group(_) = object {
                objects.insert(id, object.clone());
                return Ok(CreateOutcome::Updated);
            }
            return Ok(CreateOutcome::AlreadyExists);
        }

        objects.insert(id, object.clone());
        self.created.lock().unwrap().push(object.clone());
        Ok(CreateOutcome::Created)
    }
}

/// Fake factory handing out registered hosted clusters
#[derive(Default)]
pub struct FakeClientFactory {
    targets: Mutex<HashMap<String, Arc<FakeGrantTarget>>>,
    resolves: AtomicUsize,
    invalidations: AtomicUsize,
}

impl FakeClientFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, cluster_name: &str) -> Arc<FakeGrantTarget> {
        let target = FakeGrantTarget::new();
        self.targets
            .lock()
            .unwrap()
            .insert(cluster_name.to_string(), target.clone());
        target
    }

    /// Make `cluster_name` resolve to an existing hosted cluster
    pub fn register_target(&self, cluster_name: &str, target: Arc<FakeGrantTarget>) {
        self.targets
            .lock()
            .unwrap()
            .insert(cluster_name.to_string(), target);
    }

    pub fn unregister(&self, cluster_name: &str) {
        self.targets.lock().unwrap().remove(cluster_name);
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteClientFactory for FakeClientFactory {
    async fn resolve(&self, cluster_name: &str) -> Result<Arc<dyn GrantTarget>> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        let target = self.targets.lock().unwrap().get(cluster_name).cloned();
        match target {
            Some(target) => Ok(target),
            None => Err(Error::CredentialNotFound(format!(
                "no credentials for {}",
                cluster_name
            ))),
        }
    }

    fn invalidate(&self, _cluster_name: &str) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
