//! Access to the management cluster
//!
//! The reconciler and the remote client factory only see [`LocalClient`],
//! which keeps them testable without an API server.

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

use crate::adapters::secrets;
use crate::config::FIELD_MANAGER;
use crate::crd::HostedCluster;
use crate::{Error, Result};

/// Identity of a HostedCluster in the management cluster
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClusterKey {
    pub namespace: String,
    pub name: String,
}

impl ClusterKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl From<&HostedCluster> for ClusterKey {
    fn from(cluster: &HostedCluster) -> Self {
        Self {
            namespace: cluster.namespace().unwrap_or_default(),
            name: cluster.name_any(),
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Merge patch writing back the HostedCluster's annotations
///
/// Annotations are only added or overwritten, never removed. The
/// resourceVersion turns the patch into a compare-and-swap.
pub fn annotation_patch(cluster: &HostedCluster) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "resourceVersion": cluster.resource_version(),
            "annotations": cluster.annotations(),
        }
    })
}

/// Operations the operator performs against the management cluster
#[async_trait]
pub trait LocalClient: Send + Sync {
    /// Fetch the current state of a HostedCluster, `None` if it was deleted
    async fn get_hosted_cluster(&self, key: &ClusterKey) -> Result<Option<HostedCluster>>;

    /// Write the HostedCluster's annotations back
    ///
    /// Implementations must reject the write if the object changed since it
    /// was read, and report rejection as [`Error::PersistFailed`].
    async fn persist_annotations(&self, cluster: &HostedCluster) -> Result<()>;

    /// Fetch a secret, `None` if it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;
}

/// [`LocalClient`] backed by the in-cluster Kubernetes client
#[derive(Clone)]
pub struct KubeLocalClient {
    client: Client,
}

impl KubeLocalClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LocalClient for KubeLocalClient {
    async fn get_hosted_cluster(&self, key: &ClusterKey) -> Result<Option<HostedCluster>> {
        let clusters: Api<HostedCluster> = Api::namespaced(self.client.clone(), &key.namespace);
        clusters.get_opt(&key.name).await.map_err(|e| {
            Error::KubeError(format!("Failed to get HostedCluster {}: {}", key, e))
        })
    }

    async fn persist_annotations(&self, cluster: &HostedCluster) -> Result<()> {
        let key = ClusterKey::from(cluster);
        let clusters: Api<HostedCluster> = Api::namespaced(self.client.clone(), &key.namespace);

        let patch = annotation_patch(cluster);

        clusters
            .patch(
                &key.name,
                &PatchParams {
                    field_manager: Some(FIELD_MANAGER.to_string()),
                    ..Default::default()
                },
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| {
                Error::PersistFailed(format!(
                    "Failed to update annotations of HostedCluster {}: {}",
                    key, e
                ))
            })?;

        debug!("Persisted annotations of HostedCluster {}", key);

        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        secrets::get_secret(&self.client, namespace, name).await
    }
}
