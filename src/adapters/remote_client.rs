//! Clients for hosted clusters
//!
//! Each hosted cluster's admin kubeconfig lives in a secret on the management
//! cluster. [`KubeconfigClientFactory`] turns that secret into a
//! [`GrantTarget`] able to create grant objects on the hosted cluster.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding};
use kube::api::{DynamicObject, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::debug;

use crate::adapters::grant_builder::GrantObject;
use crate::adapters::local_client::LocalClient;
use crate::adapters::secrets;
use crate::config::{CredentialNaming, FIELD_MANAGER};
use crate::crd::Group;
use crate::error::is_already_exists;
use crate::{Error, Result};

/// Result of creating a grant object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// An object with the same name was already present
    AlreadyExists,
    /// An existing object was brought in line with the requested one
    Updated,
}

impl CreateOutcome {
    /// Whether the hosted cluster changed
    pub fn changed(self) -> bool {
        matches!(self, CreateOutcome::Created | CreateOutcome::Updated)
    }
}

/// A hosted cluster grant objects can be created on
#[async_trait]
pub trait GrantTarget: Send + Sync {
    /// Create `object`
    ///
    /// An existing object of the same name counts as success, except a
    /// [`Group`], whose members are replaced by those of `object`.
    async fn create(&self, object: &GrantObject) -> Result<CreateOutcome>;
}

/// Resolves a client for a hosted cluster by name
#[async_trait]
pub trait RemoteClientFactory: Send + Sync {
    /// Build a client for the hosted cluster `cluster_name`
    async fn resolve(&self, cluster_name: &str) -> Result<Arc<dyn GrantTarget>>;

    /// Forget anything remembered about `cluster_name`
    fn invalidate(&self, _cluster_name: &str) {}
}

/// [`GrantTarget`] backed by a kube client for the hosted cluster
#[derive(Clone)]
pub struct KubeGrantTarget {
    client: Client,
}

impl KubeGrantTarget {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GrantTarget for KubeGrantTarget {
    async fn create(&self, object: &GrantObject) -> Result<CreateOutcome> {
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };

        let result = match object {
            GrantObject::ClusterRoleBinding(crb) => {
                let api: Api<ClusterRoleBinding> = Api::all(self.client.clone());
                api.create(&params, crb).await.map(|_| CreateOutcome::Created)
            }
            GrantObject::Group(group) => {
                let api: Api<DynamicObject> =
                    Api::all_with(self.client.clone(), &Group::api_resource());
                match api.create(&params, &group.to_dynamic()).await {
                    // Fixed group name: the latest requester replaces the members
                    Err(e) if is_already_exists(&e) => {
                        let patch_params = PatchParams {
                            field_manager: Some(FIELD_MANAGER.to_string()),
                            ..Default::default()
                        };
                        api.patch(
                            object.name(),
                            &patch_params,
                            &Patch::Merge(&group.membership_patch()),
                        )
                        .await
                        .map(|_| CreateOutcome::Updated)
                    }
                    other => other.map(|_| CreateOutcome::Created),
                }
            }
            GrantObject::RoleBinding(rb) => {
                let namespace = rb.metadata.namespace.as_deref().unwrap_or("default");
                let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
                api.create(&params, rb).await.map(|_| CreateOutcome::Created)
            }
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) if is_already_exists(&e) => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(Error::RemoteCreateFailed(format!(
                "Failed to grant {} {}: {}",
                object.kind(),
                object.name(),
                e
            ))),
        }
    }
}

/// Resolves hosted cluster clients from admin kubeconfig secrets
pub struct KubeconfigClientFactory {
    local: Arc<dyn LocalClient>,
    naming: CredentialNaming,
}

impl KubeconfigClientFactory {
    pub fn new(local: Arc<dyn LocalClient>, naming: CredentialNaming) -> Self {
        Self { local, naming }
    }

    /// Read and decode the admin kubeconfig of `cluster_name`
    pub async fn load_kubeconfig(&self, cluster_name: &str) -> Result<Kubeconfig> {
        let namespace = self.naming.namespace_for(cluster_name);
        let secret = self
            .local
            .get_secret(&namespace, &self.naming.secret_name)
            .await?
            .ok_or_else(|| {
                Error::CredentialNotFound(format!(
                    "Secret {}/{} does not exist",
                    namespace, self.naming.secret_name
                ))
            })?;

        let data = secrets::get_secret_key(&secret, &self.naming.data_key)?;
        decode_kubeconfig(&data)
    }
}

#[async_trait]
impl RemoteClientFactory for KubeconfigClientFactory {
    async fn resolve(&self, cluster_name: &str) -> Result<Arc<dyn GrantTarget>> {
        let kubeconfig = self.load_kubeconfig(cluster_name).await?;
        let client = client_from_kubeconfig(kubeconfig).await?;

        debug!("Built client for hosted cluster {}", cluster_name);

        Ok(Arc::new(KubeGrantTarget::new(client)))
    }
}

/// Parse a serialized kubeconfig
pub fn decode_kubeconfig(data: &[u8]) -> Result<Kubeconfig> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::CredentialMalformed(format!("Invalid UTF-8 in kubeconfig: {}", e)))?;

    serde_yaml::from_str(text)
        .map_err(|e| Error::CredentialMalformed(format!("Invalid kubeconfig YAML: {}", e)))
}

/// Build a client from a kubeconfig, using its current context
pub async fn client_from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Client> {
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| {
            Error::ClientConstructionFailed(format!("Failed to load kubeconfig: {}", e))
        })?;

    Client::try_from(config)
        .map_err(|e| Error::ClientConstructionFailed(format!("Failed to create client: {}", e)))
}
