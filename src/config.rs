//! Operator configuration
//!
//! Annotation keys, credential naming and grant object names are injected
//! through [`GranterConfig`] rather than read from globals, so tests can
//! substitute their own values.

use std::time::Duration;

/// Default annotation written by the cluster provisioner with the requester
pub const DEFAULT_REQUESTER_ANNOTATION: &str = "dana.io/requester";

/// Default annotation recording that the grant has been issued
pub const DEFAULT_MARKER_ANNOTATION: &str = "dana.io/addedclusteradmin";

/// Default prefix of the namespace holding a hosted cluster's control plane
pub const DEFAULT_CREDENTIAL_NAMESPACE_PREFIX: &str = "clusters-";

/// Default name of the admin kubeconfig secret
pub const DEFAULT_CREDENTIAL_SECRET_NAME: &str = "admin-kubeconfig";

/// Default data key of the kubeconfig inside the secret
pub const DEFAULT_CREDENTIAL_DATA_KEY: &str = "kubeconfig";

/// Default number of HostedClusters reconciled in parallel
pub const DEFAULT_CONCURRENCY: u16 = 10;

/// Field manager used for writes to the management cluster
pub const FIELD_MANAGER: &str = "permission-granter-operator";

/// Which kind of access grant is issued to the requester
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum GrantMode {
    /// A ClusterRoleBinding to the highest-privilege ClusterRole
    #[default]
    ClusterAdmin,
    /// A Group containing the requester plus a RoleBinding for that group
    CustomAdminGroup,
}

/// Annotation keys read and written on HostedClusters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationKeys {
    pub requester: String,
    pub marker: String,
}

impl Default for AnnotationKeys {
    fn default() -> Self {
        Self {
            requester: DEFAULT_REQUESTER_ANNOTATION.to_string(),
            marker: DEFAULT_MARKER_ANNOTATION.to_string(),
        }
    }
}

/// Location of a hosted cluster's admin kubeconfig in the management cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialNaming {
    pub namespace_prefix: String,
    pub secret_name: String,
    pub data_key: String,
}

impl CredentialNaming {
    /// Namespace of the credential secret for `cluster_name`
    pub fn namespace_for(&self, cluster_name: &str) -> String {
        format!("{}{}", self.namespace_prefix, cluster_name)
    }
}

impl Default for CredentialNaming {
    fn default() -> Self {
        Self {
            namespace_prefix: DEFAULT_CREDENTIAL_NAMESPACE_PREFIX.to_string(),
            secret_name: DEFAULT_CREDENTIAL_SECRET_NAME.to_string(),
            data_key: DEFAULT_CREDENTIAL_DATA_KEY.to_string(),
        }
    }
}

/// Names and roles of the grant objects created on hosted clusters
///
/// The group and its binding have fixed names shared by every requester, so
/// two requesters granted on the same hosted cluster collide on one Group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantNames {
    /// ClusterRole bound to the requester in [`GrantMode::ClusterAdmin`]
    pub cluster_admin_role: String,
    /// Group created in [`GrantMode::CustomAdminGroup`]
    pub group_name: String,
    /// RoleBinding granting the group its role
    pub group_binding_name: String,
    /// ClusterRole granted to the group
    pub group_role: String,
    /// Namespace the group's RoleBinding lives in
    pub group_namespace: String,
}

impl Default for GrantNames {
    fn default() -> Self {
        Self {
            cluster_admin_role: "cluster-admin".to_string(),
            group_name: "custom-admins".to_string(),
            group_binding_name: "custom-admins-edit".to_string(),
            group_role: "edit".to_string(),
            group_namespace: "default".to_string(),
        }
    }
}

/// Complete operator configuration
#[derive(Clone, Debug)]
pub struct GranterConfig {
    pub annotations: AnnotationKeys,
    pub credentials: CredentialNaming,
    pub grant_names: GrantNames,
    pub grant_mode: GrantMode,
    /// Maximum number of HostedClusters reconciled concurrently
    pub concurrency: u16,
    /// Deadline for a single reconciliation
    pub reconcile_timeout: Duration,
    /// Lifetime of cached hosted cluster clients; `None` disables caching
    pub client_cache_ttl: Option<Duration>,
}

impl Default for GranterConfig {
    fn default() -> Self {
        Self {
            annotations: AnnotationKeys::default(),
            credentials: CredentialNaming::default(),
            grant_names: GrantNames::default(),
            grant_mode: GrantMode::default(),
            concurrency: DEFAULT_CONCURRENCY,
            reconcile_timeout: Duration::from_secs(30),
            client_cache_ttl: None,
        }
    }
}
