//! Error types for the Permission Granter Operator

use thiserror::Error;

/// Result type for the operator
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the operator
///
/// Every variant is retryable: the controller's error policy requeues the
/// HostedCluster and the next invocation recomputes state from scratch.
#[derive(Debug, Error)]
pub enum Error {
    /// Local Kubernetes API error while reading state
    #[error("Kubernetes API error: {0}")]
    KubeError(String),

    /// The admin kubeconfig secret, or its data key, does not exist yet
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    /// The admin kubeconfig could not be decoded
    #[error("Credential malformed: {0}")]
    CredentialMalformed(String),

    /// A client for the hosted cluster could not be built from its kubeconfig
    #[error("Client construction failed: {0}")]
    ClientConstructionFailed(String),

    /// The hosted cluster rejected a grant object
    #[error("Remote create failed: {0}")]
    RemoteCreateFailed(String),

    /// The marker annotation could not be written back to the HostedCluster
    #[error("Persist failed: {0}")]
    PersistFailed(String),

    /// Reconciliation deadline elapsed or the operator is shutting down
    #[error("Reconciliation cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    /// Short label for metrics
    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::KubeError(_) => "kube",
            Error::CredentialNotFound(_) => "credential_not_found",
            Error::CredentialMalformed(_) => "credential_malformed",
            Error::ClientConstructionFailed(_) => "client_construction_failed",
            Error::RemoteCreateFailed(_) => "remote_create_failed",
            Error::PersistFailed(_) => "persist_failed",
            Error::Cancelled(_) => "cancelled",
        }
    }
}

/// Whether a kube API error is a `409 AlreadyExists`
///
/// A `409 Conflict` on update carries the same code, so the reason is checked.
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists")
}
