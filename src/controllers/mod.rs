//! Controller implementations for watching and reconciling resources

pub mod hosted_cluster_controller;

use kube::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::adapters::client_cache::CachedClientFactory;
use crate::adapters::local_client::{KubeLocalClient, LocalClient};
use crate::adapters::remote_client::{KubeconfigClientFactory, RemoteClientFactory};
use crate::config::GranterConfig;
use crate::reconcilers::GrantReconciler;

/// Shared context for controllers
pub struct Context {
    /// Kubernetes client for the management cluster
    pub client: Client,
    /// Grant logic shared by all reconciliations
    pub reconciler: GrantReconciler,
    /// Tripped when the operator shuts down
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a new context wired to the management cluster
    pub fn new(client: Client, config: GranterConfig, shutdown: CancellationToken) -> Arc<Self> {
        let local: Arc<dyn LocalClient> = Arc::new(KubeLocalClient::new(client.clone()));

        let factory: Arc<dyn RemoteClientFactory> = Arc::new(KubeconfigClientFactory::new(
            local.clone(),
            config.credentials.clone(),
        ));
        let remotes: Arc<dyn RemoteClientFactory> = match config.client_cache_ttl {
            Some(ttl) => Arc::new(CachedClientFactory::new(factory, ttl)),
            None => factory,
        };

        let reconciler = GrantReconciler::new(local, remotes, Arc::new(config));

        Arc::new(Self {
            client,
            reconciler,
            shutdown,
        })
    }
}
