//! Per-cluster cache of hosted cluster clients

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::adapters::remote_client::{GrantTarget, RemoteClientFactory};
use crate::Result;

struct CachedClient {
    client: Arc<dyn GrantTarget>,
    resolved_at: Instant,
}

/// Caches resolved clients for `ttl`
///
/// A failed resolution drops the cached entry for that cluster, as does
/// [`RemoteClientFactory::invalidate`], so rotated credentials are picked up
/// on the next attempt.
pub struct CachedClientFactory {
    inner: Arc<dyn RemoteClientFactory>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedClient>>,
}

impl CachedClientFactory {
    pub fn new(inner: Arc<dyn RemoteClientFactory>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of clusters with a cached client, fresh or not
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedClient>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, cluster_name: &str) -> Option<Arc<dyn GrantTarget>> {
        let mut entries = self.entries();
        let cached = entries
            .get(cluster_name)
            .map(|c| (c.resolved_at.elapsed() < self.ttl, c.client.clone()));

        match cached {
            Some((true, client)) => Some(client),
            Some((false, _)) => {
                entries.remove(cluster_name);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl RemoteClientFactory for CachedClientFactory {
    async fn resolve(&self, cluster_name: &str) -> Result<Arc<dyn GrantTarget>> {
        if let Some(client) = self.lookup(cluster_name) {
            debug!("Using cached client for hosted cluster {}", cluster_name);
            return Ok(client);
        }

        match self.inner.resolve(cluster_name).await {
            Ok(client) => {
                self.entries().insert(
                    cluster_name.to_string(),
                    CachedClient {
                        client: client.clone(),
                        resolved_at: Instant::now(),
                    },
                );
                Ok(client)
            }
            Err(e) => {
                self.invalidate(cluster_name);
                Err(e)
            }
        }
    }

    fn invalidate(&self, cluster_name: &str) {
        if self.entries().remove(cluster_name).is_some() {
            debug!("Dropped cached client for hosted cluster {}", cluster_name);
        }
        self.inner.invalidate(cluster_name);
    }
}
