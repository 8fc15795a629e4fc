//! Reconciliation logic granting a HostedCluster's requester access to it
//!
//! Every invocation recomputes what to do from the current HostedCluster, so
//! re-delivered events are harmless:
//!
//! 1. fetch the HostedCluster, stop if it is gone
//! 2. read the requester annotation, stop if there is none
//! 3. stop if the marker annotation is already present
//! 4. resolve a client for the hosted cluster
//! 5. compose the grant objects
//! 6. create them on the hosted cluster
//! 7. write the marker annotation
//! 8. report what was done

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::grant_builder;
use crate::adapters::local_client::{ClusterKey, LocalClient};
use crate::adapters::remote_client::RemoteClientFactory;
use crate::config::{GrantMode, GranterConfig};
use crate::metrics::prometheus::GRANTS_ISSUED;
use crate::reconcilers::marker;
use crate::Result;

/// What a successful reconciliation did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The HostedCluster no longer exists
    NotFound,
    /// No requester is recorded on the HostedCluster
    NoRequester,
    /// The marker shows the grant was issued earlier
    AlreadyGranted,
    /// The grant was issued to `requester` and the marker written
    Granted { requester: String },
}

/// Grants HostedCluster requesters access to their hosted cluster
pub struct GrantReconciler {
    local: Arc<dyn LocalClient>,
    remotes: Arc<dyn RemoteClientFactory>,
    config: Arc<GranterConfig>,
}

impl GrantReconciler {
    pub fn new(
        local: Arc<dyn LocalClient>,
        remotes: Arc<dyn RemoteClientFactory>,
        config: Arc<GranterConfig>,
    ) -> Self {
        Self {
            local,
            remotes,
            config,
        }
    }

    pub fn config(&self) -> &GranterConfig {
        &self.config
    }

    /// Run one reconciliation of the HostedCluster identified by `key`
    pub async fn reconcile(&self, key: &ClusterKey) -> Result<ReconcileOutcome> {
        let keys = &self.config.annotations;

        let Some(mut cluster) = self.local.get_hosted_cluster(key).await? else {
            debug!("HostedCluster {} no longer exists", key);
            return Ok(ReconcileOutcome::NotFound);
        };

        let Some(requester) = marker::requester(&cluster, keys).map(str::to_string) else {
            debug!("HostedCluster {} has no requester annotation", key);
            return Ok(ReconcileOutcome::NoRequester);
        };

        if marker::has_been_granted(&cluster, keys) {
            debug!("HostedCluster {} was already granted", key);
            return Ok(ReconcileOutcome::AlreadyGranted);
        }

        let remote = self.remotes.resolve(&key.name).await?;

        let objects =
            grant_builder::compose_grant(self.config.grant_mode, &requester, &self.config.grant_names);

        let mut changed = false;
        for object in &objects {
            match remote.create(object).await {
                Ok(outcome) => {
                    info!(
                        "{} {} on hosted cluster {}: {:?}",
                        object.kind(),
                        object.name(),
                        key.name,
                        outcome
                    );
                    changed |= outcome.changed();
                }
                Err(e) => {
                    // The cached client may hold rotated credentials
                    self.remotes.invalidate(&key.name);
                    return Err(e);
                }
            }
        }

        // A retry after a failed marker write finds the grant already in place
        if changed {
            GRANTS_ISSUED.with_label_values(&[mode_label(&self.config)]).inc();
        }
        info!("User {} received access to hosted cluster {}", requester, key.name);

        if let Err(e) = marker::mark_granted(self.local.as_ref(), &mut cluster, &requester, keys).await
        {
            warn!(
                "Grant issued on hosted cluster {} but marking HostedCluster {} failed: {}",
                key.name, key, e
            );
            return Err(e);
        }

        Ok(ReconcileOutcome::Granted { requester })
    }
}

fn mode_label(config: &GranterConfig) -> &'static str {
    match config.grant_mode {
        GrantMode::ClusterAdmin => "cluster-admin",
        GrantMode::CustomAdminGroup => "custom-admin-group",
    }
}
