//! Controller for HostedCluster resources

use futures::{future, StreamExt, TryStreamExt};
use kube::{
    runtime::{
        controller::{self, Action, Controller},
        reflector, watcher,
        watcher::Config,
        WatchStreamExt,
    },
    Api, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::adapters::local_client::ClusterKey;
use crate::controllers::Context;
use crate::crd::HostedCluster;
use crate::metrics::prometheus::{
    OPERATOR_HEALTH, RECONCILE_DURATION, RECONCILIATIONS, RECONCILIATION_ERRORS,
};
use crate::reconcilers::{marker, GrantReconciler, ReconcileOutcome};
use crate::Error;

/// Run the HostedCluster controller
pub async fn run(ctx: Arc<Context>) {
    let config = ctx.reconciler.config().clone();
    let clusters: Api<HostedCluster> = Api::all(ctx.client.clone());

    info!(
        "Starting HostedCluster controller (concurrency {})",
        config.concurrency
    );

    // Changes to clusters that already carry the marker never reach the reconciler
    let keys = config.annotations.clone();
    let (reader, writer) = reflector::store();
    let stream = reflector(writer, watcher(clusters, Config::default().any_semantic()))
        .default_backoff()
        .applied_objects()
        .try_filter(move |cluster| future::ready(marker::should_reconcile(cluster, &keys)));

    OPERATOR_HEALTH.set(1.0);

    Controller::for_stream(stream, reader)
        .with_config(controller::Config::default().concurrency(config.concurrency))
        .graceful_shutdown_on(ctx.shutdown.clone().cancelled_owned())
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => info!("Reconciled {:?}", o),
                Err(e) => error!("Reconcile failed: {:?}", e),
            }
        })
        .await;

    OPERATOR_HEALTH.set(0.0);
    info!("HostedCluster controller stopped");
}

/// Reconcile a HostedCluster
#[instrument(skip(cluster, ctx), fields(name = %cluster.name_any(), namespace = %cluster.namespace().unwrap_or_default()))]
async fn reconcile(cluster: Arc<HostedCluster>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start = std::time::Instant::now();
    let key = ClusterKey::from(cluster.as_ref());
    let timeout = ctx.reconciler.config().reconcile_timeout;

    RECONCILIATIONS.with_label_values(&["HostedCluster"]).inc();

    let result = reconcile_with_deadline(&ctx.reconciler, &key, timeout, &ctx.shutdown).await;

    let duration = start.elapsed().as_secs_f64();
    RECONCILE_DURATION
        .with_label_values(&["HostedCluster"])
        .observe(duration);

    match &result {
        Ok(outcome) => info!(
            "Successfully reconciled {} in {:.2}s: {:?}",
            key, duration, outcome
        ),
        Err(e) => {
            RECONCILIATION_ERRORS
                .with_label_values(&["HostedCluster", e.metric_label()])
                .inc();
            error!("Failed to reconcile {}: {}", key, e);
        }
    }

    // Nothing to revisit until the HostedCluster changes
    result.map(|_| Action::await_change())
}

/// Run one reconciliation, giving up after `timeout` or once `shutdown` is cancelled
///
/// Giving up drops the reconciliation wherever it was, so a grant may have
/// been issued without the marker being written. Both surface as
/// [`Error::Cancelled`].
pub async fn reconcile_with_deadline(
    reconciler: &GrantReconciler,
    key: &ClusterKey,
    timeout: Duration,
    shutdown: &CancellationToken,
) -> Result<ReconcileOutcome, Error> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            Err(Error::Cancelled("operator is shutting down".to_string()))
        }
        res = tokio::time::timeout(timeout, reconciler.reconcile(key)) => {
            res.unwrap_or_else(|_| {
                Err(Error::Cancelled(format!(
                    "reconciliation exceeded {:?}",
                    timeout
                )))
            })
        }
    }
}

/// Error policy for the controller
fn error_policy(cluster: Arc<HostedCluster>, err: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        "Reconciliation error for {}: {:?}",
        ClusterKey::from(cluster.as_ref()),
        err
    );

    Action::requeue(requeue_delay(err))
}

/// Delay before retrying a HostedCluster whose reconciliation failed with `err`
pub fn requeue_delay(err: &Error) -> Duration {
    match err {
        // Marker write raced with another writer; state is fresh on retry
        Error::PersistFailed(_) => Duration::from_secs(5),
        Error::Cancelled(_) => Duration::from_secs(10),
        // The admin kubeconfig usually appears while the control plane comes up
        Error::CredentialNotFound(_) | Error::KubeError(_) => Duration::from_secs(30),
        Error::CredentialMalformed(_)
        | Error::ClientConstructionFailed(_)
        | Error::RemoteCreateFailed(_) => Duration::from_secs(60),
    }
}
