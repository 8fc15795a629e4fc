//! Permission Granter Kubernetes Operator
//!
//! Main entry point for the operator. Sets up the Kubernetes client,
//! registers the HostedCluster controller, and runs the reconciliation loop.

use std::time::Duration;

use clap::Parser;
use kube::Client;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use permission_granter_operator::{
    config::{
        AnnotationKeys, CredentialNaming, GrantMode, GrantNames, GranterConfig,
        DEFAULT_CONCURRENCY, DEFAULT_CREDENTIAL_DATA_KEY, DEFAULT_CREDENTIAL_NAMESPACE_PREFIX,
        DEFAULT_CREDENTIAL_SECRET_NAME, DEFAULT_MARKER_ANNOTATION, DEFAULT_REQUESTER_ANNOTATION,
    },
    controllers::{hosted_cluster_controller, Context},
    metrics,
};

/// Grants HostedCluster requesters admin access to their hosted cluster
#[derive(Parser, Debug)]
#[command(name = "permission-granter-operator", version, about, long_about = None)]
struct Cli {
    /// Port serving /metrics, /healthz and /readyz
    #[arg(long, env = "GRANTER_METRICS_PORT", default_value_t = 8080)]
    metrics_port: u16,

    /// HostedClusters reconciled in parallel
    #[arg(long, env = "GRANTER_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: u16,

    /// Seconds a single reconciliation may take
    #[arg(long, env = "GRANTER_RECONCILE_TIMEOUT_SECS", default_value_t = 30)]
    reconcile_timeout_secs: u64,

    /// Seconds a hosted cluster client is reused; 0 disables caching
    #[arg(long, env = "GRANTER_CLIENT_CACHE_TTL_SECS", default_value_t = 0)]
    client_cache_ttl_secs: u64,

    /// Kind of access granted to the requester
    #[arg(long, env = "GRANTER_GRANT_MODE", value_enum, default_value_t = GrantMode::ClusterAdmin)]
    grant_mode: GrantMode,

    /// Annotation holding the requester's identity
    #[arg(long, env = "GRANTER_REQUESTER_ANNOTATION", default_value = DEFAULT_REQUESTER_ANNOTATION)]
    requester_annotation: String,

    /// Annotation recording the identity that was granted access
    #[arg(long, env = "GRANTER_MARKER_ANNOTATION", default_value = DEFAULT_MARKER_ANNOTATION)]
    marker_annotation: String,

    /// Prefix of the namespace holding a hosted cluster's admin kubeconfig
    #[arg(long, env = "GRANTER_CREDENTIAL_NAMESPACE_PREFIX", default_value = DEFAULT_CREDENTIAL_NAMESPACE_PREFIX)]
    credential_namespace_prefix: String,

    /// Name of the admin kubeconfig secret
    #[arg(long, env = "GRANTER_CREDENTIAL_SECRET_NAME", default_value = DEFAULT_CREDENTIAL_SECRET_NAME)]
    credential_secret_name: String,

    /// Data key of the kubeconfig inside the secret
    #[arg(long, env = "GRANTER_CREDENTIAL_DATA_KEY", default_value = DEFAULT_CREDENTIAL_DATA_KEY)]
    credential_data_key: String,
}

impl Cli {
    fn into_config(self) -> GranterConfig {
        GranterConfig {
            annotations: AnnotationKeys {
                requester: self.requester_annotation,
                marker: self.marker_annotation,
            },
            credentials: CredentialNaming {
                namespace_prefix: self.credential_namespace_prefix,
                secret_name: self.credential_secret_name,
                data_key: self.credential_data_key,
            },
            grant_names: GrantNames::default(),
            grant_mode: self.grant_mode,
            concurrency: self.concurrency,
            reconcile_timeout: Duration::from_secs(self.reconcile_timeout_secs),
            client_cache_ttl: match self.client_cache_ttl_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    let cli = Cli::parse();
    let metrics_port = cli.metrics_port;
    let config = cli.into_config();

    info!(
        "Starting Permission Granter Operator (grant mode {:?})",
        config.grant_mode
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    // Create shared context
    let shutdown = CancellationToken::new();
    let context = Context::new(client, config, shutdown.clone());

    // Start metrics server
    let metrics_handle = tokio::spawn(metrics::serve(metrics_port));
    info!("Metrics server starting on port {}", metrics_port);

    // Run the HostedCluster controller
    let mut controller_handle = tokio::spawn(hosted_cluster_controller::run(context));

    // Handle graceful shutdown
    let signalled = tokio::select! {
        _ = &mut controller_handle => {
            error!("HostedCluster controller exited unexpectedly");
            false
        }
        _ = metrics_handle => {
            error!("Metrics server exited unexpectedly");
            false
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping operator");
            true
        }
    };

    // Stops the controller and aborts in-flight reconciliations
    shutdown.cancel();

    if signalled {
        if let Err(e) = controller_handle.await {
            error!("HostedCluster controller task failed: {}", e);
        }
    }

    info!("Permission Granter Operator stopped");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,permission_granter_operator=debug,kube=warn,hyper=warn")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
