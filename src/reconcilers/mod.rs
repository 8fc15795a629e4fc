//! Reconciliation logic for HostedCluster resources

pub mod grant;
pub mod marker;

pub use grant::{GrantReconciler, ReconcileOutcome};
