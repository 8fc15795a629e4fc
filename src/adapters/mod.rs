//! Adapters between the reconciler and the Kubernetes clusters it talks to

pub mod client_cache;
pub mod grant_builder;
pub mod local_client;
pub mod remote_client;
pub mod secrets;
