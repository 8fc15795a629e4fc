//! Permission Granter Kubernetes Operator
//!
//! This operator watches HyperShift HostedCluster resources and, once per
//! cluster, grants the user recorded in the requester annotation admin access
//! to the hosted cluster.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod reconcilers;

pub use error::{Error, Result};
