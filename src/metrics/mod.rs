//! Prometheus metrics for the Permission Granter Operator
//!
//! This module exposes metrics for monitoring reconciliations and issued grants.

pub mod prometheus;

pub use prometheus::*;
