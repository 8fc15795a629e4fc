//! HostedCluster resource as seen by this operator
//!
//! The resource is owned by HyperShift. Only metadata matters here, so the
//! spec is carried as an opaque map and round-trips untouched.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HostedCluster specification (opaque)
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1alpha1",
    kind = "HostedCluster",
    plural = "hostedclusters",
    singular = "hostedcluster",
    shortname = "hc",
    namespaced
)]
pub struct HostedClusterSpec {
    /// Fields managed by HyperShift
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}
