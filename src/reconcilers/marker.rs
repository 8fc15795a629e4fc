//! Marker annotation recording that a HostedCluster's requester was granted access

use kube::ResourceExt;

use crate::adapters::local_client::LocalClient;
use crate::config::AnnotationKeys;
use crate::crd::HostedCluster;
use crate::Result;

/// Whether the grant has already been issued for this HostedCluster
pub fn has_been_granted(cluster: &HostedCluster, keys: &AnnotationKeys) -> bool {
    cluster.annotations().contains_key(&keys.marker)
}

/// The identity that asked for the HostedCluster, if the provisioner recorded one
///
/// A blank value counts as absent. Any other value is returned as written.
pub fn requester<'a>(cluster: &'a HostedCluster, keys: &AnnotationKeys) -> Option<&'a str> {
    cluster
        .annotations()
        .get(&keys.requester)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}

/// Event filter applied before a change reaches the reconciler
///
/// Works on a possibly stale snapshot; the reconciler checks
/// [`has_been_granted`] again on fresh state.
pub fn should_reconcile(cluster: &HostedCluster, keys: &AnnotationKeys) -> bool {
    !has_been_granted(cluster, keys)
}

/// Merge `entries` into the HostedCluster's annotations
///
/// Existing keys not named in `entries` are left alone.
pub fn merge_annotations<I>(cluster: &mut HostedCluster, entries: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    cluster.annotations_mut().extend(entries);
}

/// Record `requester` as granted on the HostedCluster and persist it
pub async fn mark_granted(
    local: &dyn LocalClient,
    cluster: &mut HostedCluster,
    requester: &str,
    keys: &AnnotationKeys,
) -> Result<()> {
    merge_annotations(cluster, [(keys.marker.clone(), requester.to_string())]);
    local.persist_annotations(cluster).await
}
