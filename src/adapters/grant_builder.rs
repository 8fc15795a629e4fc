//! Access grant objects created on hosted clusters
//!
//! Pure builders: the same requester always yields the same objects.

use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::config::{GrantMode, GrantNames, FIELD_MANAGER};
use crate::crd::Group;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// An object that grants access on a hosted cluster
#[derive(Clone, Debug, PartialEq)]
pub enum GrantObject {
    ClusterRoleBinding(ClusterRoleBinding),
    Group(Group),
    RoleBinding(RoleBinding),
}

impl GrantObject {
    /// Kubernetes kind of the object
    pub fn kind(&self) -> &'static str {
        match self {
            GrantObject::ClusterRoleBinding(_) => "ClusterRoleBinding",
            GrantObject::Group(_) => "Group",
            GrantObject::RoleBinding(_) => "RoleBinding",
        }
    }

    /// Name of the object
    pub fn name(&self) -> &str {
        let meta = match self {
            GrantObject::ClusterRoleBinding(crb) => &crb.metadata,
            GrantObject::Group(group) => &group.metadata,
            GrantObject::RoleBinding(rb) => &rb.metadata,
        };
        meta.name.as_deref().unwrap_or_default()
    }
}

/// Build the grant objects for `requester` according to `mode`
pub fn compose_grant(mode: GrantMode, requester: &str, names: &GrantNames) -> Vec<GrantObject> {
    match mode {
        GrantMode::ClusterAdmin => vec![GrantObject::ClusterRoleBinding(
            compose_cluster_admin_binding(requester, names),
        )],
        GrantMode::CustomAdminGroup => {
            let (group, binding) = compose_custom_admin_group(requester, names);
            vec![GrantObject::Group(group), GrantObject::RoleBinding(binding)]
        }
    }
}

/// Build a ClusterRoleBinding named after `requester` that gives them the
/// cluster admin role
pub fn compose_cluster_admin_binding(requester: &str, names: &GrantNames) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMeta {
            name: Some(requester.to_string()),
            labels: Some(build_labels()),
            ..Default::default()
        },
        subjects: Some(vec![Subject {
            api_group: Some(RBAC_API_GROUP.to_string()),
            kind: "User".to_string(),
            name: requester.to_string(),
            namespace: None,
        }]),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name: names.cluster_admin_role.clone(),
        },
    }
}

/// Build the fixed-name Group holding `requester` and the RoleBinding that
/// grants the group its role in the group namespace
pub fn compose_custom_admin_group(requester: &str, names: &GrantNames) -> (Group, RoleBinding) {
    let mut group = Group::new(&names.group_name, vec![requester.to_string()]);
    group.metadata.labels = Some(build_labels());

    let binding = RoleBinding {
        metadata: ObjectMeta {
            name: Some(names.group_binding_name.clone()),
            namespace: Some(names.group_namespace.clone()),
            labels: Some(build_labels()),
            ..Default::default()
        },
        subjects: Some(vec![Subject {
            api_group: Some(RBAC_API_GROUP.to_string()),
            kind: "Group".to_string(),
            name: names.group_name.clone(),
            namespace: None,
        }]),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name: names.group_role.clone(),
        },
    };

    (group, binding)
}

fn build_labels() -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        FIELD_MANAGER.to_string(),
    );
    labels
}
