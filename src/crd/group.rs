//! OpenShift `user.openshift.io/v1` Group
//!
//! Groups have no spec, just a top-level `users` list, so they are sent
//! through the dynamic API.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};

/// API group of OpenShift users and groups
pub const GROUP_API_GROUP: &str = "user.openshift.io";

/// A named set of users
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    pub metadata: ObjectMeta,
    pub users: Vec<String>,
}

impl Group {
    /// Create a group named `name` with the given members
    pub fn new(name: &str, users: Vec<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            users,
        }
    }

    /// The dynamic API resource for groups
    pub fn api_resource() -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(GROUP_API_GROUP, "v1", "Group"))
    }

    /// Convert into an object the dynamic API can create
    pub fn to_dynamic(&self) -> DynamicObject {
        let name = self.metadata.name.clone().unwrap_or_default();
        let mut object = DynamicObject::new(&name, &Self::api_resource())
            .data(self.membership_patch());
        object.metadata = self.metadata.clone();
        object
    }

    /// Merge patch replacing the members of an existing group with ours
    pub fn membership_patch(&self) -> serde_json::Value {
        serde_json::json!({ "users": self.users })
    }
}
