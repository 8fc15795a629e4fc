//! Kubernetes secret fetching utilities

use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};

use crate::{Error, Result};

/// Fetch a secret by name from the given namespace, `None` if it does not exist
pub async fn get_secret(client: &Client, namespace: &str, name: &str) -> Result<Option<Secret>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    secrets.get_opt(name).await.map_err(|e| {
        Error::KubeError(format!(
            "Failed to get secret {}/{}: {}",
            namespace, name, e
        ))
    })
}

/// Get the raw bytes stored under `key` in a secret
pub fn get_secret_key(secret: &Secret, key: &str) -> Result<Vec<u8>> {
    let name = secret.metadata.name.as_deref().unwrap_or_default();

    let data = secret
        .data
        .as_ref()
        .ok_or_else(|| Error::CredentialNotFound(format!("Secret {} has no data", name)))?;

    let value = data.get(key).ok_or_else(|| {
        Error::CredentialNotFound(format!("Key '{}' not found in secret {}", key, name))
    })?;

    Ok(value.0.clone())
}
