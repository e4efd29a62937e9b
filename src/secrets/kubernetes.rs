//! Kubernetes `Secret` store.
//!
//! Each record is a namespaced `Secret`. `writable` mirrors the object's
//! `immutable` field. `data` values that are valid UTF-8 become record
//! fields; anything else (keystores, DER certificates) is opaque and only
//! ever written back byte for byte.
//!
//! Updates set the named keys on the fetched object and replace it using the
//! `resourceVersion` observed by the preceding `get_record` call, so a
//! concurrent edit between read and write surfaces as
//! [`SecretsError::Conflict`] instead of being overwritten.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::PostParams;
use kube::{Api, Client};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::config::KubernetesConfig;

use super::client::SecretStore;
use super::error::{Result, SecretsError};
use super::types::{SecretFields, SecretRecord, SecretString};

/// [`SecretStore`] over Kubernetes `Secret` objects in one namespace.
pub struct KubernetesSecretStore {
    secrets_api: Api<Secret>,
    namespace: String,
    resource_versions: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for KubernetesSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesSecretStore").field("namespace", &self.namespace).finish()
    }
}

impl KubernetesSecretStore {
    /// Build a client from the configured kubeconfig, or from the in-cluster
    /// environment when no path is given.
    pub async fn new(config: KubernetesConfig) -> Result<Self> {
        if config.namespace.is_empty() {
            return Err(SecretsError::config_error("Kubernetes namespace cannot be empty"));
        }

        let client = match &config.kubeconfig_path {
            Some(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    SecretsError::config_error(format!(
                        "Failed to read kubeconfig from {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let kubeconfig = kube::config::Kubeconfig::from_yaml(&content).map_err(|e| {
                    SecretsError::config_error(format!("Failed to parse kubeconfig: {}", e))
                })?;
                let kube_config = kube::Config::from_custom_kubeconfig(
                    kubeconfig,
                    &kube::config::KubeConfigOptions::default(),
                )
                .await
                .map_err(|e| {
                    SecretsError::config_error(format!("Failed to load kubeconfig: {}", e))
                })?;
                Client::try_from(kube_config).map_err(|e| {
                    SecretsError::connection_failed(format!("Failed to create K8s client: {}", e))
                })?
            }
            None => Client::try_default().await.map_err(|e| {
                SecretsError::connection_failed(format!("Failed to create K8s client: {}", e))
            })?,
        };

        tracing::info!(namespace = %config.namespace, "Initialized Kubernetes secret store");

        Ok(Self {
            secrets_api: Api::namespaced(client, &config.namespace),
            namespace: config.namespace,
            resource_versions: Mutex::new(HashMap::new()),
        })
    }
}

/// Decode a `Secret`'s data into record fields, skipping binary values.
/// `stringData` is write-only on the server, but honour it for objects built
/// client-side.
fn secret_to_record(name: &str, secret: &Secret) -> SecretRecord {
    let mut fields = SecretFields::new();

    if let Some(data) = &secret.data {
        for (field, ByteString(bytes)) in data {
            match std::str::from_utf8(bytes) {
                Ok(value) => {
                    fields.insert(field.clone(), SecretString::new(value));
                }
                Err(_) => {
                    tracing::debug!(secret = %name, field = %field, "Keeping binary field opaque");
                }
            }
        }
    }
    if let Some(string_data) = &secret.string_data {
        for (field, value) in string_data {
            fields.insert(field.clone(), SecretString::new(value.clone()));
        }
    }

    SecretRecord { fields, writable: !secret.immutable.unwrap_or(false) }
}

/// Set `fields` in the object's `data`, leaving every other key as it is.
fn apply_fields(secret: &mut Secret, fields: &SecretFields) {
    let data = secret.data.get_or_insert_with(BTreeMap::new);
    for (field, value) in fields {
        data.insert(field.clone(), ByteString(value.expose_secret().as_bytes().to_vec()));
    }
    secret.string_data = None;
}

fn map_kube_error(name: &str, error: kube::Error) -> SecretsError {
    match error {
        kube::Error::Api(response) if response.code == 404 => SecretsError::not_found(name),
        kube::Error::Api(response) if response.code == 409 => {
            SecretsError::conflict(name, response.message)
        }
        kube::Error::Api(response) if response.code == 401 || response.code == 403 => {
            SecretsError::authentication_failed(response.message)
        }
        other => SecretsError::backend_error(format!("Kubernetes request for '{}' failed: {}", name, other)),
    }
}

#[async_trait]
impl SecretStore for KubernetesSecretStore {
    async fn get_record(&self, name: &str) -> Result<SecretRecord> {
        let secret = self
            .secrets_api
            .get_opt(name)
            .await
            .map_err(|e| map_kube_error(name, e))?
            .ok_or_else(|| SecretsError::not_found(name))?;

        if let Some(version) = secret.metadata.resource_version.clone() {
            self.resource_versions.lock().await.insert(name.to_string(), version);
        }

        Ok(secret_to_record(name, &secret))
    }

    async fn update_record(&self, name: &str, fields: &SecretFields) -> Result<()> {
        let mut secret = self
            .secrets_api
            .get_opt(name)
            .await
            .map_err(|e| map_kube_error(name, e))?
            .ok_or_else(|| SecretsError::not_found(name))?;

        if let Some(observed) = self.resource_versions.lock().await.remove(name) {
            secret.metadata.resource_version = Some(observed);
        }

        apply_fields(&mut secret, fields);

        self.secrets_api
            .replace(name, &PostParams::default(), &secret)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, secret = %name, namespace = %self.namespace, "Failed to update Kubernetes secret");
                map_kube_error(name, e)
            })?;

        tracing::debug!(secret = %name, namespace = %self.namespace, "Updated Kubernetes secret");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "kubernetes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYSTORE: [u8; 4] = [0x30, 0x82, 0xff, 0xfe];

    fn secret_with(data: &[(&str, &[u8])], immutable: Option<bool>) -> Secret {
        Secret {
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.to_vec())))
                    .collect(),
            ),
            immutable,
            ..Default::default()
        }
    }

    #[test]
    fn test_secret_to_record_decodes_fields() {
        let secret = secret_with(&[("AK", &b"AKIA1"[..]), ("SK", &b"secret"[..])], None);
        let record = secret_to_record("s1", &secret);
        assert!(record.writable);
        assert_eq!(record.field("AK").unwrap().expose_secret(), "AKIA1");
        assert_eq!(record.field("SK").unwrap().expose_secret(), "secret");
    }

    #[test]
    fn test_immutable_secret_is_not_writable() {
        let secret = secret_with(&[], Some(true));
        assert!(!secret_to_record("s1", &secret).writable);
    }

    #[test]
    fn test_binary_field_is_skipped_on_read() {
        let secret = secret_with(&[("AK", &b"AKIA1"[..]), ("keystore.p12", &KEYSTORE[..])], None);
        let record = secret_to_record("s1", &secret);
        assert!(record.writable);
        assert_eq!(record.field("AK").unwrap().expose_secret(), "AKIA1");
        assert!(record.field("keystore.p12").is_none());
    }

    #[test]
    fn test_rotation_keeps_binary_sibling_bytes() {
        let mut secret = secret_with(
            &[("AK", &b"AKIA1"[..]), ("SK", &b"old"[..]), ("keystore.p12", &KEYSTORE[..])],
            None,
        );

        let mut fields = SecretFields::new();
        fields.insert("AK".to_string(), SecretString::new("AKIA2"));
        fields.insert("SK".to_string(), SecretString::new("new"));
        apply_fields(&mut secret, &fields);

        let data = secret.data.as_ref().unwrap();
        assert_eq!(data.get("AK"), Some(&ByteString(b"AKIA2".to_vec())));
        assert_eq!(data.get("SK"), Some(&ByteString(b"new".to_vec())));
        assert_eq!(data.get("keystore.p12"), Some(&ByteString(KEYSTORE.to_vec())));
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_apply_fields_to_empty_secret() {
        let mut secret = Secret::default();
        let mut fields = SecretFields::new();
        fields.insert("AK".to_string(), SecretString::new("AKIA2"));
        apply_fields(&mut secret, &fields);
        assert_eq!(secret.data.unwrap().get("AK"), Some(&ByteString(b"AKIA2".to_vec())));
    }
}
