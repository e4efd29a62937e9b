//! HashiCorp Vault secret store.
//!
//! Maps a secret record onto one path of a KV v2 mount:
//!
//! - the record's fields are the string values of the latest version; other
//!   JSON values (numbers, booleans, objects) are carried through unchanged
//! - the record is write-protected when the path's custom metadata carries
//!   `immutable = "true"` (KV v2 has no native immutability flag)
//! - an update merges the new fields into the latest data and writes it as
//!   one new version, so readers see either the old pair or the new pair,
//!   never a mix
//!
//! # Example
//!
//! ```rust,ignore
//! use iam_recycler::secrets::{VaultConfig, VaultSecretStore};
//!
//! let config = VaultConfig {
//!     address: "https://vault.example.com".to_string(),
//!     token: Some("vault-token".into()),
//!     namespace: None,
//!     mount_path: "secret".to_string(),
//! };
//!
//! let store = VaultSecretStore::new(config).await?;
//! let record = store.get_record("teams/payments/aws").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::client::SecretStore;
use super::error::{Result, SecretsError};
use super::types::{SecretFields, SecretRecord, SecretString};

/// Custom metadata key marking a KV path as write-protected.
pub const IMMUTABLE_METADATA_KEY: &str = "immutable";

/// Configuration for the HashiCorp Vault backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Vault authentication token (if using token auth)
    pub token: Option<SecretString>,

    /// Vault namespace (for Enterprise multi-tenancy)
    pub namespace: Option<String>,

    /// KV v2 mount path (default: "secret")
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
}

fn default_mount_path() -> String {
    "secret".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            namespace: None,
            mount_path: default_mount_path(),
        }
    }
}

/// Vault KV v2 backed [`SecretStore`].
///
/// `Send + Sync`; share it behind an `Arc`.
pub struct VaultSecretStore {
    client: VaultClient,
    mount_path: String,
}

impl VaultSecretStore {
    /// Creates a new store and checks that Vault answers its health endpoint.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::ConfigError`] if the configuration is invalid
    /// - [`SecretsError::ConnectionFailed`] if Vault is unreachable
    pub async fn new(config: VaultConfig) -> Result<Self> {
        if config.address.is_empty() {
            return Err(SecretsError::config_error("Vault address cannot be empty"));
        }

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token.expose_secret());
        }

        if let Some(namespace) = config.namespace.clone() {
            settings_builder.namespace(Some(namespace));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SecretsError::connection_failed(format!("Failed to create Vault client: {}", e))
        })?;

        match vaultrs::sys::health(&client).await {
            Ok(_) => {
                tracing::info!(address = %config.address, mount_path = %config.mount_path, "Connected to Vault");
            }
            Err(e) => {
                tracing::error!(error = %e, address = %config.address, "Failed to connect to Vault");
                return Err(SecretsError::connection_failed(format!(
                    "Vault health check failed: {}",
                    e
                )));
            }
        }

        Ok(Self { client, mount_path: config.mount_path })
    }

    async fn read_data(&self, name: &str) -> Result<HashMap<String, Value>> {
        kv2::read(&self.client, &self.mount_path, name).await.map_err(|e| {
            tracing::debug!(error = %e, secret = %name, "Failed to read secret from Vault");
            map_client_error(name, e)
        })
    }
}

/// Whether custom metadata marks the path as write-protected.
fn is_immutable(custom_metadata: Option<&HashMap<String, String>>) -> bool {
    custom_metadata
        .and_then(|meta| meta.get(IMMUTABLE_METADATA_KEY))
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// String values of a KV version as record fields.
fn string_fields(data: HashMap<String, Value>) -> SecretFields {
    data.into_iter()
        .filter_map(|(field, value)| match value {
            Value::String(value) => Some((field, SecretString::new(value))),
            _ => None,
        })
        .collect()
}

/// Set `fields` on a KV version, keeping every other value.
fn merge_fields(data: &mut HashMap<String, Value>, fields: &SecretFields) {
    for (field, value) in fields {
        data.insert(field.clone(), Value::String(value.expose_secret().to_string()));
    }
}

/// Translate a vaultrs error, keeping 404s distinguishable.
fn map_client_error(name: &str, error: ClientError) -> SecretsError {
    match error {
        ClientError::APIError { code: 404, .. } => SecretsError::not_found(name),
        ClientError::APIError { code: 401 | 403, errors } => {
            SecretsError::authentication_failed(errors.join("; "))
        }
        ClientError::APIError { code: 400, errors }
            if errors.iter().any(|e| e.contains("check-and-set")) =>
        {
            SecretsError::conflict(name, errors.join("; "))
        }
        other => SecretsError::backend_error(format!("Vault request for '{}' failed: {}", name, other)),
    }
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    async fn get_record(&self, name: &str) -> Result<SecretRecord> {
        let data = self.read_data(name).await?;

        let metadata =
            kv2::read_metadata(&self.client, &self.mount_path, name).await.map_err(|e| {
                tracing::debug!(error = %e, secret = %name, "Failed to read secret metadata from Vault");
                map_client_error(name, e)
            })?;

        Ok(SecretRecord {
            fields: string_fields(data),
            writable: !is_immutable(metadata.custom_metadata.as_ref()),
        })
    }

    async fn update_record(&self, name: &str, fields: &SecretFields) -> Result<()> {
        let mut data = self.read_data(name).await?;
        merge_fields(&mut data, fields);

        kv2::set(&self.client, &self.mount_path, name, &data).await.map_err(|e| {
            tracing::error!(error = %e, secret = %name, "Failed to write secret to Vault");
            map_client_error(name, e)
        })?;

        tracing::debug!(secret = %name, mount_path = %self.mount_path, fields = fields.len(), "Wrote secret to Vault");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "vault"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_config_default() {
        let config = VaultConfig::default();
        assert_eq!(config.address, "http://127.0.0.1:8200");
        assert_eq!(config.mount_path, "secret");
        assert!(config.token.is_none());
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_vault_config_mount_path_defaults_when_missing() {
        let config: VaultConfig =
            serde_json::from_str(r#"{"address":"https://vault:8200","token":null,"namespace":null}"#)
                .unwrap();
        assert_eq!(config.mount_path, "secret");
    }

    #[test]
    fn test_immutable_flag_detection() {
        assert!(!is_immutable(None));

        let mut meta = HashMap::new();
        meta.insert("owner".to_string(), "payments".to_string());
        assert!(!is_immutable(Some(&meta)));

        meta.insert(IMMUTABLE_METADATA_KEY.to_string(), "TRUE ".to_string());
        assert!(is_immutable(Some(&meta)));

        meta.insert(IMMUTABLE_METADATA_KEY.to_string(), "false".to_string());
        assert!(!is_immutable(Some(&meta)));
    }

    #[test]
    fn test_non_string_values_are_not_fields() {
        let data: HashMap<String, Value> = serde_json::from_str(
            r#"{"AK":"AKIA1","SK":"old","port":5432,"tls":true,"extra":{"a":1}}"#,
        )
        .unwrap();

        let fields = string_fields(data);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("AK").unwrap().expose_secret(), "AKIA1");
        assert!(fields.get("port").is_none());
    }

    #[test]
    fn test_merge_keeps_non_string_values() {
        let mut data: HashMap<String, Value> =
            serde_json::from_str(r#"{"AK":"AKIA1","SK":"old","port":5432,"extra":{"a":1}}"#).unwrap();

        let mut fields = SecretFields::new();
        fields.insert("AK".to_string(), SecretString::new("AKIA2"));
        fields.insert("SK".to_string(), SecretString::new("new"));
        merge_fields(&mut data, &fields);

        assert_eq!(data.get("AK"), Some(&Value::from("AKIA2")));
        assert_eq!(data.get("SK"), Some(&Value::from("new")));
        assert_eq!(data.get("port"), Some(&Value::from(5432)));
        assert_eq!(data.get("extra"), Some(&serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_not_found_mapping() {
        let err = map_client_error("s1", ClientError::APIError { code: 404, errors: vec![] });
        assert!(err.is_not_found());

        let err = map_client_error(
            "s1",
            ClientError::APIError { code: 403, errors: vec!["permission denied".to_string()] },
        );
        assert!(matches!(err, SecretsError::AuthenticationFailed { .. }));

        let err = map_client_error("s1", ClientError::APIError { code: 500, errors: vec![] });
        assert!(matches!(err, SecretsError::BackendError { .. }));
    }
}
