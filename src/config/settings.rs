//! # Configuration Settings
//!
//! Defines the configuration structure for iam-recycler.

use crate::errors::{Error, Result};
use crate::recycler::RotationPolicy;
use crate::secrets::VaultConfig;
use crate::status::file::is_storable_name;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Identity provider configuration
    pub identity: IdentityConfig,

    /// Secret store configuration
    #[validate(nested)]
    pub secrets: SecretsConfig,

    /// Controller driver configuration
    #[validate(nested)]
    pub controller: ControllerConfig,

    /// Rotation policies
    #[validate(nested)]
    pub policies: Vec<RotationPolicy>,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks that span more than one field
    fn validate_custom(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for policy in &self.policies {
            if !is_storable_name(&policy.name) {
                return Err(Error::validation_field(
                    format!(
                        "Policy name '{}' may only contain letters, digits, '.', '_' and '-' and may not start with '.'",
                        policy.name
                    ),
                    "policies.name",
                ));
            }
            if !seen.insert(policy.name.as_str()) {
                return Err(Error::validation_field(
                    format!("Duplicate policy name '{}'", policy.name),
                    "policies",
                ));
            }
        }

        if self.controller.error_backoff_initial_seconds > self.controller.error_backoff_max_seconds {
            return Err(Error::validation(
                "Error backoff initial delay cannot exceed the maximum delay",
            ));
        }

        if self.secrets.backend == SecretsBackend::Vault && self.secrets.vault.address.trim().is_empty() {
            return Err(Error::validation_field(
                "Vault address is required when the Vault backend is selected",
                "secrets.vault.address",
            ));
        }

        Ok(())
    }

    /// Look up a policy by name
    pub fn policy(&self, name: &str) -> Option<&RotationPolicy> {
        self.policies.iter().find(|policy| policy.name == name)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Service name attached to startup logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            service_name: "iam-recycler".to_string(),
        }
    }
}

/// Identity provider implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    /// AWS IAM access keys (feature `aws`)
    #[default]
    Aws,
    /// In-memory provider for dry runs
    Memory,
}

impl fmt::Display for IdentityBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aws => write!(f, "aws"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,

    /// AWS client settings, used by the `aws` backend
    pub aws: AwsConfig,
}

/// AWS client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region. Falls back to the SDK's environment and profile chain.
    pub region: Option<String>,

    /// Named profile from the shared credentials file
    pub profile: Option<String>,

    /// Custom endpoint, e.g. `http://localhost:4566` for LocalStack
    pub endpoint_url: Option<String>,
}

/// Secret store implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretsBackend {
    /// HashiCorp Vault KV v2
    Vault,
    /// Kubernetes `Secret` objects (feature `kubernetes`)
    #[default]
    Kubernetes,
    /// In-memory store for dry runs
    Memory,
}

impl fmt::Display for SecretsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vault => write!(f, "vault"),
            Self::Kubernetes => write!(f, "kubernetes"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Secret store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct SecretsConfig {
    pub backend: SecretsBackend,

    /// Vault settings, used by the `vault` backend
    pub vault: VaultConfig,

    /// Kubernetes settings, used by the `kubernetes` backend
    #[validate(nested)]
    pub kubernetes: KubernetesConfig,
}

/// Kubernetes client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct KubernetesConfig {
    /// Namespace holding the secrets
    #[validate(length(min = 1, message = "Kubernetes namespace cannot be empty"))]
    pub namespace: String,

    /// Kubeconfig file; in-cluster configuration is used when unset
    pub kubeconfig_path: Option<PathBuf>,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self { namespace: "default".to_string(), kubeconfig_path: None }
    }
}

/// Controller driver configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ControllerConfig {
    /// Directory holding one rotation status document per policy
    pub status_dir: PathBuf,

    /// Requeue delay after the first failed reconcile
    #[validate(range(
        min = 1,
        max = 86400,
        message = "Initial error backoff must be between 1 second and 1 day"
    ))]
    pub error_backoff_initial_seconds: u64,

    /// Upper bound for the requeue delay after repeated failures
    #[validate(range(
        min = 1,
        max = 86400,
        message = "Maximum error backoff must be between 1 second and 1 day"
    ))]
    pub error_backoff_max_seconds: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            status_dir: PathBuf::from("./data/status"),
            error_backoff_initial_seconds: 5,
            error_backoff_max_seconds: 300,
        }
    }
}

impl ControllerConfig {
    /// Get the initial error backoff as Duration
    pub fn error_backoff_initial(&self) -> Duration {
        Duration::from_secs(self.error_backoff_initial_seconds)
    }

    /// Get the maximum error backoff as Duration
    pub fn error_backoff_max(&self) -> Duration {
        Duration::from_secs(self.error_backoff_max_seconds)
    }
}
