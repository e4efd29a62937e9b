//! # Configuration Management
//!
//! Loads [`AppConfig`] with the `config` crate. Sources, lowest precedence
//! first:
//!
//! 1. built-in defaults
//! 2. an optional file (TOML, YAML or JSON, chosen by extension)
//! 3. environment variables prefixed `IAM_RECYCLER_`, with `__` separating
//!    nested keys, e.g. `IAM_RECYCLER_CONTROLLER__STATUS_DIR=/var/lib/recycler`
//!
//! Policies are normally declared in the file; environment variables are
//! meant for per-deployment overrides.

pub mod settings;

pub use settings::{
    AppConfig, AwsConfig, ControllerConfig, IdentityBackend, IdentityConfig, KubernetesConfig,
    ObservabilityConfig, SecretsBackend, SecretsConfig,
};

use crate::errors::Result;
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "IAM_RECYCLER";

/// Load and validate the configuration.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let settings: AppConfig = builder.build()?.try_deserialize()?;
    settings.validate()?;

    tracing::debug!(
        file = ?path,
        policies = settings.policies.len(),
        "Configuration loaded"
    );

    Ok(settings)
}
