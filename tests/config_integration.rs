//! Integration tests for configuration loading
//!
//! These tests validate that a configuration file is layered under
//! `IAM_RECYCLER_*` environment variables and validated as a whole.

use iam_recycler::config::{load_config, IdentityBackend, SecretsBackend};
use iam_recycler::Result;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const CONFIG_TOML: &str = r#"
[observability]
log_level = "debug"

[identity]
backend = "memory"

[secrets]
backend = "vault"

[secrets.vault]
address = "https://vault.internal:8200"
mount_path = "kv"

[controller]
status_dir = "/var/lib/iam-recycler"

[[policies]]
name = "payments"
secret = "payments-aws"
datakeyaccesskey = "AWS_ACCESS_KEY_ID"
datakeysecretkey = "AWS_SECRET_ACCESS_KEY"
iamuser = "svc-payments"
recycle = 1440
"#;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("recycler.toml");
    std::fs::write(&path, content).unwrap();
    path
}

/// Restores an environment variable when dropped
struct EnvGuard {
    key: &'static str,
    original: Option<String>,
}

impl EnvGuard {
    fn set(key: &'static str, value: &str) -> Self {
        let original = env::var(key).ok();
        env::set_var(key, value);
        Self { key, original }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.original {
            Some(value) => env::set_var(self.key, value),
            None => env::remove_var(self.key),
        }
    }
}

#[test]
fn test_config_file_is_loaded() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, CONFIG_TOML);

    let config = load_config(Some(&path))?;
    assert_eq!(config.observability.log_level, "debug");
    assert_eq!(config.identity.backend, IdentityBackend::Memory);
    assert_eq!(config.secrets.backend, SecretsBackend::Vault);
    assert_eq!(config.secrets.vault.mount_path, "kv");
    assert_eq!(config.controller.status_dir, PathBuf::from("/var/lib/iam-recycler"));
    // Defaults fill what the file leaves out
    assert_eq!(config.controller.error_backoff_initial_seconds, 5);
    assert_eq!(config.secrets.kubernetes.namespace, "default");

    let policy = config.policy("payments").expect("policy should be loaded");
    assert_eq!(policy.secret_name, "payments-aws");
    assert_eq!(policy.access_key_field, "AWS_ACCESS_KEY_ID");
    assert_eq!(policy.secret_key_field, "AWS_SECRET_ACCESS_KEY");
    assert_eq!(policy.identity_name, "svc-payments");
    assert_eq!(policy.recycle_interval_minutes, 1440);

    Ok(())
}

#[test]
fn test_environment_overrides_file() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, CONFIG_TOML);

    let _status = EnvGuard::set("IAM_RECYCLER_CONTROLLER__STATUS_DIR", "/tmp/override");
    let _backoff = EnvGuard::set("IAM_RECYCLER_CONTROLLER__ERROR_BACKOFF_MAX_SECONDS", "60");
    let _json = EnvGuard::set("IAM_RECYCLER_OBSERVABILITY__JSON_LOGGING", "true");

    let config = load_config(Some(&path))?;
    assert_eq!(config.controller.status_dir, PathBuf::from("/tmp/override"));
    assert_eq!(config.controller.error_backoff_max_seconds, 60);
    assert!(config.observability.json_logging);
    assert_eq!(config.policies.len(), 1);

    Ok(())
}

#[test]
fn test_defaults_without_file() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();

    let config = load_config(None)?;
    assert_eq!(config.identity.backend, IdentityBackend::Aws);
    assert_eq!(config.secrets.backend, SecretsBackend::Kubernetes);
    assert!(config.policies.is_empty());

    Ok(())
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let dir = TempDir::new().unwrap();

    let zero_interval = CONFIG_TOML.replace("recycle = 1440", "recycle = 0");
    assert!(load_config(Some(&write_config(&dir, &zero_interval))).is_err());

    let duplicate = format!(
        "{}\n[[policies]]\nname = \"payments\"\nsecret = \"other\"\ndatakeyaccesskey = \"AK\"\ndatakeysecretkey = \"SK\"\niamuser = \"svc-other\"\nrecycle = 60\n",
        CONFIG_TOML
    );
    let err = load_config(Some(&write_config(&dir, &duplicate))).unwrap_err();
    assert!(err.to_string().contains("Duplicate policy name"));

    let nested_name = CONFIG_TOML.replace("name = \"payments\"", "name = \"team/payments\"");
    let err = load_config(Some(&write_config(&dir, &nested_name))).unwrap_err();
    assert!(err.to_string().contains("team/payments"));

    let missing = dir.path().join("missing.toml");
    assert!(load_config(Some(&missing)).is_err());
}
