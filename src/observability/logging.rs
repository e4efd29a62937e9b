//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! `RUST_LOG` takes precedence over the configured level. With
//! `json_logging` enabled every event is a single JSON object carrying the
//! fields of its enclosing spans, so `policy` and `reconcile_id` can be used
//! to correlate all events of one reconcile call.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{Error, Result};

/// Create a span covering one reconcile call for a policy.
///
/// ```rust,ignore
/// let span = reconcile_span!(policy.name);
/// let span = reconcile_span!(policy.name, trigger = "startup");
/// ```
#[macro_export]
macro_rules! reconcile_span {
    ($policy:expr) => {
        tracing::info_span!(
            "reconcile",
            policy = %$policy,
            reconcile_id = %uuid::Uuid::new_v4()
        )
    };
    ($policy:expr, $($field:tt)*) => {
        tracing::info_span!(
            "reconcile",
            policy = %$policy,
            reconcile_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a span for a single identity provider call
#[macro_export]
macro_rules! provider_span {
    ($operation:expr, $identity:expr) => {
        tracing::debug_span!(
            "provider_operation",
            operation = %$operation,
            identity = %$identity,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $identity:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "provider_operation",
            operation = %$operation,
            identity = %$identity,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Build the env filter: `RUST_LOG` if set, else `verbose` forces debug,
/// else the configured level.
fn build_filter(config: &ObservabilityConfig, verbose: bool) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    EnvFilter::try_new(level)
        .map_err(|e| Error::config(format!("Invalid log level '{}': {}", level, e)))
}

/// Install the global subscriber.
///
/// Does nothing if a subscriber is already installed (e.g. by a test harness).
pub fn init_logging(config: &ObservabilityConfig, verbose: bool) -> Result<()> {
    let filter = build_filter(config, verbose)?;

    let installed = if config.json_logging {
        Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true).with_span_list(true))
            .try_init()
    } else {
        Registry::default().with(filter).with(fmt::layer().with_target(true)).try_init()
    };

    if installed.is_err() {
        // Subscriber already set elsewhere; keep it.
        tracing::debug!("Global subscriber already installed");
    }

    Ok(())
}

/// Log configuration at startup. Never logs credentials.
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        app_name = crate::APP_NAME,
        version = crate::VERSION,
        service_name = %config.observability.service_name,
        identity_backend = %config.identity.backend,
        secrets_backend = %config.secrets.backend,
        status_dir = %config.controller.status_dir.display(),
        policies = config.policies.len(),
        "iam-recycler configuration"
    );
}
