//! # iam-recycler
//!
//! Rotates long-lived access-key credentials on a fixed schedule and
//! publishes each new pair into a key-value secret record.
//!
//! ## Architecture
//!
//! ```text
//! Controller driver ──► Reconciler ──► Scheduler (due?)
//!        │                  │
//!   Status store            ├──► Secret Publisher (writable?) ──► Secret store
//!                           ├──► Credential Rotator ──► Identity provider
//!                           └──► Secret Publisher (write)
//! ```
//!
//! ## Core Components
//!
//! - **Reconciler**: one decision-and-execution step per policy ([`recycler`])
//! - **Identity providers**: AWS IAM or in-memory ([`identity`])
//! - **Secret stores**: Vault KV v2, Kubernetes or in-memory ([`secrets`])
//! - **Controller**: per-policy loops with error backoff ([`controller`])
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use iam_recycler::identity::InMemoryIdentityProvider;
//! use iam_recycler::recycler::{Reconciler, RotationPolicy, RotationState, SystemClock};
//! use iam_recycler::secrets::{InMemorySecretStore, SecretRecord};
//!
//! # async fn example() -> iam_recycler::Result<()> {
//! let provider = InMemoryIdentityProvider::new();
//! provider.add_identity("svc-a").await;
//! let store = InMemorySecretStore::new();
//! store.insert("s1", SecretRecord::empty()).await;
//!
//! let reconciler = Reconciler::new(Arc::new(provider), Arc::new(store), Arc::new(SystemClock));
//! let policy = RotationPolicy::new("p1", "s1", "AK", "SK", "svc-a", 60);
//! let outcome = reconciler.reconcile(&policy, &RotationState::default()).await?;
//! assert!(outcome.is_rotated());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod controller;
pub mod errors;
pub mod identity;
pub mod observability;
pub mod recycler;
pub mod secrets;
pub mod startup;
pub mod status;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
