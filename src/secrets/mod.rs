//! Secret record stores.
//!
//! The rotation core publishes each new credential into a key-value secret
//! record through the [`SecretStore`] trait:
//! - **get_record**: read the string fields of a record plus its write-protection flag
//! - **update_record**: set some fields in one atomic call, keeping the rest
//!
//! # Supported Backends
//!
//! - **HashiCorp Vault**: KV v2 paths, immutability via custom metadata
//! - **Kubernetes**: namespaced `Secret` objects (feature `kubernetes`)
//! - **In-memory**: tests and local dry runs
//!
//! # Example
//!
//! ```rust,ignore
//! use iam_recycler::secrets::{SecretFields, SecretStore, VaultConfig, VaultSecretStore};
//!
//! let store = VaultSecretStore::new(VaultConfig::default()).await?;
//! let record = store.get_record("aws-creds").await?;
//! if record.writable {
//!     let mut fields = SecretFields::new();
//!     fields.insert("AK".to_string(), "AKIA2".into());
//!     store.update_record("aws-creds", &fields).await?;
//! }
//! ```
//!
//! # Security Considerations
//!
//! - Field values are wrapped in [`SecretString`] and never logged
//! - Errors name the record and field, never the value

pub mod client;
pub mod error;
#[cfg(feature = "kubernetes")]
pub mod kubernetes;
pub mod memory;
pub mod types;
pub mod vault;

pub use client::SecretStore;
pub use error::{Result, SecretsError};
#[cfg(feature = "kubernetes")]
pub use kubernetes::KubernetesSecretStore;
pub use memory::InMemorySecretStore;
pub use types::{SecretFields, SecretRecord, SecretString};
pub use vault::{VaultConfig, VaultSecretStore};
