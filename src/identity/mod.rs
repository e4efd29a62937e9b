//! Identity providers.
//!
//! An identity provider owns the access-key credentials of a named identity
//! (for AWS, an IAM user). The rotation core reaches it only through the
//! [`IdentityProvider`] trait, which is injected rather than constructed per
//! call so tests can substitute [`InMemoryIdentityProvider`].
//!
//! # Supported Providers
//!
//! - **AWS IAM**: `ListAccessKeys` / `DeleteAccessKey` / `CreateAccessKey` (feature `aws`)
//! - **In-memory**: deterministic test double with a call log

#[cfg(feature = "aws")]
pub mod aws;
pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::secrets::SecretString;

pub use error::{IdentityError, Result};
pub use memory::{InMemoryIdentityProvider, ProviderCall, ProviderOperation};

#[cfg(feature = "aws")]
pub use aws::AwsIamProvider;

/// A credential as listed by the provider. Secret material is never listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialKey {
    /// Opaque credential identifier
    pub id: String,

    /// Issuance timestamp reported by the provider
    pub created_at: DateTime<Utc>,
}

impl CredentialKey {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self { id: id.into(), created_at }
    }
}

/// A freshly issued credential, including its secret material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    /// Provider identifier of the credential
    pub id: String,

    /// Public half published into the secret record (the access key id)
    pub access_id: String,

    /// Private half published into the secret record
    pub secret_material: SecretString,
}

/// Trait for providers that issue access-key credentials.
///
/// Implementations perform one remote call per method and must not retry
/// internally; the reconciler surfaces every error to its invoker.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// List all credentials currently held by `identity`, in provider order.
    async fn list_credentials(&self, identity: &str) -> Result<Vec<CredentialKey>>;

    /// Delete one credential of `identity`.
    async fn delete_credential(&self, identity: &str, credential_id: &str) -> Result<()>;

    /// Issue a new credential for `identity`.
    async fn create_credential(&self, identity: &str) -> Result<IssuedCredential>;

    /// Short provider name used in log fields.
    fn provider_name(&self) -> &'static str {
        "unknown"
    }
}
