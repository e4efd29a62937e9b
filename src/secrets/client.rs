//! Core secret store trait.

use async_trait::async_trait;

use super::error::Result;
use super::types::{SecretFields, SecretRecord};

/// Trait for key-value secret record backends.
///
/// The rotation core only needs two operations: read a record (its string
/// fields plus its write-protection flag) and set some of its fields in one
/// atomic call.
///
/// Backends may hold values that are not strings (binary `Secret` data, JSON
/// numbers in Vault). Those are left out of [`SecretRecord::fields`] and
/// survive every update untouched.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log field values
/// - `update_record` MUST either apply every field or none of them
///
/// # Example Implementation
///
/// ```rust,ignore
/// use iam_recycler::secrets::{Result, SecretFields, SecretRecord, SecretStore};
/// use async_trait::async_trait;
///
/// struct MyStore;
///
/// #[async_trait]
/// impl SecretStore for MyStore {
///     async fn get_record(&self, name: &str) -> Result<SecretRecord> {
///         Ok(SecretRecord::empty())
///     }
///
///     async fn update_record(&self, name: &str, fields: &SecretFields) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a record by name.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if the record doesn't exist
    /// - [`SecretsError::ConnectionFailed`](super::SecretsError::ConnectionFailed) if the backend is unreachable
    async fn get_record(&self, name: &str) -> Result<SecretRecord>;

    /// Set `fields` on an existing record. Fields not named are left as stored.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if the record vanished
    /// - [`SecretsError::Conflict`](super::SecretsError::Conflict) if the record changed concurrently
    /// - [`SecretsError::BackendError`](super::SecretsError::BackendError) if the write fails
    async fn update_record(&self, name: &str, fields: &SecretFields) -> Result<()>;

    /// Short backend name used in log fields.
    fn backend_name(&self) -> &'static str {
        "unknown"
    }
}
