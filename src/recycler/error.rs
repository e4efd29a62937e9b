//! Errors returned by a single reconcile attempt.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::secrets::SecretsError;

/// Result type for reconcile operations.
pub type Result<T> = std::result::Result<T, RecyclerError>;

/// Why a reconcile attempt failed.
///
/// Every variant is terminal for the attempt and leaves the rotation state
/// unchanged. Retrying is up to the caller.
#[derive(Error, Debug)]
pub enum RecyclerError {
    /// The target secret record does not exist.
    #[error("Secret not found: {secret}")]
    SecretNotFound { secret: String },

    /// The target secret record is write-protected.
    #[error("Secret '{secret}' is immutable")]
    Immutable { secret: String },

    /// An identity provider call failed.
    #[error("Identity provider error: {0}")]
    Provider(#[from] IdentityError),

    /// Reading or updating the secret record failed.
    #[error("Secret store error: {0}")]
    Store(SecretsError),

    /// The policy failed validation.
    #[error("Invalid policy '{policy}': {message}")]
    InvalidPolicy { policy: String, message: String },
}

impl RecyclerError {
    pub fn secret_not_found(secret: impl Into<String>) -> Self {
        Self::SecretNotFound { secret: secret.into() }
    }

    pub fn immutable(secret: impl Into<String>) -> Self {
        Self::Immutable { secret: secret.into() }
    }

    pub fn invalid_policy(policy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPolicy { policy: policy.into(), message: message.into() }
    }

    /// Map a store failure for `secret`, keeping not-found distinct.
    pub fn from_store(secret: &str, error: SecretsError) -> Self {
        if error.is_not_found() {
            Self::secret_not_found(secret)
        } else {
            Self::Store(error)
        }
    }

    /// Whether a later attempt may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Store(e) => matches!(
                e,
                SecretsError::ConnectionFailed { .. }
                    | SecretsError::Conflict { .. }
                    | SecretsError::BackendError { .. }
            ),
            Self::SecretNotFound { .. } | Self::Immutable { .. } | Self::InvalidPolicy { .. } => {
                false
            }
        }
    }
}
