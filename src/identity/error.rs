//! Error types for identity provider operations.

use thiserror::Error;

/// Result type for identity provider operations.
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Errors reported by an identity provider.
///
/// The rotation core never inspects these beyond logging; they are passed to
/// the caller unchanged.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The identity does not exist at the provider.
    #[error("Identity not found: {identity}")]
    IdentityNotFound { identity: String },

    /// The credential to delete does not exist.
    #[error("Credential '{credential_id}' not found for identity '{identity}'")]
    CredentialNotFound { identity: String, credential_id: String },

    /// The provider refused to issue another credential.
    #[error("Credential limit exceeded for identity '{identity}'")]
    LimitExceeded { identity: String },

    /// The caller is not allowed to perform the operation.
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// The provider throttled the request.
    #[error("Request throttled: {message}")]
    Throttled { message: String },

    /// Failed to reach the provider.
    #[error("Provider connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Any other provider failure.
    #[error("Provider error during {operation}: {message}")]
    Provider { operation: String, message: String },
}

impl IdentityError {
    /// Create an identity not found error.
    pub fn identity_not_found(identity: impl Into<String>) -> Self {
        Self::IdentityNotFound { identity: identity.into() }
    }

    /// Create a credential not found error.
    pub fn credential_not_found(identity: impl Into<String>, credential_id: impl Into<String>) -> Self {
        Self::CredentialNotFound { identity: identity.into(), credential_id: credential_id.into() }
    }

    /// Create a limit exceeded error.
    pub fn limit_exceeded(identity: impl Into<String>) -> Self {
        Self::LimitExceeded { identity: identity.into() }
    }

    /// Create an access denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied { message: message.into() }
    }

    /// Create a throttled error.
    pub fn throttled(message: impl Into<String>) -> Self {
        Self::Throttled { message: message.into() }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create a generic provider error.
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider { operation: operation.into(), message: message.into() }
    }

    /// Check if a later attempt may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled { .. } | Self::ConnectionFailed { .. } | Self::Provider { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IdentityError::credential_not_found("svc-a", "k1");
        assert_eq!(err.to_string(), "Credential 'k1' not found for identity 'svc-a'");

        let err = IdentityError::provider("create_credential", "boom");
        assert!(err.to_string().contains("create_credential"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(IdentityError::throttled("rate").is_retryable());
        assert!(IdentityError::connection_failed("dns").is_retryable());
        assert!(!IdentityError::identity_not_found("svc-a").is_retryable());
        assert!(!IdentityError::limit_exceeded("svc-a").is_retryable());
        assert!(!IdentityError::access_denied("no").is_retryable());
    }
}
