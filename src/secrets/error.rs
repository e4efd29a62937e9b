//! Error types for secret store operations.

use thiserror::Error;

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while reading or updating a secret record.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Secret record not found in the backend.
    #[error("Secret not found: {name}")]
    NotFound { name: String },

    /// Failed to connect to the secret backend.
    #[error("Backend connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Authentication with the secret backend failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The record changed between read and write.
    #[error("Update conflict for secret '{name}': {message}")]
    Conflict { name: String, message: String },

    /// Backend-specific error.
    #[error("Backend error: {message}")]
    BackendError { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create an authentication failed error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: message.into() }
    }

    /// Create an update conflict error.
    pub fn conflict(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict { name: name.into(), message: message.into() }
    }

    /// Create a backend error.
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError { message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }


    /// Whether this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
