//! # Error Types

use crate::identity::IdentityError;
use crate::recycler::RecyclerError;
use crate::secrets::SecretsError;
use crate::status::StatusError;

/// Custom result type for application-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for iam-recycler
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Secret store errors
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// Identity provider errors
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Reconcile errors
    #[error(transparent)]
    Recycler(#[from] RecyclerError),

    /// Status store errors
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error for a specific field
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Identity(e) => e.is_retryable(),
            Self::Recycler(e) => e.is_retryable(),
            Self::Secrets(e) => matches!(e, SecretsError::ConnectionFailed { .. }),
            Self::Io { .. } | Self::Status(_) => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::io("I/O operation failed", error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
