//! # Error Handling
//!
//! Application-level error type for configuration loading and process
//! wiring. Each subsystem keeps its own `thiserror` enum
//! ([`SecretsError`](crate::secrets::SecretsError),
//! [`IdentityError`](crate::identity::IdentityError),
//! [`RecyclerError`](crate::recycler::RecyclerError),
//! [`StatusError`](crate::status::StatusError)); [`Error`] wraps them.

pub mod types;

pub use types::{Error, Result};
