//! # Observability
//!
//! Structured logging for the controller: subscriber setup plus span macros
//! for reconcile calls and identity provider operations.

pub mod logging;

pub use logging::{init_logging, log_config_info};
