//! Persistence of [`RotationState`] between reconcile calls.
//!
//! The reconciler itself is stateless; the controller driver loads the state
//! of a policy before each call and saves the returned state after a
//! rotation.

pub mod error;
pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::recycler::RotationState;

pub use error::{Result, StatusError};
pub use file::FileStatusStore;
pub use memory::MemoryStatusStore;

/// Per-policy rotation state storage.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Load the state of `policy`. A policy with no stored state has never rotated.
    async fn load(&self, policy: &str) -> Result<RotationState>;

    /// Replace the stored state of `policy`.
    async fn save(&self, policy: &str, state: &RotationState) -> Result<()>;
}
