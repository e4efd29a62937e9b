//! In-memory status store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Result, StatusStore};
use crate::recycler::RotationState;

#[derive(Debug, Default, Clone)]
pub struct MemoryStatusStore {
    states: Arc<RwLock<HashMap<String, RotationState>>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored state of `policy`, if any was saved.
    pub async fn get(&self, policy: &str) -> Option<RotationState> {
        self.states.read().await.get(policy).copied()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn load(&self, policy: &str) -> Result<RotationState> {
        Ok(self.get(policy).await.unwrap_or_default())
    }

    async fn save(&self, policy: &str, state: &RotationState) -> Result<()> {
        self.states.write().await.insert(policy.to_string(), *state);
        Ok(())
    }
}
