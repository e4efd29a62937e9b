//! In-memory secret store.
//!
//! Holds records in a map behind an async `RwLock`. Used by the test suites
//! and by `secrets.backend = "memory"` for local dry runs. Nothing is
//! persisted across restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::client::SecretStore;
use super::error::{Result, SecretsError};
use super::types::{SecretFields, SecretRecord};

/// In-memory [`SecretStore`] with call counters and failure injection.
#[derive(Debug, Default, Clone)]
pub struct InMemorySecretStore {
    records: Arc<RwLock<HashMap<String, SecretRecord>>>,
    get_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    fail_next_update: Arc<Mutex<Option<String>>>,
}

impl InMemorySecretStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub async fn insert(&self, name: impl Into<String>, record: SecretRecord) {
        self.records.write().await.insert(name.into(), record);
    }

    /// Snapshot of a record, bypassing the call counters.
    pub async fn record(&self, name: &str) -> Option<SecretRecord> {
        self.records.read().await.get(name).cloned()
    }

    /// Number of `get_record` calls served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `update_record` calls received so far, failed ones included.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Make the next `update_record` call fail with a backend error.
    pub async fn fail_next_update(&self, message: impl Into<String>) {
        *self.fail_next_update.lock().await = Some(message.into());
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_record(&self, name: &str) -> Result<SecretRecord> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.records.read().await.get(name).cloned().ok_or_else(|| SecretsError::not_found(name))
    }

    async fn update_record(&self, name: &str, fields: &SecretFields) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.fail_next_update.lock().await.take() {
            return Err(SecretsError::backend_error(message));
        }

        let mut records = self.records.write().await;
        let record = records.get_mut(name).ok_or_else(|| SecretsError::not_found(name))?;
        if !record.writable {
            return Err(SecretsError::backend_error(format!(
                "Secret '{}' is immutable and cannot be updated",
                name
            )));
        }
        record.fields.extend(fields.iter().map(|(field, value)| (field.clone(), value.clone())));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
