//! In-memory identity provider.
//!
//! Deterministic stand-in for a cloud identity service:
//! - credential ids are `k{n}`, where `n` counts every credential the
//!   provider has seen (seeded or issued), so seeding `k1` makes the next
//!   issued credential `k2`
//! - the access id equals the credential id and the secret material is
//!   `secret-{id}`
//! - every call is appended to a log that tests can inspect
//! - the provider ceiling (2 by default) is enforced on create

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::error::{IdentityError, Result};
use super::{CredentialKey, IdentityProvider, IssuedCredential};
use crate::recycler::clock::{Clock, SystemClock};
use crate::secrets::SecretString;

/// Default number of credentials an identity may hold at once.
pub const DEFAULT_CREDENTIAL_LIMIT: usize = 2;

const CREDENTIAL_ID_PREFIX: &str = "k";

/// A call received by [`InMemoryIdentityProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    List { identity: String },
    Delete { identity: String, credential_id: String },
    Create { identity: String },
}

/// Operation selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    List,
    Delete,
    Create,
}

#[derive(Debug, Default)]
struct ProviderState {
    identities: HashMap<String, Vec<CredentialKey>>,
    issued: usize,
    calls: Vec<ProviderCall>,
    failures: HashMap<ProviderOperation, String>,
}

/// In-memory [`IdentityProvider`].
#[derive(Clone)]
pub struct InMemoryIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
    clock: Arc<dyn Clock>,
    limit: Option<usize>,
}

impl std::fmt::Debug for InMemoryIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIdentityProvider")
            .field("limit", &self.limit)
            .finish()
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    /// Creates a provider with no identities and a ceiling of 2.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState::default())),
            clock: Arc::new(SystemClock),
            limit: Some(DEFAULT_CREDENTIAL_LIMIT),
        }
    }

    /// Use `clock` to stamp issued credentials.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Disable the credential ceiling.
    pub fn without_limit(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Register an identity with no credentials.
    pub async fn add_identity(&self, identity: impl Into<String>) {
        self.state.lock().await.identities.entry(identity.into()).or_default();
    }

    /// Register an identity holding `id` created at `created_at`.
    pub async fn seed_credential(
        &self,
        identity: impl Into<String>,
        id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) {
        let mut state = self.state.lock().await;
        state.issued += 1;
        state.identities.entry(identity.into()).or_default().push(CredentialKey::new(id, created_at));
    }

    /// Make the next call of `operation` fail with a provider error.
    pub async fn fail_next(&self, operation: ProviderOperation, message: impl Into<String>) {
        self.state.lock().await.failures.insert(operation, message.into());
    }

    /// Credentials currently held by `identity`, in insertion order.
    pub async fn credentials(&self, identity: &str) -> Vec<CredentialKey> {
        self.state.lock().await.identities.get(identity).cloned().unwrap_or_default()
    }

    /// Every call received so far.
    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    fn take_failure(state: &mut ProviderState, operation: ProviderOperation) -> Result<()> {
        match state.failures.remove(&operation) {
            Some(message) => Err(IdentityError::provider(format!("{:?}", operation), message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn list_credentials(&self, identity: &str) -> Result<Vec<CredentialKey>> {
        let mut state = self.state.lock().await;
        state.calls.push(ProviderCall::List { identity: identity.to_string() });
        Self::take_failure(&mut state, ProviderOperation::List)?;

        state
            .identities
            .get(identity)
            .cloned()
            .ok_or_else(|| IdentityError::identity_not_found(identity))
    }

    async fn delete_credential(&self, identity: &str, credential_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(ProviderCall::Delete {
            identity: identity.to_string(),
            credential_id: credential_id.to_string(),
        });
        Self::take_failure(&mut state, ProviderOperation::Delete)?;

        let credentials = state
            .identities
            .get_mut(identity)
            .ok_or_else(|| IdentityError::identity_not_found(identity))?;
        let position = credentials
            .iter()
            .position(|key| key.id == credential_id)
            .ok_or_else(|| IdentityError::credential_not_found(identity, credential_id))?;
        credentials.remove(position);
        Ok(())
    }

    async fn create_credential(&self, identity: &str) -> Result<IssuedCredential> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.calls.push(ProviderCall::Create { identity: identity.to_string() });
        Self::take_failure(&mut state, ProviderOperation::Create)?;

        let held = state
            .identities
            .get(identity)
            .map(Vec::len)
            .ok_or_else(|| IdentityError::identity_not_found(identity))?;
        if self.limit.is_some_and(|limit| held >= limit) {
            return Err(IdentityError::limit_exceeded(identity));
        }

        state.issued += 1;
        let id = format!("{}{}", CREDENTIAL_ID_PREFIX, state.issued);
        if let Some(credentials) = state.identities.get_mut(identity) {
            credentials.push(CredentialKey::new(id.clone(), now));
        }

        Ok(IssuedCredential {
            access_id: id.clone(),
            secret_material: SecretString::new(format!("secret-{}", id)),
            id,
        })
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
