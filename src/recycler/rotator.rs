//! List, prune and issue against the identity provider.

use std::sync::Arc;
use tracing::Instrument;

use super::error::Result;
use crate::identity::{IdentityProvider, IssuedCredential};
use crate::provider_span;

/// Number of credentials at which the oldest one is deleted before issuing.
pub const CREDENTIAL_CEILING: usize = 2;

/// Rotates the credentials of one identity.
#[derive(Clone)]
pub struct CredentialRotator {
    provider: Arc<dyn IdentityProvider>,
}

impl CredentialRotator {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Prune the oldest credential when at the ceiling, then issue a new one.
    ///
    /// Provider errors abort immediately and are returned unchanged. A failed
    /// delete means nothing is issued; nothing is rolled back.
    pub async fn rotate(&self, identity: &str) -> Result<IssuedCredential> {
        let provider = self.provider.provider_name();

        let mut keys = self
            .provider
            .list_credentials(identity)
            .instrument(provider_span!("list_credentials", identity, provider = provider))
            .await?;

        // Stable: equal timestamps keep listing order.
        keys.sort_by_key(|key| key.created_at);

        match keys.len() {
            CREDENTIAL_CEILING => {
                let oldest = &keys[0];
                self.provider
                    .delete_credential(identity, &oldest.id)
                    .instrument(provider_span!("delete_credential", identity, provider = provider))
                    .await?;
                tracing::info!(
                    identity = %identity,
                    credential_id = %oldest.id,
                    created_at = %oldest.created_at,
                    "Deleted oldest credential"
                );
            }
            count if count > CREDENTIAL_CEILING => {
                tracing::warn!(
                    identity = %identity,
                    count,
                    "Identity holds more credentials than the ceiling; not pruning"
                );
            }
            _ => {}
        }

        let issued = self
            .provider
            .create_credential(identity)
            .instrument(provider_span!("create_credential", identity, provider = provider))
            .await?;
        tracing::info!(identity = %identity, credential_id = %issued.id, "Issued new credential");

        Ok(issued)
    }
}
