//! Writes an issued credential into its secret record.

use std::sync::Arc;

use super::error::{RecyclerError, Result};
use crate::identity::IssuedCredential;
use crate::secrets::{SecretFields, SecretRecord, SecretStore, SecretString};

/// Where a credential is published: record name and the two field names.
#[derive(Debug, Clone, Copy)]
pub struct PublishTarget<'a> {
    pub secret_name: &'a str,
    pub access_key_field: &'a str,
    pub secret_key_field: &'a str,
}

/// Publishes credentials into secret records.
#[derive(Clone)]
pub struct SecretPublisher {
    store: Arc<dyn SecretStore>,
}

impl SecretPublisher {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Fetch a record and fail unless it exists and is writable.
    pub async fn fetch_writable(&self, secret_name: &str) -> Result<SecretRecord> {
        let record = self
            .store
            .get_record(secret_name)
            .await
            .map_err(|e| RecyclerError::from_store(secret_name, e))?;

        if !record.writable {
            tracing::warn!(secret = %secret_name, "Secret is immutable; refusing to update");
            return Err(RecyclerError::immutable(secret_name));
        }
        Ok(record)
    }

    /// Set the two credential fields of an already fetched record in one
    /// update. Other fields are left to the store untouched.
    pub async fn write(
        &self,
        target: PublishTarget<'_>,
        record: SecretRecord,
        credential: &IssuedCredential,
    ) -> Result<()> {
        if !record.writable {
            return Err(RecyclerError::immutable(target.secret_name));
        }

        let mut fields = SecretFields::new();
        fields.insert(target.access_key_field.to_string(), SecretString::new(credential.access_id.clone()));
        fields.insert(target.secret_key_field.to_string(), credential.secret_material.clone());

        self.store
            .update_record(target.secret_name, &fields)
            .await
            .map_err(|e| RecyclerError::from_store(target.secret_name, e))?;

        tracing::info!(
            secret = %target.secret_name,
            backend = self.store.backend_name(),
            credential_id = %credential.id,
            "Published credential"
        );
        Ok(())
    }

    /// [`fetch_writable`](Self::fetch_writable) followed by [`write`](Self::write).
    pub async fn publish(&self, target: PublishTarget<'_>, credential: &IssuedCredential) -> Result<()> {
        let record = self.fetch_writable(target.secret_name).await?;
        self.write(target, record, credential).await
    }
}
