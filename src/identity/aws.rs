//! AWS IAM identity provider.
//!
//! Rotates the access keys of an IAM user with `ListAccessKeys`,
//! `DeleteAccessKey` and `CreateAccessKey`. AWS allows at most two access
//! keys per user, which is why the rotator prunes the oldest key first.
//!
//! # Configuration
//!
//! ```rust,ignore
//! use iam_recycler::config::AwsConfig;
//! use iam_recycler::identity::AwsIamProvider;
//!
//! let provider = AwsIamProvider::new(AwsConfig {
//!     region: Some("us-east-1".into()),
//!     profile: None,
//!     endpoint_url: None,
//! })
//! .await;
//! ```

use async_trait::async_trait;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_iam::Client;
use chrono::{DateTime, Utc};

use crate::config::AwsConfig;

use super::error::{IdentityError, Result};
use super::{CredentialKey, IdentityProvider, IssuedCredential};
use crate::secrets::SecretString;

/// [`IdentityProvider`] backed by AWS IAM access keys.
#[derive(Debug, Clone)]
pub struct AwsIamProvider {
    client: Client,
}

impl AwsIamProvider {
    /// Load SDK configuration and build an IAM client.
    pub async fn new(config: AwsConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        tracing::info!(
            provider = "aws_iam",
            region = ?config.region,
            profile = ?config.profile,
            "Initialized AWS IAM provider"
        );

        Self { client: Client::new(&sdk_config) }
    }
}

fn to_chrono(date: &aws_sdk_iam::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(date.secs(), date.subsec_nanos())
}

/// Map an SDK failure onto [`IdentityError`] using the IAM error code.
fn map_sdk_error<E, R>(
    operation: &str,
    identity: &str,
    credential_id: Option<&str>,
    error: SdkError<E, R>,
) -> IdentityError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if matches!(error, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
        return IdentityError::connection_failed(DisplayErrorContext(&error).to_string());
    }

    let message = error.message().unwrap_or_default().to_string();
    match (error.code(), credential_id) {
        (Some("NoSuchEntity"), Some(id)) if operation == "DeleteAccessKey" => {
            IdentityError::credential_not_found(identity, id)
        }
        (Some("NoSuchEntity"), _) => IdentityError::identity_not_found(identity),
        (Some("LimitExceeded"), _) => IdentityError::limit_exceeded(identity),
        (Some("AccessDenied") | Some("AccessDeniedException"), _) => IdentityError::access_denied(message),
        (Some("Throttling") | Some("ThrottlingException"), _) => IdentityError::throttled(message),
        _ => IdentityError::provider(operation, DisplayErrorContext(&error).to_string()),
    }
}

#[async_trait]
impl IdentityProvider for AwsIamProvider {
    #[tracing::instrument(skip(self), fields(provider = "aws_iam"))]
    async fn list_credentials(&self, identity: &str) -> Result<Vec<CredentialKey>> {
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_access_keys()
                .user_name(identity)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| map_sdk_error("ListAccessKeys", identity, None, e))?;

            for metadata in output.access_key_metadata() {
                let id = metadata.access_key_id().ok_or_else(|| {
                    IdentityError::provider("ListAccessKeys", "access key without an id")
                })?;
                let created_at = metadata.create_date().and_then(to_chrono).ok_or_else(|| {
                    IdentityError::provider(
                        "ListAccessKeys",
                        format!("access key '{}' has no valid creation date", id),
                    )
                })?;
                keys.push(CredentialKey::new(id, created_at));
            }

            match (output.is_truncated(), output.marker()) {
                (true, Some(next)) => marker = Some(next.to_string()),
                _ => break,
            }
        }

        tracing::debug!(identity = %identity, count = keys.len(), "Listed access keys");
        Ok(keys)
    }

    #[tracing::instrument(skip(self), fields(provider = "aws_iam"))]
    async fn delete_credential(&self, identity: &str, credential_id: &str) -> Result<()> {
        self.client
            .delete_access_key()
            .user_name(identity)
            .access_key_id(credential_id)
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteAccessKey", identity, Some(credential_id), e))?;

        tracing::info!(identity = %identity, credential_id = %credential_id, "Deleted access key");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(provider = "aws_iam"))]
    async fn create_credential(&self, identity: &str) -> Result<IssuedCredential> {
        let output = self
            .client
            .create_access_key()
            .user_name(identity)
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateAccessKey", identity, None, e))?;

        let key = output.access_key().ok_or_else(|| {
            IdentityError::provider("CreateAccessKey", "response did not contain an access key")
        })?;

        tracing::info!(identity = %identity, credential_id = %key.access_key_id(), "Created access key");

        Ok(IssuedCredential {
            id: key.access_key_id().to_string(),
            access_id: key.access_key_id().to_string(),
            secret_material: SecretString::new(key.secret_access_key()),
        })
    }

    fn provider_name(&self) -> &'static str {
        "aws_iam"
    }
}
