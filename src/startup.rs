//! Startup wiring
//!
//! Builds the configured identity provider, secret store and status store
//! and assembles them into a [`Controller`].
//!
//! The `memory` backends start empty. To make dry runs useful, every
//! identity and secret named by a policy is registered up front.

use crate::config::{AppConfig, IdentityBackend, SecretsBackend};
use crate::controller::Controller;
use crate::errors::Result;
use crate::identity::{IdentityProvider, InMemoryIdentityProvider};
use crate::recycler::{Reconciler, SystemClock};
use crate::secrets::{InMemorySecretStore, SecretRecord, SecretStore, VaultSecretStore};
use crate::status::FileStatusStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the identity provider selected by `identity.backend`.
pub async fn build_identity_provider(config: &AppConfig) -> Result<Arc<dyn IdentityProvider>> {
    match config.identity.backend {
        IdentityBackend::Aws => build_aws_provider(config).await,
        IdentityBackend::Memory => {
            warn!("Using in-memory identity provider; issued credentials are not real");
            let provider = InMemoryIdentityProvider::new();
            for policy in &config.policies {
                provider.add_identity(policy.identity_name.clone()).await;
            }
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(feature = "aws")]
async fn build_aws_provider(config: &AppConfig) -> Result<Arc<dyn IdentityProvider>> {
    let provider = crate::identity::AwsIamProvider::new(config.identity.aws.clone()).await;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "aws"))]
async fn build_aws_provider(_config: &AppConfig) -> Result<Arc<dyn IdentityProvider>> {
    Err(crate::errors::Error::config(
        "identity.backend = \"aws\" requires iam-recycler to be built with the `aws` feature",
    ))
}

/// Build the secret store selected by `secrets.backend`.
pub async fn build_secret_store(config: &AppConfig) -> Result<Arc<dyn SecretStore>> {
    match config.secrets.backend {
        SecretsBackend::Vault => {
            let store = VaultSecretStore::new(config.secrets.vault.clone()).await?;
            Ok(Arc::new(store))
        }
        SecretsBackend::Kubernetes => build_kubernetes_store(config).await,
        SecretsBackend::Memory => {
            warn!("Using in-memory secret store; published credentials are not persisted");
            let store = InMemorySecretStore::new();
            for policy in &config.policies {
                store.insert(policy.secret_name.clone(), SecretRecord::empty()).await;
            }
            Ok(Arc::new(store))
        }
    }
}

#[cfg(feature = "kubernetes")]
async fn build_kubernetes_store(config: &AppConfig) -> Result<Arc<dyn SecretStore>> {
    let store = crate::secrets::KubernetesSecretStore::new(config.secrets.kubernetes.clone()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "kubernetes"))]
async fn build_kubernetes_store(_config: &AppConfig) -> Result<Arc<dyn SecretStore>> {
    Err(crate::errors::Error::config(
        "secrets.backend = \"kubernetes\" requires iam-recycler to be built with the `kubernetes` feature",
    ))
}

/// Assemble a controller for every configured policy.
pub async fn build_controller(config: &AppConfig) -> Result<Controller> {
    let identity = build_identity_provider(config).await?;
    let store = build_secret_store(config).await?;
    let status = Arc::new(FileStatusStore::new(config.controller.status_dir.clone()));

    info!(
        identity_backend = identity.provider_name(),
        secrets_backend = store.backend_name(),
        status_dir = %config.controller.status_dir.display(),
        "Collaborators initialized"
    );

    let reconciler = Reconciler::new(identity, store, Arc::new(SystemClock));
    Ok(Controller::new(reconciler, status, config.policies.clone(), &config.controller))
}
