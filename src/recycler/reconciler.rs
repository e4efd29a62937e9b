//! Scheduler, rotator and publisher composed into one reconcile call.

use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use validator::Validate;

use super::clock::Clock;
use super::error::{RecyclerError, Result};
use super::policy::{RotationPolicy, RotationState};
use super::publisher::{PublishTarget, SecretPublisher};
use super::rotator::CredentialRotator;
use super::scheduler::{due_check, DueCheck};
use crate::identity::IdentityProvider;
use crate::reconcile_span;
use crate::secrets::SecretStore;

/// Result of a successful reconcile call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// State to persist. Equal to the input when nothing rotated.
    pub state: RotationState,

    /// Call again after this long.
    pub requeue_after: Duration,

    /// Id of the credential issued by this call, if any.
    pub rotated: Option<String>,
}

impl ReconcileOutcome {
    pub fn is_rotated(&self) -> bool {
        self.rotated.is_some()
    }
}

/// Decides whether a policy is due and, if so, rotates and publishes.
///
/// Callers must not run two reconciles for the same policy concurrently.
#[derive(Clone)]
pub struct Reconciler {
    rotator: CredentialRotator,
    publisher: SecretPublisher,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn SecretStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rotator: CredentialRotator::new(identity),
            publisher: SecretPublisher::new(store),
            clock,
        }
    }

    /// Run one reconcile for `policy` given its last persisted `state`.
    ///
    /// On error the caller keeps `state` as it was.
    pub async fn reconcile(&self, policy: &RotationPolicy, state: &RotationState) -> Result<ReconcileOutcome> {
        policy
            .validate()
            .map_err(|e| RecyclerError::invalid_policy(&policy.name, e.to_string()))?;

        self.reconcile_valid(policy, state).instrument(reconcile_span!(policy.name)).await
    }

    async fn reconcile_valid(&self, policy: &RotationPolicy, state: &RotationState) -> Result<ReconcileOutcome> {
        if let DueCheck::Wait(wait) = due_check(state, policy, self.clock.now()) {
            tracing::debug!(wait_seconds = wait.as_secs(), "Rotation not due");
            return Ok(ReconcileOutcome { state: *state, requeue_after: wait, rotated: None });
        }

        tracing::info!(
            secret = %policy.secret_name,
            identity = %policy.identity_name,
            last_rotation_time = ?state.last_rotation_time,
            "Rotation due"
        );

        let record = self.publisher.fetch_writable(&policy.secret_name).await?;
        let issued = self.rotator.rotate(&policy.identity_name).await?;

        let target = PublishTarget {
            secret_name: &policy.secret_name,
            access_key_field: &policy.access_key_field,
            secret_key_field: &policy.secret_key_field,
        };
        if let Err(e) = self.publisher.write(target, record, &issued).await {
            tracing::error!(
                error = %e,
                credential_id = %issued.id,
                secret = %policy.secret_name,
                "Credential issued but not published"
            );
            return Err(e);
        }

        let now = self.clock.now();
        let completed_at = match state.last_rotation_time {
            Some(previous) if previous > now => {
                tracing::warn!(%previous, %now, "Clock is behind the last rotation; keeping previous timestamp");
                previous
            }
            _ => now,
        };

        tracing::info!(
            credential_id = %issued.id,
            completed_at = %completed_at,
            next_in_minutes = policy.recycle_interval_minutes,
            "Rotation complete"
        );

        let state = RotationState::rotated_at(completed_at);
        let requeue_after = match due_check(&state, policy, now) {
            DueCheck::Wait(wait) => wait,
            DueCheck::Due => policy.interval_std(),
        };

        Ok(ReconcileOutcome { state, requeue_after, rotated: Some(issued.id) })
    }
}
