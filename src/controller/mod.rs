//! Controller driver.
//!
//! Re-triggers [`Reconciler::reconcile`] for every configured policy and
//! persists the resulting state. Each policy gets its own task, and calls
//! for one policy never overlap.
//!
//! Failed calls are requeued with [`ErrorBackoff`]. If a rotation succeeds
//! but its state cannot be saved, the state is kept in memory and saved
//! before the next call, so the policy is not rotated a second time.

pub mod backoff;

pub use backoff::ErrorBackoff;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::ControllerConfig;
use crate::errors::{Error, Result};
use crate::recycler::{ReconcileOutcome, Reconciler, RotationPolicy, RotationState};
use crate::status::StatusStore;

/// Result of one reconcile call made by [`Controller::run_once`].
#[derive(Debug)]
pub struct PolicyReport {
    pub policy: String,
    pub result: Result<ReconcileOutcome>,
}

/// Drives reconciles for a fixed set of policies.
#[derive(Clone)]
pub struct Controller {
    reconciler: Reconciler,
    status: Arc<dyn StatusStore>,
    policies: Vec<RotationPolicy>,
    backoff_initial: Duration,
    backoff_max: Duration,
}

impl Controller {
    pub fn new(
        reconciler: Reconciler,
        status: Arc<dyn StatusStore>,
        policies: Vec<RotationPolicy>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            reconciler,
            status,
            policies,
            backoff_initial: config.error_backoff_initial(),
            backoff_max: config.error_backoff_max(),
        }
    }

    /// One reconcile per policy, in declaration order.
    pub async fn run_once(&self) -> Vec<PolicyReport> {
        let mut reports = Vec::with_capacity(self.policies.len());
        for policy in &self.policies {
            let mut pending = None;
            let result = self.cycle(policy, &mut pending).await;
            reports.push(PolicyReport { policy: policy.name.clone(), result });
        }
        reports
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Sleeping tasks stop immediately; a reconcile already in flight is
    /// allowed to finish.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        if self.policies.is_empty() {
            tracing::warn!("No rotation policies configured; nothing to do");
        }

        let mut tasks = JoinSet::new();
        for policy in self.policies.iter().cloned() {
            let controller = self.clone();
            let shutdown = shutdown.clone();
            tasks.spawn(async move { controller.policy_loop(policy, shutdown).await });
        }

        tracing::info!(policies = self.policies.len(), "Controller started");

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                shutdown.cancel();
                return Err(Error::internal(format!("Policy task failed: {}", e)));
            }
        }

        tracing::info!("Controller stopped");
        Ok(())
    }

    async fn policy_loop(&self, policy: RotationPolicy, shutdown: CancellationToken) {
        let mut backoff = ErrorBackoff::new(self.backoff_initial, self.backoff_max);
        let mut pending: Option<RotationState> = None;

        loop {
            let delay = match self.cycle(&policy, &mut pending).await {
                Ok(outcome) => {
                    backoff.reset();
                    outcome.requeue_after
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::error!(
                        policy = %policy.name,
                        error = %e,
                        retryable = e.is_retryable(),
                        attempt = backoff.attempt(),
                        retry_in_seconds = delay.as_secs(),
                        "Reconcile failed"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(policy = %policy.name, "Policy task shutting down");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Load, reconcile, save. `pending` holds a rotated state that has not
    /// been saved yet.
    async fn cycle(
        &self,
        policy: &RotationPolicy,
        pending: &mut Option<RotationState>,
    ) -> Result<ReconcileOutcome> {
        if let Some(state) = pending.as_ref() {
            self.status.save(&policy.name, state).await?;
            tracing::info!(policy = %policy.name, "Saved previously unsaved rotation state");
            *pending = None;
        }

        let state = self.status.load(&policy.name).await?;
        let outcome = self.reconciler.reconcile(policy, &state).await?;

        if outcome.is_rotated() {
            if let Err(e) = self.status.save(&policy.name, &outcome.state).await {
                tracing::error!(
                    policy = %policy.name,
                    error = %e,
                    "Rotation succeeded but its state could not be saved"
                );
                *pending = Some(outcome.state);
                return Err(e.into());
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentityProvider;
    use crate::recycler::{ManualClock, RecyclerError};
    use crate::secrets::{InMemorySecretStore, SecretRecord};
    use crate::status::{MemoryStatusStore, StatusError};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn policy(name: &str, secret: &str) -> RotationPolicy {
        RotationPolicy::new(name, secret, "AK", "SK", "svc-a", 60)
    }

    async fn reconciler(store: &InMemorySecretStore) -> (Reconciler, InMemoryIdentityProvider) {
        let clock = Arc::new(ManualClock::new(t0()));
        let provider = InMemoryIdentityProvider::new().with_clock(clock.clone());
        provider.add_identity("svc-a").await;
        let reconciler = Reconciler::new(Arc::new(provider.clone()), Arc::new(store.clone()), clock);
        (reconciler, provider)
    }

    /// Status store whose saves fail while `failing` is set.
    #[derive(Default)]
    struct FlakyStatusStore {
        inner: MemoryStatusStore,
        failing: AtomicBool,
    }

    #[async_trait]
    impl StatusStore for FlakyStatusStore {
        async fn load(&self, policy: &str) -> crate::status::Result<RotationState> {
            self.inner.load(policy).await
        }

        async fn save(&self, policy: &str, state: &RotationState) -> crate::status::Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StatusError::io(
                    "/status",
                    std::io::Error::other("read-only filesystem"),
                ));
            }
            self.inner.save(policy, state).await
        }
    }

    #[tokio::test]
    async fn test_run_once_reports_each_policy() {
        let store = InMemorySecretStore::new();
        store.insert("s1", SecretRecord::empty()).await;
        let (reconciler, _) = reconciler(&store).await;
        let status = MemoryStatusStore::new();

        let controller = Controller::new(
            reconciler,
            Arc::new(status.clone()),
            vec![policy("p1", "s1"), policy("p2", "missing")],
            &ControllerConfig::default(),
        );

        let reports = controller.run_once().await;
        assert_eq!(reports.len(), 2);
        assert!(reports[0].result.as_ref().unwrap().is_rotated());
        assert!(matches!(
            reports[1].result,
            Err(Error::Recycler(RecyclerError::SecretNotFound { .. }))
        ));

        assert_eq!(status.get("p1").await, Some(RotationState::rotated_at(t0())));
        assert_eq!(status.get("p2").await, None);

        // Second pass: p1 is waiting, nothing new is issued.
        let reports = controller.run_once().await;
        let outcome = reports[0].result.as_ref().unwrap();
        assert!(!outcome.is_rotated());
        assert_eq!(outcome.requeue_after, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_unsaved_rotation_is_not_repeated() {
        let store = InMemorySecretStore::new();
        store.insert("s1", SecretRecord::empty()).await;
        let (reconciler, provider) = reconciler(&store).await;
        let status = Arc::new(FlakyStatusStore::default());
        status.failing.store(true, Ordering::SeqCst);

        let controller = Controller::new(
            reconciler,
            status.clone(),
            vec![policy("p1", "s1")],
            &ControllerConfig::default(),
        );
        let p1 = policy("p1", "s1");
        let mut pending = None;

        assert!(controller.cycle(&p1, &mut pending).await.is_err());
        assert_eq!(pending, Some(RotationState::rotated_at(t0())));

        status.failing.store(false, Ordering::SeqCst);
        let outcome = controller.cycle(&p1, &mut pending).await.unwrap();
        assert!(!outcome.is_rotated());
        assert_eq!(pending, None);
        assert_eq!(provider.credentials("svc-a").await.len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let store = InMemorySecretStore::new();
        store.insert("s1", SecretRecord::empty()).await;
        let (reconciler, _) = reconciler(&store).await;
        let status = MemoryStatusStore::new();

        let controller = Controller::new(
            reconciler,
            Arc::new(status.clone()),
            vec![policy("p1", "s1")],
            &ControllerConfig::default(),
        );

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { controller.run(shutdown).await }
        });

        for _ in 0..200 {
            if status.get("p1").await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(status.get("p1").await.is_some());

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }
}
