//! End-to-end reconcile scenarios against the in-memory collaborators.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use iam_recycler::identity::{InMemoryIdentityProvider, ProviderCall, ProviderOperation};
use iam_recycler::recycler::{
    ManualClock, ReconcileOutcome, Reconciler, RecyclerError, RotationPolicy, RotationState,
};
use iam_recycler::secrets::{InMemorySecretStore, SecretRecord};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn policy() -> RotationPolicy {
    RotationPolicy::new("p1", "s1", "AK", "SK", "svc-a", 60)
}

struct Harness {
    provider: InMemoryIdentityProvider,
    store: InMemorySecretStore,
    clock: Arc<ManualClock>,
    reconciler: Reconciler,
}

impl Harness {
    async fn new(record: SecretRecord) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let provider = InMemoryIdentityProvider::new().with_clock(clock.clone());
        let store = InMemorySecretStore::new();
        store.insert("s1", record).await;
        let reconciler =
            Reconciler::new(Arc::new(provider.clone()), Arc::new(store.clone()), clock.clone());
        Self { provider, store, clock, reconciler }
    }

    async fn reconcile(&self, state: &RotationState) -> Result<ReconcileOutcome, RecyclerError> {
        self.reconciler.reconcile(&policy(), state).await
    }

    async fn field(&self, name: &str) -> Option<String> {
        self.store
            .record("s1")
            .await
            .and_then(|record| record.field(name).map(|value| value.expose_secret().to_string()))
    }

    async fn deleted_ids(&self) -> Vec<String> {
        self.provider
            .calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Delete { credential_id, .. } => Some(credential_id),
                _ => None,
            })
            .collect()
    }
}

#[tokio::test]
async fn first_rotation_publishes_new_credential() {
    let h = Harness::new(SecretRecord::empty().with_field("region", "us-east-1")).await;
    h.provider.seed_credential("svc-a", "k1", t0()).await;
    h.clock.set(t0() + ChronoDuration::minutes(5));

    let outcome = h.reconcile(&RotationState::default()).await.unwrap();

    assert!(h.deleted_ids().await.is_empty());
    assert_eq!(outcome.rotated.as_deref(), Some("k2"));
    assert_eq!(h.field("AK").await.as_deref(), Some("k2"));
    assert_eq!(h.field("SK").await.as_deref(), Some("secret-k2"));
    assert_eq!(h.field("region").await.as_deref(), Some("us-east-1"));
    assert_eq!(outcome.state.last_rotation_time, Some(t0() + ChronoDuration::minutes(5)));
    assert_eq!(outcome.requeue_after, Duration::from_secs(60 * 60));
}

#[tokio::test]
async fn rotation_at_ceiling_retires_oldest_credential() {
    let h = Harness::new(SecretRecord::empty()).await;
    h.provider.seed_credential("svc-a", "k2", t0() + ChronoDuration::minutes(30)).await;
    h.provider.seed_credential("svc-a", "k1", t0()).await;
    h.clock.set(t0() + ChronoDuration::hours(2));

    let outcome = h.reconcile(&RotationState::rotated_at(t0())).await.unwrap();

    assert_eq!(h.deleted_ids().await, vec!["k1".to_string()]);
    let remaining: Vec<String> =
        h.provider.credentials("svc-a").await.into_iter().map(|key| key.id).collect();
    assert_eq!(remaining, vec!["k2".to_string(), "k3".to_string()]);
    assert_eq!(outcome.rotated.as_deref(), Some("k3"));
}

#[tokio::test]
async fn immediate_second_reconcile_is_a_no_op() {
    let h = Harness::new(SecretRecord::empty()).await;
    h.provider.add_identity("svc-a").await;

    let first = h.reconcile(&RotationState::default()).await.unwrap();
    let calls_after_first = h.provider.call_count().await;
    let gets_after_first = h.store.get_calls();

    let second = h.reconcile(&first.state).await.unwrap();
    assert!(!second.is_rotated());
    assert_eq!(second.state, first.state);
    assert_eq!(second.requeue_after, Duration::from_secs(60 * 60));
    assert_eq!(h.provider.call_count().await, calls_after_first);
    assert_eq!(h.store.get_calls(), gets_after_first);
}

#[tokio::test]
async fn immutable_secret_makes_no_provider_calls() {
    let h = Harness::new(SecretRecord::empty().with_field("AK", "old").immutable()).await;
    h.provider.seed_credential("svc-a", "k1", t0()).await;

    let err = h.reconcile(&RotationState::default()).await.unwrap_err();

    assert!(matches!(err, RecyclerError::Immutable { .. }));
    assert_eq!(h.provider.call_count().await, 0);
    assert_eq!(h.store.update_calls(), 0);
    assert_eq!(h.field("AK").await.as_deref(), Some("old"));
}

#[tokio::test]
async fn missing_secret_is_reported_before_rotating() {
    let h = Harness::new(SecretRecord::empty()).await;
    h.provider.add_identity("svc-a").await;
    let mut other = policy();
    other.secret_name = "absent".to_string();

    let err = h.reconciler.reconcile(&other, &RotationState::default()).await.unwrap_err();

    assert!(matches!(err, RecyclerError::SecretNotFound { ref secret } if secret == "absent"));
    assert_eq!(h.provider.call_count().await, 0);
}

#[tokio::test]
async fn store_failure_after_issuance_keeps_state() {
    let h = Harness::new(SecretRecord::empty()).await;
    h.provider.seed_credential("svc-a", "k1", t0()).await;
    h.store.fail_next_update("connection reset").await;
    let state = RotationState::default();

    let err = h.reconcile(&state).await.unwrap_err();

    assert!(matches!(err, RecyclerError::Store(_)));
    // The issued credential stays with the provider.
    assert_eq!(h.provider.credentials("svc-a").await.len(), 2);
    assert_eq!(h.field("AK").await, None);

    // Retrying from the unchanged state rotates again, pruning the oldest.
    h.clock.advance(ChronoDuration::minutes(1));
    let outcome = h.reconcile(&state).await.unwrap();
    assert_eq!(h.deleted_ids().await, vec!["k1".to_string()]);
    assert_eq!(h.field("AK").await, outcome.rotated);
}

#[tokio::test]
async fn provider_list_failure_is_surfaced_unchanged() {
    let h = Harness::new(SecretRecord::empty()).await;
    h.provider.add_identity("svc-a").await;
    h.provider.fail_next(ProviderOperation::List, "rate exceeded").await;

    let err = h.reconcile(&RotationState::default()).await.unwrap_err();

    match err {
        RecyclerError::Provider(inner) => assert!(inner.to_string().contains("rate exceeded")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.store.update_calls(), 0);
}

#[tokio::test]
async fn overdue_trigger_rotates_once_and_anchors_to_now() {
    let h = Harness::new(SecretRecord::empty()).await;
    h.provider.add_identity("svc-a").await;
    let now = t0() + ChronoDuration::hours(10);
    h.clock.set(now);

    let outcome = h.reconcile(&RotationState::rotated_at(t0())).await.unwrap();
    assert!(outcome.is_rotated());
    assert_eq!(outcome.state.last_rotation_time, Some(now));

    let again = h.reconcile(&outcome.state).await.unwrap();
    assert!(!again.is_rotated());
    assert_eq!(h.provider.credentials("svc-a").await.len(), 1);
}

proptest! {
    #[test]
    fn waiting_policies_never_touch_collaborators(minutes_since in 0i64..60) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let h = Harness::new(SecretRecord::empty()).await;
            h.clock.set(t0() + ChronoDuration::minutes(minutes_since));

            let outcome = h.reconcile(&RotationState::rotated_at(t0())).await.unwrap();
            assert!(!outcome.is_rotated());
            assert_eq!(
                outcome.requeue_after,
                Duration::from_secs(((60 - minutes_since) * 60) as u64)
            );
            assert_eq!(h.provider.call_count().await, 0);
            assert_eq!(h.store.get_calls(), 0);
        });
    }
}
