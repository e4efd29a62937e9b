//! Rotation policy and persisted rotation state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One rotating credential pair, declared by the operator.
///
/// Field names are camelCase; the lowercase manifest names (`secret`,
/// `datakeyaccesskey`, `datakeysecretkey`, `iamuser`, `recycle`) are accepted
/// as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RotationPolicy {
    /// Policy name; keys the status store and log fields
    #[validate(length(min = 1, message = "Policy name cannot be empty"))]
    pub name: String,

    /// Target secret record
    #[serde(alias = "secret")]
    #[validate(length(min = 1, message = "Secret name cannot be empty"))]
    pub secret_name: String,

    /// Record field receiving the access id
    #[serde(alias = "datakeyaccesskey")]
    #[validate(length(min = 1, message = "Access key field cannot be empty"))]
    pub access_key_field: String,

    /// Record field receiving the secret material
    #[serde(alias = "datakeysecretkey")]
    #[validate(length(min = 1, message = "Secret key field cannot be empty"))]
    pub secret_key_field: String,

    /// Identity whose credentials are rotated
    #[serde(alias = "iamuser")]
    #[validate(length(min = 1, message = "Identity name cannot be empty"))]
    pub identity_name: String,

    /// Minimum time between rotations, in minutes
    #[serde(alias = "recycle")]
    #[validate(range(min = 1, message = "Recycle interval must be at least 1 minute"))]
    pub recycle_interval_minutes: u64,
}

impl RotationPolicy {
    pub fn new(
        name: impl Into<String>,
        secret_name: impl Into<String>,
        access_key_field: impl Into<String>,
        secret_key_field: impl Into<String>,
        identity_name: impl Into<String>,
        recycle_interval_minutes: u64,
    ) -> Self {
        Self {
            name: name.into(),
            secret_name: secret_name.into(),
            access_key_field: access_key_field.into(),
            secret_key_field: secret_key_field.into(),
            identity_name: identity_name.into(),
            recycle_interval_minutes,
        }
    }

    /// The rotation interval. Saturates at [`Duration::MAX`].
    pub fn interval(&self) -> Duration {
        i64::try_from(self.recycle_interval_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX)
    }

    /// The rotation interval as a sleep duration.
    pub fn interval_std(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.recycle_interval_minutes.saturating_mul(60))
    }
}

/// Mutable rotation state owned by the reconciler and persisted by its caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationState {
    /// Completion time of the last successful rotation; `None` means never rotated
    #[serde(default, alias = "lastRecycleTime", skip_serializing_if = "Option::is_none")]
    pub last_rotation_time: Option<DateTime<Utc>>,
}

impl RotationState {
    pub fn rotated_at(time: DateTime<Utc>) -> Self {
        Self { last_rotation_time: Some(time) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> RotationPolicy {
        RotationPolicy::new("p1", "s1", "AK", "SK", "svc-a", 60)
    }

    #[test]
    fn test_valid_policy() {
        assert!(policy().validate().is_ok());
        assert_eq!(policy().interval(), Duration::minutes(60));
        assert_eq!(policy().interval_std(), std::time::Duration::from_secs(3600));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut p = policy();
        p.recycle_interval_minutes = 0;
        let errors = p.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("recycle_interval_minutes"));
    }

    #[test]
    fn test_huge_interval_saturates() {
        let mut p = policy();
        p.recycle_interval_minutes = u64::MAX;
        assert!(p.validate().is_ok());
        assert_eq!(p.interval(), Duration::MAX);
        assert_eq!(p.interval_std(), std::time::Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_empty_fields_are_rejected() {
        let mut p = policy();
        p.secret_name.clear();
        p.identity_name.clear();
        let errors = p.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("secret_name"));
        assert!(errors.field_errors().contains_key("identity_name"));
    }

    #[test]
    fn test_manifest_field_aliases() {
        let json = r#"{
            "name": "p1",
            "secret": "s1",
            "datakeyaccesskey": "AK",
            "datakeysecretkey": "SK",
            "iamuser": "svc-a",
            "recycle": 60
        }"#;
        let parsed: RotationPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, policy());
    }

    #[test]
    fn test_state_serialization() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let state = RotationState::rotated_at(t0);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"lastRotationTime":"2024-01-01T00:00:00Z"}"#);

        let legacy: RotationState =
            serde_json::from_str(r#"{"lastRecycleTime":"2024-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(legacy, state);

        let empty: RotationState = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.last_rotation_time, None);
    }
}
