//! Due-check for a single policy.
//!
//! Pure functions of `(state, policy, now)`. There is no catch-up: however
//! far past `next_run` the check happens, the answer is a single [`DueCheck::Due`]
//! and the caller anchors the next schedule to the completion time.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::policy::{RotationPolicy, RotationState};

/// Outcome of a due-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueCheck {
    /// Rotate now.
    Due,
    /// Not due; check again after this long.
    Wait(Duration),
}

impl DueCheck {
    pub fn is_due(&self) -> bool {
        matches!(self, Self::Due)
    }
}

/// When the next rotation becomes due, or `None` if the policy never rotated.
pub fn next_run(state: &RotationState, policy: &RotationPolicy) -> Option<DateTime<Utc>> {
    state.last_rotation_time.map(|last| {
        last.checked_add_signed(policy.interval()).unwrap_or(DateTime::<Utc>::MAX_UTC)
    })
}

pub fn due_check(state: &RotationState, policy: &RotationPolicy, now: DateTime<Utc>) -> DueCheck {
    match next_run(state, policy) {
        Some(next) if now < next => DueCheck::Wait((next - now).to_std().unwrap_or_default()),
        _ => DueCheck::Due,
    }
}
