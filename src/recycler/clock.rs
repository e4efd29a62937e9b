//! Time source used by the scheduler and the reconciler.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Supplies the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(start) }
    }

    /// Jump to `instant`, which may be earlier than the current reading.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
