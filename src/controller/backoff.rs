//! Requeue delay after failed reconciles.

use std::time::Duration;

/// Exponential backoff: `initial * 2^attempt`, capped at `max`.
#[derive(Debug, Clone)]
pub struct ErrorBackoff {
    initial: Duration,
    max: Duration,
    attempt: u32,
}

impl ErrorBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max: max.max(initial), attempt: 0 }
    }

    /// Delay before the next attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.checked_pow(self.attempt).unwrap_or(u32::MAX);
        let delay = self.initial.checked_mul(factor).unwrap_or(self.max).min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Consecutive failures since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
