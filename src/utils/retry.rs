// src/utils/retry.rs

//! Bounded retry with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;

use crate::error::AppError;

/// Retry schedule for flaky top-level operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(12),
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): `initial * 2^(attempt-1)`
    /// plus up to one `initial` of jitter, capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self
            .initial_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let jitter_ms = self.initial_delay.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        (base + jitter).min(self.max_delay)
    }

    /// Log a failed attempt and sleep before the next one.
    ///
    /// Returns `false` once `attempt` (1-based) was the last one allowed.
    pub async fn backoff(&self, what: &str, attempt: u32, error: &AppError) -> bool {
        let attempts = self.max_attempts.max(1);
        if attempt >= attempts {
            log::error!("{} failed after {} attempts: {}", what, attempts, error);
            return false;
        }
        let delay = self.delay(attempt);
        log::warn!(
            "{} failed (attempt {}/{}): {}. Retrying in {:?}",
            what,
            attempt,
            attempts,
            error,
            delay
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        true
    }
}
