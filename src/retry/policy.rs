use std::time::Duration;

use crate::constants::{DEFAULT_BASE_WAIT_SECS, DEFAULT_CAP_WAIT_SECS, DEFAULT_MAX_ATTEMPTS};

/// Bounded retry with capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait after the first transient failure.
    pub base_wait: Duration,
    /// Upper bound on any single wait, hints included.
    pub cap_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_wait: Duration::from_secs(DEFAULT_BASE_WAIT_SECS),
            cap_wait: Duration::from_secs(DEFAULT_CAP_WAIT_SECS),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is raised to 1 and `base_wait` lowered to `cap_wait`
    /// if needed.
    pub fn new(max_attempts: u32, base_wait: Duration, cap_wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_wait: base_wait.min(cap_wait),
            cap_wait,
        }
    }

    /// Backoff before retry number `step` (0-based): `min(base * 2^step, cap)`.
    pub fn backoff(&self, step: u32) -> Duration {
        let factor = 1u32.checked_shl(step.min(31)).unwrap_or(u32::MAX);
        self.base_wait.saturating_mul(factor).min(self.cap_wait)
    }

    /// Sum of the first `failures` backoff steps.
    pub fn total_backoff(&self, failures: u32) -> Duration {
        (0..failures).map(|step| self.backoff(step)).sum()
    }

    /// Clamps a server-provided wait hint to the cap.
    pub fn clamp_hint(&self, hint: Duration) -> Duration {
        hint.min(self.cap_wait)
    }
}
