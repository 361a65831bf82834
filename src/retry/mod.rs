//! Bounded retry around a single remote call.
//!
//! [`RetryableExecutor::execute`] never returns `Err`: every expected failure mode ends up in
//! an [`Outcome`], together with the number of attempts made and the total time slept.

pub mod error;
pub mod policy;

#[cfg(test)]
mod tests;

pub use error::RemoteError;
pub use policy::RetryPolicy;

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Final result of a retried call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Terminal(RemoteError),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn into_result(self) -> Result<T, RemoteError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Terminal(err) => Err(err),
        }
    }
}

/// An [`Outcome`] plus bookkeeping about how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution<T> {
    pub outcome: Outcome<T>,
    pub attempts: u32,
    pub slept: Duration,
}

impl<T> Execution<T> {
    pub fn into_result(self) -> Result<T, RemoteError> {
        self.outcome.into_result()
    }
}

/// Runs remote operations under a [`RetryPolicy`].
///
/// Waiting is done with `tokio::time::sleep`, so a backoff only suspends the calling task.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryableExecutor {
    policy: RetryPolicy,
}

impl RetryableExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Calls `op` until it succeeds, fails terminally, or the attempt budget runs out.
    ///
    /// - rate limited with a hint: sleep `min(hint, cap)`, backoff unchanged
    /// - rate limited without a hint, or any other retryable error: sleep the current
    ///   backoff, then double it (capped)
    /// - terminal error: return immediately
    ///
    /// Nothing is slept after the last attempt.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut op: F) -> Execution<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut wait = self.policy.base_wait;
        let mut slept = Duration::ZERO;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let err = match op().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(label, attempts, "Remote call succeeded after retry");
                    }
                    return Execution {
                        outcome: Outcome::Success(value),
                        attempts,
                        slept,
                    };
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!(label, attempts, kind = err.kind(), error = %err, "Terminal failure");
                return Execution {
                    outcome: Outcome::Terminal(err),
                    attempts,
                    slept,
                };
            }

            if attempts >= self.policy.max_attempts {
                warn!(
                    label,
                    attempts,
                    kind = err.kind(),
                    error = %err,
                    "Giving up after exhausting retries"
                );
                return Execution {
                    outcome: Outcome::Terminal(err),
                    attempts,
                    slept,
                };
            }

            let pause = match err.retry_after() {
                Some(hint) => self.policy.clamp_hint(hint),
                None => {
                    let current = wait;
                    wait = wait.saturating_mul(2).min(self.policy.cap_wait);
                    current
                }
            };

            warn!(
                label,
                attempt = attempts,
                max_attempts = self.policy.max_attempts,
                kind = err.kind(),
                wait_ms = pause.as_millis() as u64,
                "Retryable failure, backing off"
            );

            tokio::time::sleep(pause).await;
            slept += pause;
        }
    }
}
