use std::time::Duration;
use thiserror::Error;

/// Failure of one remote call (HTTP fetch or model inference).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport failure, request timeout or server-side error.
    #[error("network error: {reason}")]
    Network { reason: String },

    /// The server asked us to slow down, optionally saying for how long.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Model runtime failure that may succeed on a later attempt.
    #[error("inference failed: {reason}")]
    Inference { reason: String },

    /// Malformed request or missing resource.
    #[error("client error {status} for {url}")]
    Client { status: u16, url: String },

    /// Response arrived but lacks required fields.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// A batch call returned a different number of outputs than inputs.
    #[error("contract violation: expected {expected} outputs, got {actual}")]
    ContractViolation { expected: usize, actual: usize },
}

impl RemoteError {
    pub fn network(reason: impl Into<String>) -> Self {
        RemoteError::Network {
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        RemoteError::Validation {
            reason: reason.into(),
        }
    }

    pub fn inference(reason: impl Into<String>) -> Self {
        RemoteError::Inference {
            reason: reason.into(),
        }
    }

    /// Returns `true` if another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Network { .. }
                | RemoteError::RateLimited { .. }
                | RemoteError::Inference { .. }
        )
    }

    /// Server-provided wait hint, if this is a rate-limit response that carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RemoteError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-friendly label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteError::Network { .. } => "network",
            RemoteError::RateLimited { .. } => "rate_limited",
            RemoteError::Inference { .. } => "inference",
            RemoteError::Client { .. } => "client",
            RemoteError::Validation { .. } => "validation",
            RemoteError::ContractViolation { .. } => "contract_violation",
        }
    }
}
