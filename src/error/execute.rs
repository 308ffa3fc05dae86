use reqwest::StatusCode;
use std::time::SystemTime;
use thiserror::Error as ThisError;

use super::IsRetryable;

/// Failure of one logical request made through the retrying executor.
#[derive(Debug, ThisError)]
pub enum ExecuteError {
    /// HTTP 429. `reset_at` is the provider's rate-limit reset hint, when it sent one.
    #[error("Rate limited (HTTP {status})")]
    RateLimited {
        status: StatusCode,
        reset_at: Option<SystemTime>,
    },

    /// Connect or read timeout.
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Business or validation error (any status >= 400 other than 429).
    #[error("Provider rejected the request (HTTP {status}): {message}")]
    Rejected { status: StatusCode, message: String },

    /// A non-error status the executor does not treat as success (only 200 and 201 are).
    #[error("Unexpected response status: HTTP {status}")]
    UnexpectedStatus { status: StatusCode },

    /// Transport failure other than a timeout (DNS, TLS, connection refused, ...).
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Every attempt in the budget ended in a retryable failure.
    #[error("Gave up after {attempts} attempts; last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<ExecuteError>,
    },
}

impl From<reqwest::Error> for ExecuteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExecuteError::Timeout(err)
        } else {
            ExecuteError::Transport(err)
        }
    }
}

impl ExecuteError {
    /// HTTP status behind the failure, looking through `Exhausted`.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ExecuteError::RateLimited { status, .. }
            | ExecuteError::Rejected { status, .. }
            | ExecuteError::UnexpectedStatus { status } => Some(*status),
            ExecuteError::Timeout(e) | ExecuteError::Transport(e) => e.status(),
            ExecuteError::Exhausted { last, .. } => last.status(),
            ExecuteError::Decode(_) | ExecuteError::InvalidUrl(_) => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, ExecuteError::Exhausted { .. })
    }
}

impl IsRetryable for ExecuteError {
    fn is_retryable(&self) -> bool {
        match self {
            ExecuteError::RateLimited { .. } | ExecuteError::Timeout(_) => true,
            ExecuteError::Rejected { .. }
            | ExecuteError::UnexpectedStatus { .. }
            | ExecuteError::Transport(_)
            | ExecuteError::Decode(_)
            | ExecuteError::InvalidUrl(_)
            | ExecuteError::Exhausted { .. } => false,
        }
    }
}
