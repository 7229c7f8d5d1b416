//! Error types shared across the orchestrator.

use std::fmt;
use std::time::Duration;

use steward_model::InstanceId;
use thiserror::Error;

/// Elapsed-time ceiling that aborted an instance's wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutCeiling {
    /// The instance never answered within the unavailability budget.
    Unavailable,
    /// The observed state stopped evolving for too long.
    StateUnchanged,
    /// The absolute wall-clock budget for the whole wait.
    Constant,
}

impl fmt::Display for TimeoutCeiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TimeoutCeiling::Unavailable => "unavailable",
            TimeoutCeiling::StateUnchanged => "state unchanged",
            TimeoutCeiling::Constant => "constant",
        };
        f.write_str(text)
    }
}

/// Errors produced by orchestration operations.
#[derive(Error, Debug)]
pub enum StewardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Instance '{instance}' hit the {ceiling} ceiling after {elapsed:?}")]
    Timeout {
        instance: InstanceId,
        ceiling: TimeoutCeiling,
        elapsed: Duration,
    },

    #[error("Step '{step}' failed on instance '{instance}': {reason}")]
    Step {
        step: String,
        instance: InstanceId,
        reason: String,
    },

    #[error("Health verification failed: {failed} of {total} checks unhealthy")]
    Unhealthy { failed: usize, total: usize },

    #[error("Operation aborted: {0}")]
    Aborted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for operations that can produce a [`StewardError`].
pub type Result<T> = std::result::Result<T, StewardError>;
