//! Health check definitions for environment verification.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// One HTTP endpoint that must respond for an environment to count as
/// healthy.
///
/// A check passes when the response status equals [`HealthCheck::status`]
/// and, when set, the body contains [`HealthCheck::text`]. Budgets are
/// per-check: `connection_timeout` bounds a single attempt, `max_await_time`
/// bounds the whole wait for this endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub url: Url,
    #[serde(default = "HealthCheck::default_method")]
    pub method: String,
    #[serde(default = "HealthCheck::default_status")]
    pub status: u16,
    /// Substring the response body must contain, when set.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "HealthCheck::default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "HealthCheck::default_max_await_time_ms")]
    pub max_await_time_ms: u64,
}

impl HealthCheck {
    fn default_method() -> String {
        "GET".to_string()
    }

    const fn default_status() -> u16 {
        200
    }

    const fn default_connection_timeout_ms() -> u64 {
        5_000
    }

    const fn default_max_await_time_ms() -> u64 {
        60_000
    }

    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: Self::default_method(),
            status: Self::default_status(),
            text: None,
            connection_timeout_ms: Self::default_connection_timeout_ms(),
            max_await_time_ms: Self::default_max_await_time_ms(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_max_await_time(mut self, max_await_time: Duration) -> Self {
        self.max_await_time_ms = max_await_time.as_millis() as u64;
        self
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn max_await_time(&self) -> Duration {
        Duration::from_millis(self.max_await_time_ms)
    }
}

impl fmt::Display for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
