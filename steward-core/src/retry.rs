//! Bounded retry policies for fallible async operations.

use std::future::Future;
use std::time::Duration;

use tracing::info;

use crate::error::Result;

/// Delay progression between retry attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// No pause between attempts.
    None,
    /// Constant pause.
    Fixed(Duration),
    /// Attempt number squared, in seconds: 1s, 4s, 9s, ...
    SquaredSeconds,
}

impl Backoff {
    /// Pause before the given attempt, counted from 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::SquaredSeconds => {
                Duration::from_secs(u64::from(attempt) * u64::from(attempt))
            }
        }
    }
}

/// Bounded retry policy.
///
/// `times` counts attempts beyond the first, so `times == 0` means a single
/// attempt and no retrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Retry {
    pub times: u32,
    pub backoff: Backoff,
}

impl Retry {
    pub fn none() -> Self {
        Self {
            times: 0,
            backoff: Backoff::None,
        }
    }

    /// Retries with a constant one-second pause.
    pub fn after_second(times: u32) -> Self {
        Self {
            times,
            backoff: Backoff::Fixed(Duration::from_secs(1)),
        }
    }

    /// Retries with squared-second pauses: 1s, then 4s, then 9s, ...
    pub fn after_squared_second(times: u32) -> Self {
        Self {
            times,
            backoff: Backoff::SquaredSeconds,
        }
    }

    /// Runs `operation`, retrying up to [`Retry::times`] further attempts
    /// with the configured backoff between them. The final error is returned
    /// when every attempt fails.
    pub async fn with_countdown<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.times => {
                    attempt += 1;
                    let delay = self.backoff.delay(attempt);
                    info!(
                        operation = label,
                        attempt,
                        of = self.times,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl Default for Retry {
    fn default() -> Self {
        Self::none()
    }
}
