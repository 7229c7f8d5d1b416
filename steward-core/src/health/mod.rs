//! Endpoint readiness verification for managed environments.
//!
//! Every configured check is probed concurrently until it reports healthy
//! or its own await budget runs out. The success condition is binary: a
//! run with zero leftover unhealthy endpoints passed, anything else names
//! the endpoints that never came up.

mod probe;

pub use probe::{HttpProber, ProbeOutcome, ServiceProber};

use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use steward_model::HealthCheck;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::HealthConfig;
use crate::error::{Result, StewardError};
use crate::retry::Retry;

/// Drives a set of [`HealthCheck`]s to a binary healthy/unhealthy verdict.
pub struct HealthChecker {
    prober: Arc<dyn ServiceProber>,
    config: HealthConfig,
}

impl HealthChecker {
    pub fn new(prober: Arc<dyn ServiceProber>, config: HealthConfig) -> Self {
        Self { prober, config }
    }

    /// Checker probing over plain HTTP.
    pub fn http(config: HealthConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpProber::new()?), config))
    }

    /// Probes every check concurrently and returns the URLs that never
    /// became healthy within their own await budget. An empty result means
    /// the environment is up.
    pub async fn find_unavailable(&self, checks: &[HealthCheck]) -> Vec<Url> {
        let waits = checks.iter().map(|check| self.await_healthy(check));
        join_all(waits).await.into_iter().flatten().collect()
    }

    /// Runs the whole check set under the configured retry envelope and
    /// errors when endpoints stay unhealthy through every attempt.
    pub async fn verify(&self, checks: &[HealthCheck]) -> Result<()> {
        if checks.is_empty() {
            return Ok(());
        }
        Retry::after_second(self.config.retry_times)
            .with_countdown("health verification", || async {
                let unavailable = self.find_unavailable(checks).await;
                if unavailable.is_empty() {
                    info!(total = checks.len(), "All health checks passed");
                    Ok(())
                } else {
                    for url in &unavailable {
                        warn!(url = %url, "Endpoint never became healthy");
                    }
                    Err(StewardError::Unhealthy {
                        failed: unavailable.len(),
                        total: checks.len(),
                    })
                }
            })
            .await
    }

    /// Probes until healthy, returning the URL when the budget runs out
    /// first. The budget cancels a probe in flight rather than letting a
    /// straggler overrun the deadline.
    async fn await_healthy(&self, check: &HealthCheck) -> Option<Url> {
        let mut last_reason = None;
        let wait = async {
            loop {
                match self.prober.probe(check).await {
                    ProbeOutcome::Healthy => return,
                    ProbeOutcome::Unhealthy(reason) => {
                        debug!(check = %check, reason = %reason, "Health check not yet passing");
                        last_reason = Some(reason);
                    }
                }
                sleep(self.config.delay()).await;
            }
        };
        if timeout(check.max_await_time(), wait).await.is_ok() {
            debug!(check = %check, "Health check passed");
            None
        } else {
            warn!(
                check = %check,
                reason = last_reason.as_deref().unwrap_or("no probe completed"),
                "Health check budget exhausted"
            );
            Some(check.url.clone())
        }
    }
}

impl fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthChecker")
            .field("prober", &type_name_of_val(self.prober.as_ref()))
            .field("config", &self.config)
            .finish()
    }
}
