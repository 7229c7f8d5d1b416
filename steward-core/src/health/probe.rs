use async_trait::async_trait;
use reqwest::Method;
use steward_model::HealthCheck;

use crate::error::Result;

/// One probe attempt's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    /// Not healthy yet, with the observed reason.
    Unhealthy(String),
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

/// Performs a single attempt against one health check endpoint.
///
/// Transport failures are ordinary unhealthy outcomes, not errors: probes
/// run against instances that may be mid-restart, where a refused
/// connection is the expected starting state.
#[async_trait]
pub trait ServiceProber: Send + Sync {
    async fn probe(&self, check: &HealthCheck) -> ProbeOutcome;
}

/// Prober issuing plain HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ServiceProber for HttpProber {
    async fn probe(&self, check: &HealthCheck) -> ProbeOutcome {
        let method =
            Method::from_bytes(check.method.to_ascii_uppercase().as_bytes()).unwrap_or(Method::GET);
        let response = match self
            .client
            .request(method, check.url.clone())
            .timeout(check.connection_timeout())
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return ProbeOutcome::Unhealthy(format!("request failed: {error}")),
        };

        let status = response.status().as_u16();
        if status != check.status {
            return ProbeOutcome::Unhealthy(format!("status {status}, expected {}", check.status));
        }
        if let Some(text) = &check.text {
            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => return ProbeOutcome::Unhealthy(format!("body read failed: {error}")),
            };
            if !body.contains(text) {
                return ProbeOutcome::Unhealthy(format!("response does not contain '{text}'"));
            }
        }
        ProbeOutcome::Healthy
    }
}
