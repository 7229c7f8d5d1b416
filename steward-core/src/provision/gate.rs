use async_trait::async_trait;
use steward_model::Instance;

use crate::check::{self, FleetOutcome};
use crate::config::AwaitUpConfig;
use crate::error::Result;
use crate::sync::InstanceSync;

/// Stability gate run between provisioning steps.
///
/// A seam over [`check::await_up`] so tests can count and script gate
/// invocations without polling anything.
#[async_trait]
pub trait AwaitGate: Send + Sync {
    async fn await_up(&self, instances: &[Instance]) -> Result<FleetOutcome>;
}

/// Production gate backed by the check runner.
#[derive(Debug, Clone)]
pub struct RunnerGate {
    sync: InstanceSync,
    config: AwaitUpConfig,
}

impl RunnerGate {
    pub fn new(sync: InstanceSync, config: AwaitUpConfig) -> Self {
        Self { sync, config }
    }
}

#[async_trait]
impl AwaitGate for RunnerGate {
    async fn await_up(&self, instances: &[Instance]) -> Result<FleetOutcome> {
        check::await_up(&self.sync, &self.config, instances).await
    }
}
