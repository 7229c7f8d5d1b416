use steward_model::Instance;
use tokio_util::sync::CancellationToken;

use crate::config::AwaitDownConfig;
use crate::error::Result;
use crate::sync::InstanceSync;

use super::{AvailableCheck, CheckGroup, CheckRunner, FleetOutcome, TimeoutCheck, UnchangedCheck};

/// Stop wait: polls the fleet until every console has gone silent and the
/// backing processes are at rest.
#[derive(Debug)]
pub struct AwaitDown {
    runner: CheckRunner,
}

impl AwaitDown {
    pub fn new(sync: InstanceSync, config: &AwaitDownConfig) -> Self {
        // No unavailability ceiling here: unreachable is the goal.
        let group = CheckGroup::new(vec![
            Box::new(TimeoutCheck {
                unavailable_time: None,
                state_time: config.state_time(),
                constant_time: config.constant_time(),
            }),
            Box::new(AvailableCheck::new(config.utilisation_time())),
            Box::new(UnchangedCheck::new(config.unchanged_await_time())),
        ]);
        Self {
            runner: CheckRunner::new(sync, group, config.delay(), config.verbose),
        }
    }

    /// Ties the wait to an outer shutdown signal.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.runner = self.runner.with_cancellation(cancel);
        self
    }

    pub async fn run(&self, instances: &[Instance]) -> Result<FleetOutcome> {
        self.runner.run(instances).await
    }
}

/// Waits until every instance has shut down.
pub async fn await_down(
    sync: &InstanceSync,
    config: &AwaitDownConfig,
    instances: &[Instance],
) -> Result<FleetOutcome> {
    AwaitDown::new(sync.clone(), config).run(instances).await
}
