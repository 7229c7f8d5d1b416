use steward_model::Instance;
use tokio_util::sync::CancellationToken;

use crate::config::AwaitUpConfig;
use crate::error::Result;
use crate::sync::InstanceSync;

use super::{
    BundlesCheck, CheckGroup, CheckRunner, ComponentsCheck, EventsCheck, FleetOutcome,
    InstallerCheck, TimeoutCheck, UnavailableCheck, UnchangedCheck,
};

/// Start wait: polls the fleet until every instance reports a settled
/// console or a ceiling fires.
#[derive(Debug)]
pub struct AwaitUp {
    runner: CheckRunner,
}

impl AwaitUp {
    pub fn new(sync: InstanceSync, config: &AwaitUpConfig) -> Self {
        let group = CheckGroup::new(vec![
            Box::new(TimeoutCheck {
                unavailable_time: Some(config.unavailable_time()),
                state_time: config.state_time(),
                constant_time: config.constant_time(),
            }),
            Box::new(UnavailableCheck),
            Box::new(BundlesCheck::new(config.bundle_symbolic_names_ignored.clone())),
            Box::new(EventsCheck::new(
                config.event_unstable_topics.clone(),
                config.event_unstable_age(),
                config.event_ignored_details.clone(),
            )),
            Box::new(InstallerCheck),
            Box::new(ComponentsCheck::new(
                config.platform_components.clone(),
                config.specific_components.clone(),
            )),
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

/// Waits until every instance is up and settled.
pub async fn await_up(
    sync: &InstanceSync,
    config: &AwaitUpConfig,
    instances: &[Instance],
) -> Result<FleetOutcome> {
    AwaitUp::new(sync.clone(), config).run(instances).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use steward_model::ProcessStatus;

    use super::super::testing::{instance, sync_with, ScriptedReader};
    use super::super::OutcomeStatus;
    use super::*;

    fn fast_config() -> AwaitUpConfig {
        AwaitUpConfig {
            delay_ms: 100,
            unchanged_await_time_ms: 200,
            unavailable_time_ms: 1_000,
            ..AwaitUpConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_fleet_settles_with_default_check_list() {
        let sync = sync_with(Arc::new(ScriptedReader::healthy()), ProcessStatus::Running);
        let fleet = await_up(&sync, &fast_config(), &[instance("author"), instance("publish")])
            .await
            .expect("runs");
        assert!(fleet.stable());
        assert_eq!(fleet.instances.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dark_fleet_times_out_unavailable() {
        let sync = sync_with(
            Arc::new(ScriptedReader::unreachable()),
            ProcessStatus::Starting,
        );
        let fleet = await_up(&sync, &fast_config(), &[instance("author")])
            .await
            .expect("runs");
        assert!(!fleet.stable());
        let outcome = &fleet.instances[&instance("author").id()];
        assert!(matches!(outcome.status, OutcomeStatus::TimedOut(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_propagates_through_the_wrapper() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let sync = sync_with(Arc::new(ScriptedReader::healthy()), ProcessStatus::Running);
        let wait = AwaitUp::new(sync, &fast_config()).with_cancellation(cancel);
        let fleet = wait.run(&[instance("author")]).await.expect("runs");
        assert_eq!(
            fleet.instances[&instance("author").id()].status,
            OutcomeStatus::Cancelled
        );
    }

    #[tokio::test(start_paused = true)]
    async fn default_quiet_period_arithmetic_holds() {
        let sync = sync_with(Arc::new(ScriptedReader::healthy()), ProcessStatus::Running);
        let config = AwaitUpConfig {
            delay_ms: 500,
            unchanged_await_time_ms: 3_000,
            ..AwaitUpConfig::default()
        };
        let started = tokio::time::Instant::now();
        let fleet = await_up(&sync, &config, &[instance("author")])
            .await
            .expect("runs");
        assert!(fleet.stable());
        // Quiet period of 3s at a 500ms cadence: rounds at 0ms..3000ms.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(fleet.instances[&instance("author").id()].rounds, 7);
    }
}
