use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use steward_model::{Instance, InstanceId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, StewardError, TimeoutCeiling};
use crate::sync::InstanceSync;

use super::group::CheckGroup;
use super::progress::CheckProgress;
use super::CheckContext;

/// Terminal status of one instance's wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Every check passed and the quiet period elapsed.
    Stable,
    /// A time ceiling aborted the wait.
    TimedOut(TimeoutCeiling),
    /// A check aborted the wait with a non-timeout error.
    Failed,
    /// The wait was cancelled from outside before the instance settled.
    Cancelled,
}

/// How one instance's wait ended.
#[derive(Debug, Clone)]
pub struct InstanceOutcome {
    pub status: OutcomeStatus,
    /// Last summary line, e.g. the passing state or the abort reason.
    pub summary: String,
    pub rounds: u64,
    pub state_changes: u64,
}

impl InstanceOutcome {
    pub fn is_stable(&self) -> bool {
        self.status == OutcomeStatus::Stable
    }
}

/// Result of a fleet-wide wait, one entry per instance.
#[derive(Debug, Clone, Default)]
pub struct FleetOutcome {
    pub instances: BTreeMap<InstanceId, InstanceOutcome>,
}

impl FleetOutcome {
    /// True when every instance settled. An empty fleet is trivially stable.
    pub fn stable(&self) -> bool {
        self.instances.values().all(InstanceOutcome::is_stable)
    }

    /// Instances that did not settle, in id order.
    pub fn unstable_ids(&self) -> Vec<&InstanceId> {
        self.instances
            .iter()
            .filter(|(_, outcome)| !outcome.is_stable())
            .map(|(id, _)| id)
            .collect()
    }
}

struct InstanceWait {
    instance: Instance,
    progress: CheckProgress,
    outcome: Option<InstanceOutcome>,
}

impl InstanceWait {
    fn terminal(&mut self, status: OutcomeStatus, summary: String) {
        self.outcome = Some(InstanceOutcome {
            status,
            summary,
            rounds: self.progress.rounds(),
            state_changes: self.progress.state_changes(),
        });
    }
}

/// Drives one [`CheckGroup`] over a fleet until every instance reaches a
/// terminal outcome.
///
/// Rounds are a barrier: all live instances are checked concurrently, the
/// results are folded into per-instance progress, then the runner sleeps
/// `delay` before the next round. Instances that settle or abort early stop
/// being polled while the rest continue.
#[derive(Debug)]
pub struct CheckRunner {
    sync: InstanceSync,
    group: CheckGroup,
    delay: Duration,
    verbose: bool,
    cancel: CancellationToken,
}

impl CheckRunner {
    pub fn new(sync: InstanceSync, group: CheckGroup, delay: Duration, verbose: bool) -> Self {
        Self {
            sync,
            group,
            delay,
            verbose,
            cancel: CancellationToken::new(),
        }
    }

    /// Ties the wait to an outer shutdown signal.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, instances: &[Instance]) -> Result<FleetOutcome> {
        let mut waits: Vec<InstanceWait> = instances
            .iter()
            .map(|instance| InstanceWait {
                instance: instance.clone(),
                progress: CheckProgress::new(),
                outcome: None,
            })
            .collect();
        let started = tokio::time::Instant::now();

        while waits.iter().any(|wait| wait.outcome.is_none()) {
            if self.cancel.is_cancelled() {
                for wait in waits.iter_mut().filter(|wait| wait.outcome.is_none()) {
                    info!(instance = %wait.instance.id(), "Wait cancelled");
                    wait.terminal(OutcomeStatus::Cancelled, "wait cancelled".to_string());
                }
                break;
            }

            let elapsed = started.elapsed();
            let rounds = join_all(waits.iter().map(|wait| async move {
                match &wait.outcome {
                    Some(_) => None,
                    None => {
                        let ctx = CheckContext {
                            instance: &wait.instance,
                            sync: &self.sync,
                            progress: &wait.progress,
                            elapsed,
                        };
                        Some(self.group.run_round(&ctx).await)
                    }
                }
            }))
            .await;

            for (wait, round) in waits.iter_mut().zip(rounds) {
                let Some(outcome) = round else { continue };
                let changed = wait.progress.observe(&outcome);
                if changed {
                    info!(
                        instance = %wait.instance.id(),
                        summary = %outcome.summary(),
                        "Instance state changed"
                    );
                }
                if self.verbose {
                    for issue in outcome.issues() {
                        debug!(instance = %wait.instance.id(), %issue, "Check issue");
                    }
                }

                match outcome.fatal {
                    Some(error) => {
                        let status = match &error {
                            StewardError::Timeout { ceiling, .. } => {
                                OutcomeStatus::TimedOut(*ceiling)
                            }
                            _ => OutcomeStatus::Failed,
                        };
                        warn!(instance = %wait.instance.id(), error = %error, "Wait aborted");
                        wait.terminal(status, error.to_string());
                    }
                    // A round that observes a state change cannot conclude
                    // the wait: the quiet period restarts from this round.
                    None if outcome.done() && !changed => {
                        info!(
                            instance = %wait.instance.id(),
                            rounds = wait.progress.rounds(),
                            "Instance settled"
                        );
                        wait.terminal(OutcomeStatus::Stable, outcome.summary());
                    }
                    None => {}
                }
            }

            if waits.iter().all(|wait| wait.outcome.is_some()) {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        let instances = waits
            .into_iter()
            .map(|wait| {
                let id = wait.instance.id();
                let rounds = wait.progress.rounds();
                let state_changes = wait.progress.state_changes();
                let outcome = wait.outcome.unwrap_or_else(|| InstanceOutcome {
                    status: OutcomeStatus::Cancelled,
                    summary: "wait interrupted".to_string(),
                    rounds,
                    state_changes,
                });
                (id, outcome)
            })
            .collect();
        Ok(FleetOutcome { instances })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use steward_model::ProcessStatus;

    use super::super::testing::{instance, sync_with, unstable_bundles, ScriptedReader};
    use super::super::{BundlesCheck, TimeoutCheck, UnavailableCheck, UnchangedCheck};
    use super::*;

    fn settle_group(quiet: Duration) -> CheckGroup {
        CheckGroup::new(vec![
            Box::new(UnavailableCheck),
            Box::new(BundlesCheck::default()),
            Box::new(UnchangedCheck::new(quiet)),
        ])
    }

    fn ceiling_group(unavailable: Duration, state: Duration, quiet: Duration) -> CheckGroup {
        CheckGroup::new(vec![
            Box::new(TimeoutCheck {
                unavailable_time: Some(unavailable),
                state_time: state,
                constant_time: Duration::from_secs(3600),
            }),
            Box::new(UnavailableCheck),
            Box::new(BundlesCheck::default()),
            Box::new(UnchangedCheck::new(quiet)),
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn fleet_settles_after_the_quiet_period() {
        let sync = sync_with(Arc::new(ScriptedReader::healthy()), ProcessStatus::Running);
        let runner = CheckRunner::new(
            sync,
            settle_group(Duration::from_secs(1)),
            Duration::from_millis(500),
            false,
        );
        let fleet = runner.run(&[instance("author")]).await.expect("runs");

        assert!(fleet.stable());
        let outcome = &fleet.instances[&instance("author").id()];
        assert_eq!(outcome.status, OutcomeStatus::Stable);
        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.summary, "All checks passed");
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_ceiling_aborts_the_wait() {
        let sync = sync_with(
            Arc::new(ScriptedReader::unreachable()),
            ProcessStatus::Starting,
        );
        let runner = CheckRunner::new(
            sync,
            ceiling_group(
                Duration::from_secs(2),
                Duration::from_secs(600),
                Duration::from_secs(3),
            ),
            Duration::from_millis(500),
            false,
        );
        let fleet = runner.run(&[instance("author")]).await.expect("runs");

        assert!(!fleet.stable());
        let outcome = &fleet.instances[&instance("author").id()];
        assert_eq!(
            outcome.status,
            OutcomeStatus::TimedOut(TimeoutCeiling::Unavailable)
        );
        assert_eq!(outcome.rounds, 5);
        assert!(outcome.summary.contains("unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn state_ceiling_aborts_a_wedged_instance() {
        let sync = sync_with(Arc::new(ScriptedReader::healthy()), ProcessStatus::Running);
        // The quiet period exceeds the state ceiling, so the group can never
        // finish and the ceiling must fire.
        let runner = CheckRunner::new(
            sync,
            ceiling_group(
                Duration::from_secs(60),
                Duration::from_secs(2),
                Duration::from_secs(10),
            ),
            Duration::from_millis(500),
            false,
        );
        let fleet = runner.run(&[instance("author")]).await.expect("runs");

        let outcome = &fleet.instances[&instance("author").id()];
        assert_eq!(
            outcome.status,
            OutcomeStatus::TimedOut(TimeoutCeiling::StateUnchanged)
        );
        assert_eq!(outcome.rounds, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn one_unreachable_instance_spoils_fleet_stability() {
        let author = instance("author");
        let publish = instance("publish");
        let reader = ScriptedReader::healthy();
        reader.mark_unreachable(&publish);
        let sync = sync_with(Arc::new(reader), ProcessStatus::Starting);
        let runner = CheckRunner::new(
            sync,
            ceiling_group(
                Duration::from_secs(1),
                Duration::from_secs(600),
                Duration::from_secs(1),
            ),
            Duration::from_millis(500),
            false,
        );
        let fleet = runner
            .run(&[author.clone(), publish.clone()])
            .await
            .expect("runs");

        assert!(!fleet.stable());
        assert_eq!(fleet.instances[&author.id()].status, OutcomeStatus::Stable);
        assert_eq!(
            fleet.instances[&publish.id()].status,
            OutcomeStatus::TimedOut(TimeoutCeiling::Unavailable)
        );
        assert_eq!(fleet.unstable_ids(), vec![&publish.id()]);
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_recovery_counts_one_state_change() {
        let author = instance("author");
        let reader = ScriptedReader::healthy();
        reader.script(
            &author,
            vec![
                unstable_bundles("org.example.slow"),
                unstable_bundles("org.example.slow"),
            ],
        );
        let sync = sync_with(Arc::new(reader), ProcessStatus::Running);
        // No unavailability check here: each bundle read consumes one
        // scripted snapshot, so only one check may read bundles per round.
        let group = CheckGroup::new(vec![
            Box::new(BundlesCheck::default()),
            Box::new(UnchangedCheck::new(Duration::from_secs(1))),
        ]);
        let runner = CheckRunner::new(sync, group, Duration::from_millis(500), false);
        let fleet = runner.run(&[author.clone()]).await.expect("runs");

        let outcome = &fleet.instances[&author.id()];
        assert_eq!(outcome.status, OutcomeStatus::Stable);
        assert_eq!(outcome.state_changes, 1);
        assert_eq!(outcome.rounds, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_yields_cancelled_outcomes() {
        let sync = sync_with(Arc::new(ScriptedReader::healthy()), ProcessStatus::Running);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = CheckRunner::new(
            sync,
            settle_group(Duration::from_secs(1)),
            Duration::from_millis(500),
            false,
        )
        .with_cancellation(cancel);
        let fleet = runner.run(&[instance("author")]).await.expect("runs");

        let outcome = &fleet.instances[&instance("author").id()];
        assert_eq!(outcome.status, OutcomeStatus::Cancelled);
        assert_eq!(outcome.rounds, 0);
        assert!(!fleet.stable());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_running_wait() {
        let sync = sync_with(
            Arc::new(ScriptedReader::unreachable()),
            ProcessStatus::Starting,
        );
        let cancel = CancellationToken::new();
        let runner = CheckRunner::new(
            sync,
            settle_group(Duration::from_secs(3600)),
            Duration::from_millis(500),
            false,
        )
        .with_cancellation(cancel.clone());

        let wait = tokio::spawn(async move { runner.run(&[instance("author")]).await });
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            cancel.cancel();
        });
        let fleet = wait.await.expect("join").expect("runs");

        let outcome = &fleet.instances[&instance("author").id()];
        assert_eq!(outcome.status, OutcomeStatus::Cancelled);
        assert_eq!(outcome.rounds, 3);
    }

    #[tokio::test]
    async fn empty_fleet_is_trivially_stable() {
        let sync = sync_with(Arc::new(ScriptedReader::healthy()), ProcessStatus::Running);
        let runner = CheckRunner::new(
            sync,
            settle_group(Duration::from_secs(1)),
            Duration::from_millis(500),
            false,
        );
        let fleet = runner.run(&[]).await.expect("runs");
        assert!(fleet.stable());
        assert!(fleet.instances.is_empty());
    }
}
