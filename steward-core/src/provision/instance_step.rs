use chrono::Utc;
use steward_model::Instance;
use tracing::{debug, info, warn};

use crate::error::{Result, StewardError};
use crate::sync::{InstanceSync, StepRecord};

use super::action::Action;
use super::condition::ConditionInput;
use super::step::Step;

/// One step bound to one instance for a single provisioning run.
///
/// Binding reads the marker and freezes the performability decision;
/// [`InstanceStep::perform`] then runs the lifecycle: started marker,
/// action with retry, ended marker with version and failure flag.
pub(crate) struct InstanceStep<'a> {
    step: &'a Step,
    instance: &'a Instance,
    sync: &'a InstanceSync,
    countable: bool,
    record: Option<StepRecord>,
    performable: bool,
}

impl<'a> InstanceStep<'a> {
    pub(crate) async fn bind(
        step: &'a Step,
        instance: &'a Instance,
        sync: &'a InstanceSync,
        greedy: bool,
        countable: bool,
    ) -> Result<Self> {
        let label = format!("step '{}' marker read on {}", step.id, instance.id());
        let record = step
            .condition_retry
            .with_countdown(&label, || sync.markers.read(instance, &step.id))
            .await?;
        let input = ConditionInput {
            instance,
            record: record.as_ref(),
            version: &step.version,
            rerun_on_fail: step.rerun_on_fail,
            greedy,
            countable,
            now: Utc::now(),
        };
        let performable = step.condition.evaluate(&input);
        Ok(Self {
            step,
            instance,
            sync,
            countable,
            record,
            performable,
        })
    }

    pub(crate) fn performable(&self) -> bool {
        self.performable
    }

    pub(crate) async fn perform(&self) -> Result<Action> {
        if !self.performable {
            if self.countable {
                let mut record = self.record.clone().unwrap_or_default();
                record.counter += 1;
                self.sync
                    .markers
                    .save(self.instance, &self.step.id, &record)
                    .await?;
            }
            debug!(step = %self.step.id, instance = %self.instance.id(), "Step skipped");
            return Ok(Action::skipped(&self.step.id, self.instance.id()));
        }

        let mut record = self.record.clone().unwrap_or_default();
        record.started_at = Some(Utc::now());
        record.ended_at = None;
        if self.countable {
            record.counter += 1;
        }
        self.sync
            .markers
            .save(self.instance, &self.step.id, &record)
            .await?;

        info!(step = %self.step.id, instance = %self.instance.id(), "Performing step");
        let started = tokio::time::Instant::now();
        let outcome = self.step.run_action(self.instance).await;
        let duration = started.elapsed();

        record.ended_at = Some(Utc::now());
        record.version = Some(self.step.version.clone());
        match outcome {
            Ok(effect) => {
                record.failed = false;
                self.sync
                    .markers
                    .save(self.instance, &self.step.id, &record)
                    .await?;
                info!(
                    step = %self.step.id,
                    instance = %self.instance.id(),
                    duration_ms = duration.as_millis() as u64,
                    "Step ended"
                );
                Ok(Action::ended(
                    &self.step.id,
                    self.instance.id(),
                    effect,
                    duration,
                ))
            }
            Err(error) => {
                record.failed = true;
                self.sync
                    .markers
                    .save(self.instance, &self.step.id, &record)
                    .await?;
                if self.step.continue_on_fail {
                    warn!(
                        step = %self.step.id,
                        instance = %self.instance.id(),
                        error = %error,
                        "Step failed, continuing"
                    );
                    Ok(Action::failed(
                        &self.step.id,
                        self.instance.id(),
                        error.to_string(),
                        duration,
                    ))
                } else {
                    Err(StewardError::Step {
                        step: self.step.id.clone(),
                        instance: self.instance.id(),
                        reason: error.to_string(),
                    })
                }
            }
        }
    }
}
