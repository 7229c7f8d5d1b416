//! Conditional, versioned provisioning steps performed across a fleet.
//!
//! Steps are defined once and bound per instance. Markers persisted through
//! the instance sync record what already ran, so a step performs only where
//! its condition says so. After a step changes something, the provisioner
//! holds the run until the affected instances settle again.

mod action;
mod condition;
mod deploy;
mod gate;
mod instance_step;
mod step;

use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use steward_model::Instance;
use tracing::{info, warn};

pub use action::{Action, ActionEffect, ActionStatus};
pub use condition::{Condition, ConditionInput};
pub use deploy::deploy_artifact;
pub use gate::{AwaitGate, RunnerGate};
pub use step::{Step, StepBuilder};

use crate::cache::InvocationCache;
use crate::config::{AwaitUpConfig, ProvisionConfig};
use crate::error::{Result, StewardError};
use crate::patterns::wildcard;
use crate::sync::InstanceSync;

use instance_step::InstanceStep;

/// Runs defined steps across a fleet, one step at a time.
///
/// Each step binds to every instance concurrently, runs its one-off init
/// when at least one instance will perform, performs everywhere the
/// condition allows, and finally gates on fleet stability when the step
/// changed something on an instance it wants settled.
pub struct Provisioner {
    sync: InstanceSync,
    config: ProvisionConfig,
    gate: Arc<dyn AwaitGate>,
    cache: Arc<InvocationCache>,
    steps: Vec<Step>,
}

impl Provisioner {
    pub fn new(sync: InstanceSync, config: ProvisionConfig, gate: Arc<dyn AwaitGate>) -> Self {
        Self {
            sync,
            config,
            gate,
            cache: Arc::new(InvocationCache::new()),
            steps: Vec::new(),
        }
    }

    /// Convenience constructor gating through the regular start wait.
    pub fn with_runner_gate(
        sync: InstanceSync,
        config: ProvisionConfig,
        await_up: AwaitUpConfig,
    ) -> Self {
        let gate = Arc::new(RunnerGate::new(sync.clone(), await_up));
        Self::new(sync, config, gate)
    }

    /// Appends a step. Steps run in definition order.
    pub fn define(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Cache shared with step closures, cleared at the start of each run.
    pub fn cache(&self) -> Arc<InvocationCache> {
        Arc::clone(&self.cache)
    }

    /// Performs every defined step matching the configured filter on the
    /// given instances and returns one action per step and instance.
    pub async fn provision(&self, instances: &[Instance]) -> Result<Vec<Action>> {
        if !self.config.enabled {
            info!("Provisioning disabled, skipping");
            return Ok(Vec::new());
        }
        self.cache.clear();

        let selected: Vec<&Step> = self
            .steps
            .iter()
            .filter(|step| wildcard(&step.id, &self.config.step_name))
            .collect();
        if selected.is_empty() {
            info!(filter = %self.config.step_name, "No steps match the step filter");
            return Ok(Vec::new());
        }
        // Surface definition mistakes before any marker is touched.
        for step in &selected {
            step.validate()?;
        }

        let mut actions = Vec::new();
        for step in selected {
            actions.extend(self.perform_step(step, instances).await?);
        }
        let performed = actions.iter().filter(|action| action.performed()).count();
        info!(total = actions.len(), performed, "Provisioning finished");
        Ok(actions)
    }

    async fn perform_step(&self, step: &Step, instances: &[Instance]) -> Result<Vec<Action>> {
        let binds = join_all(instances.iter().map(|instance| {
            InstanceStep::bind(
                step,
                instance,
                &self.sync,
                self.config.greedy,
                self.config.countable,
            )
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        if step.has_init() && binds.iter().any(InstanceStep::performable) {
            info!(step = %step.label(), "Running step init");
            if let Err(error) = step.run_init().await {
                warn!(step = %step.label(), error = %error, "Step init failed");
                return Err(error);
            }
        }

        let actions = join_all(binds.iter().map(InstanceStep::perform))
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let ended: Vec<Instance> = actions
            .iter()
            .zip(instances)
            .filter(|(action, _)| action.performed())
            .map(|(_, instance)| instance.clone())
            .collect();
        let changed = actions.iter().any(Action::changed);

        if step.await_up && changed && !ended.is_empty() {
            info!(
                step = %step.label(),
                instances = ended.len(),
                "Awaiting stability after step"
            );
            let outcome = self.gate.await_up(&ended).await?;
            if !outcome.stable() {
                let unstable = outcome
                    .unstable_ids()
                    .into_iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(StewardError::Aborted(format!(
                    "instances unstable after step '{}': {unstable}",
                    step.id
                )));
            }
        } else if !actions.is_empty() && actions.iter().all(|action| !action.performed()) {
            info!(step = %step.label(), "Nothing to perform, all instances up to date");
        }
        Ok(actions)
    }
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("config", &self.config)
            .field("gate", &type_name_of_val(self.gate.as_ref()))
            .field(
                "steps",
                &self.steps.iter().map(|step| step.id.as_str()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
