use std::fmt;
use std::time::Duration;

use steward_model::InstanceId;

/// Whether a performed action changed the remote instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionEffect {
    Changed,
    Unchanged,
}

/// How one step ended on one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// The action ran to completion.
    Ended,
    /// The condition was not met, nothing ran.
    Skipped,
    /// The action failed but the step allowed the run to continue.
    Failed,
}

/// Record of one step's outcome on one instance.
#[derive(Debug, Clone)]
pub struct Action {
    pub step_id: String,
    pub instance: InstanceId,
    pub status: ActionStatus,
    pub effect: Option<ActionEffect>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl Action {
    pub fn ended(
        step_id: impl Into<String>,
        instance: InstanceId,
        effect: ActionEffect,
        duration: Duration,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            instance,
            status: ActionStatus::Ended,
            effect: Some(effect),
            error: None,
            duration,
        }
    }

    pub fn skipped(step_id: impl Into<String>, instance: InstanceId) -> Self {
        Self {
            step_id: step_id.into(),
            instance,
            status: ActionStatus::Skipped,
            effect: None,
            error: None,
            duration: Duration::ZERO,
        }
    }

    pub fn failed(
        step_id: impl Into<String>,
        instance: InstanceId,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            instance,
            status: ActionStatus::Failed,
            effect: None,
            error: Some(error.into()),
            duration,
        }
    }

    pub fn performed(&self) -> bool {
        self.status == ActionStatus::Ended
    }

    pub fn changed(&self) -> bool {
        self.effect == Some(ActionEffect::Changed)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step '{}' on '{}': ", self.step_id, self.instance)?;
        match self.status {
            ActionStatus::Ended => {
                let effect = match self.effect {
                    Some(ActionEffect::Changed) => "changed",
                    _ => "unchanged",
                };
                write!(f, "ended ({effect}) in {}ms", self.duration.as_millis())
            }
            ActionStatus::Skipped => f.write_str("skipped"),
            ActionStatus::Failed => write!(
                f,
                "failed in {}ms: {}",
                self.duration.as_millis(),
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
