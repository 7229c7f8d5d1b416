use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use steward_model::Instance;

use crate::error::{Result, StewardError};
use crate::retry::Retry;

use super::action::ActionEffect;
use super::condition::Condition;

type StepAction = Arc<dyn Fn(Instance) -> BoxFuture<'static, Result<ActionEffect>> + Send + Sync>;
type StepInit = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One provisioning step: a named, versioned action guarded by a condition.
///
/// Steps are declared through [`Step::named`] and run by the provisioner in
/// declaration order.
#[derive(Clone)]
pub struct Step {
    pub id: String,
    pub description: Option<String>,
    /// Stamped into the marker on completion; a different version makes
    /// once-style conditions perform again.
    pub version: String,
    pub condition: Condition,
    /// Keep provisioning the remaining instances and steps after a failure
    /// on one instance.
    pub continue_on_fail: bool,
    /// Let once-style conditions retry a failed run.
    pub rerun_on_fail: bool,
    /// Gate the fleet through a start wait after the step changed anything.
    pub await_up: bool,
    pub action_retry: Retry,
    pub condition_retry: Retry,
    action: Option<StepAction>,
    init: Option<StepInit>,
}

impl Step {
    pub fn named(id: impl Into<String>) -> StepBuilder {
        StepBuilder {
            step: Step {
                id: id.into(),
                description: None,
                version: "default".to_string(),
                condition: Condition::Once,
                continue_on_fail: false,
                rerun_on_fail: true,
                await_up: true,
                action_retry: Retry::after_squared_second(1),
                condition_retry: Retry::after_squared_second(3),
                action: None,
                init: None,
            },
        }
    }

    /// Display label joining id and description.
    pub fn label(&self) -> String {
        match &self.description {
            Some(description) => format!("{} ({description})", self.id),
            None => self.id.clone(),
        }
    }

    /// Declaration errors surface here, before any instance is touched.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(StewardError::Validation(
                "step id must not be blank".to_string(),
            ));
        }
        if self.action.is_none() {
            return Err(StewardError::Validation(format!(
                "step '{}' declares no action",
                self.id
            )));
        }
        Ok(())
    }

    pub(crate) fn has_init(&self) -> bool {
        self.init.is_some()
    }

    pub(crate) async fn run_init(&self) -> Result<()> {
        match &self.init {
            Some(init) => init().await,
            None => Ok(()),
        }
    }

    pub(crate) async fn run_action(&self, instance: &Instance) -> Result<ActionEffect> {
        let Some(action) = &self.action else {
            return Err(StewardError::Validation(format!(
                "step '{}' declares no action",
                self.id
            )));
        };
        self.action_retry
            .with_countdown(&format!("step '{}' action", self.id), || {
                action(instance.clone())
            })
            .await
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("condition", &self.condition)
            .field("continue_on_fail", &self.continue_on_fail)
            .field("rerun_on_fail", &self.rerun_on_fail)
            .field("await_up", &self.await_up)
            .finish_non_exhaustive()
    }
}

/// Fluent construction for [`Step`].
#[derive(Debug)]
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    /// The work performed per instance. The returned effect drives the
    /// await-up gate; report [`ActionEffect::Unchanged`] for no-op runs.
    pub fn action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(Instance) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ActionEffect>> + Send + 'static,
    {
        self.step.action = Some(Arc::new(move |instance| action(instance).boxed()));
        self
    }

    /// One-time preparation before any instance action runs, e.g. resolving
    /// an artifact. Runs only when at least one instance will perform.
    pub fn init<F, Fut>(mut self, init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.step.init = Some(Arc::new(move || init().boxed()));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.step.description = Some(description.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.step.version = version.into();
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.step.condition = condition;
        self
    }

    pub fn continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.step.continue_on_fail = continue_on_fail;
        self
    }

    pub fn rerun_on_fail(mut self, rerun_on_fail: bool) -> Self {
        self.step.rerun_on_fail = rerun_on_fail;
        self
    }

    pub fn await_up(mut self, await_up: bool) -> Self {
        self.step.await_up = await_up;
        self
    }

    pub fn action_retry(mut self, retry: Retry) -> Self {
        self.step.action_retry = retry;
        self
    }

    pub fn condition_retry(mut self, retry: Retry) -> Self {
        self.step.condition_retry = retry;
        self
    }

    pub fn build(self) -> Step {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    fn author() -> Instance {
        Instance::new(
            "local",
            "author",
            Url::parse("http://localhost:4502").expect("static url"),
            "admin",
            "admin",
        )
    }

    #[test]
    fn builder_applies_defaults() {
        let step = Step::named("enable-crxde")
            .action(|_| async { Ok(ActionEffect::Changed) })
            .build();
        assert_eq!(step.version, "default");
        assert!(step.rerun_on_fail);
        assert!(!step.continue_on_fail);
        assert!(step.await_up);
        assert_eq!(step.action_retry, Retry::after_squared_second(1));
        assert_eq!(step.condition_retry, Retry::after_squared_second(3));
        assert!(step.validate().is_ok());
        assert_eq!(step.label(), "enable-crxde");
    }

    #[test]
    fn validation_catches_declaration_errors() {
        let no_action = Step::named("broken").build();
        assert!(matches!(
            no_action.validate(),
            Err(StewardError::Validation(_))
        ));

        let blank = Step::named("  ")
            .action(|_| async { Ok(ActionEffect::Unchanged) })
            .build();
        assert!(blank.validate().is_err());
    }

    #[tokio::test]
    async fn action_retry_reruns_the_closure() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let attempts = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&attempts);
        let step = Step::named("flaky")
            .action_retry(Retry::none())
            .action(move |_| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(ActionEffect::Changed)
                }
            })
            .build();

        let effect = step.run_action(&author()).await.expect("runs");
        assert_eq!(effect, ActionEffect::Changed);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn label_includes_the_description() {
        let step = Step::named("deploy-core")
            .description("Deploys the core bundle")
            .action(|_| async { Ok(ActionEffect::Changed) })
            .build();
        assert_eq!(step.label(), "deploy-core (Deploys the core bundle)");
    }
}
