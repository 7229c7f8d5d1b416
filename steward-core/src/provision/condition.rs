//! Performability rules for provisioning steps.
//!
//! Conditions are pure: everything they consult is pre-fetched into a
//! [`ConditionInput`], so evaluation never touches the network and can be
//! retried, logged, and tested without side effects.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use steward_model::Instance;

use crate::patterns;
use crate::sync::StepRecord;

/// Everything a condition may consult for one (step, instance) pair.
#[derive(Debug, Clone, Copy)]
pub struct ConditionInput<'a> {
    pub instance: &'a Instance,
    /// Marker left by previous runs, `None` on the first encounter.
    pub record: Option<&'a StepRecord>,
    /// Version the step would stamp if performed now.
    pub version: &'a str,
    /// Step-level flag allowing a rerun after a failed attempt.
    pub rerun_on_fail: bool,
    /// Run-level override forcing state-based conditions to perform.
    pub greedy: bool,
    /// Whether run counting is enabled for this provisioning setup.
    pub countable: bool,
    pub now: DateTime<Utc>,
}

impl ConditionInput<'_> {
    /// Never completed, interrupted mid-run, or stamped with a different
    /// version than the step would write now.
    fn ultimate_once(&self) -> bool {
        match self.record {
            None => true,
            Some(record) => {
                !record.ended() || record.version.as_deref() != Some(self.version)
            }
        }
    }

    /// The previous run completed but failed, and the step allows reruns.
    fn failed_rerun(&self) -> bool {
        self.rerun_on_fail
            && self
                .record
                .map(|record| record.ended() && record.failed)
                .unwrap_or(false)
    }

    fn ended_longer_ago_than(&self, age: Duration) -> bool {
        let Some(ended_at) = self.record.and_then(|record| record.ended_at) else {
            return false;
        };
        (self.now - ended_at).num_milliseconds() >= age.as_millis() as i64
    }

    fn runs_so_far(&self) -> u64 {
        self.record.map(|record| record.counter).unwrap_or(0)
    }
}

/// When a step performs on an instance.
#[derive(Clone, Default)]
pub enum Condition {
    /// Perform on every provisioning run.
    Always,
    Never,
    /// Perform until completed once with the current version; failed runs
    /// count as incomplete when the step allows reruns. The usual choice.
    #[default]
    Once,
    /// Like [`Condition::Once`] but a failed run still counts as done.
    UltimateOnce,
    /// Perform again once the previous completion is older than the given
    /// age, and always while never completed.
    RepeatAfter(Duration),
    /// Perform on every n-th run. Requires countable provisioning, because
    /// only counted runs advance.
    RepeatEvery(u64),
    /// Instance environment matches the wildcard pattern.
    EnvMatches(String),
    /// Instance full name matches the wildcard pattern.
    OnInstance(String),
    /// Every inner condition holds.
    All(Vec<Condition>),
    /// Arbitrary predicate over the input.
    Custom(Arc<dyn Fn(&ConditionInput<'_>) -> bool + Send + Sync>),
}

impl Condition {
    /// Restricts this condition to author instances.
    pub fn on_author(self) -> Condition {
        Condition::All(vec![Condition::OnInstance("*-author*".to_string()), self])
    }

    /// Restricts this condition to publish instances.
    pub fn on_publish(self) -> Condition {
        Condition::All(vec![Condition::OnInstance("*-publish*".to_string()), self])
    }

    pub fn evaluate(&self, input: &ConditionInput<'_>) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::Once => {
                input.greedy || input.ultimate_once() || input.failed_rerun()
            }
            Condition::UltimateOnce => input.greedy || input.ultimate_once(),
            Condition::RepeatAfter(age) => {
                input.greedy || input.ultimate_once() || input.ended_longer_ago_than(*age)
            }
            Condition::RepeatEvery(every) => {
                input.countable && *every > 0 && input.runs_so_far() % every == 0
            }
            Condition::EnvMatches(pattern) => patterns::wildcard(&input.instance.env, pattern),
            Condition::OnInstance(pattern) => {
                patterns::wildcard(&input.instance.full_name(), pattern)
            }
            Condition::All(conditions) => {
                conditions.iter().all(|condition| condition.evaluate(input))
            }
            Condition::Custom(predicate) => predicate(input),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => f.write_str("Always"),
            Condition::Never => f.write_str("Never"),
            Condition::Once => f.write_str("Once"),
            Condition::UltimateOnce => f.write_str("UltimateOnce"),
            Condition::RepeatAfter(age) => f.debug_tuple("RepeatAfter").field(age).finish(),
            Condition::RepeatEvery(every) => f.debug_tuple("RepeatEvery").field(every).finish(),
            Condition::EnvMatches(pattern) => f.debug_tuple("EnvMatches").field(pattern).finish(),
            Condition::OnInstance(pattern) => f.debug_tuple("OnInstance").field(pattern).finish(),
            Condition::All(conditions) => f.debug_tuple("All").field(conditions).finish(),
            Condition::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
