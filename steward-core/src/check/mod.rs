//! Availability checking for fleets of remote instances.
//!
//! A wait is a sequence of poll rounds. Each round evaluates every check of
//! a [`CheckGroup`] against fresh console state; the [`CheckRunner`] folds
//! round results into per-instance progress and decides whether the fleet
//! is stable, still settling, or out of time. A check reports failure as a
//! value; returning an error is reserved for conditions that abort the
//! whole wait, such as an elapsed-time ceiling.

mod await_down;
mod await_up;
mod bundles;
mod components;
mod down;
mod events;
mod group;
mod installer;
mod progress;
mod runner;
mod timeout;
mod unavailable;
mod unchanged;

#[cfg(test)]
pub(crate) mod testing;

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use steward_model::Instance;

pub use await_down::{AwaitDown, await_down};
pub use await_up::{AwaitUp, await_up};
pub use bundles::BundlesCheck;
pub use components::ComponentsCheck;
pub use down::AvailableCheck;
pub use events::EventsCheck;
pub use group::{CheckGroup, GroupOutcome};
pub use installer::InstallerCheck;
pub use progress::CheckProgress;
pub use runner::{CheckRunner, FleetOutcome, InstanceOutcome, OutcomeStatus};
pub use timeout::TimeoutCheck;
pub use unavailable::UnavailableCheck;
pub use unchanged::UnchangedCheck;

use crate::error::Result;
use crate::sync::InstanceSync;

/// Everything a check may consult during one round.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub instance: &'a Instance,
    pub sync: &'a InstanceSync,
    /// Round-over-round memory for this instance's wait.
    pub progress: &'a CheckProgress,
    /// Time the whole wait has been running.
    pub elapsed: Duration,
}

/// What a single check observed during one round.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Check that produced the report.
    pub name: &'static str,
    /// Human-oriented summary, e.g. `Bundles stable (94%)`.
    pub summary: String,
    /// Problems preventing the check from passing; empty means passed.
    pub issues: Vec<String>,
    /// Digest of the observed remote state, folded into change detection.
    pub state: Option<u64>,
    /// Whether the console answered this check's reads, when it read any.
    pub reachable: Option<bool>,
}

impl CheckReport {
    pub fn passed(name: &'static str, summary: impl Into<String>) -> Self {
        Self {
            name,
            summary: summary.into(),
            issues: Vec::new(),
            state: None,
            reachable: None,
        }
    }

    pub fn failed(name: &'static str, summary: impl Into<String>, issues: Vec<String>) -> Self {
        Self {
            name,
            summary: summary.into(),
            issues,
            state: None,
            reachable: None,
        }
    }

    /// Attaches the digest of an observed snapshot.
    pub fn with_state<T: Hash>(mut self, observed: &T) -> Self {
        self.state = Some(state_digest(observed));
        self
    }

    pub fn with_reachable(mut self, reachable: bool) -> Self {
        self.reachable = Some(reachable);
        self
    }

    pub fn is_passed(&self) -> bool {
        self.issues.is_empty()
    }
}

/// One availability check, stateless across rounds.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;

    /// Evaluates the check once. A failing observation is a report with
    /// issues; `Err` aborts the instance's wait.
    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport>;
}

pub(crate) fn state_digest<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
