//! Grouped evaluation of checks within one poll round.

use std::fmt;

use crate::error::StewardError;

use super::{Check, CheckContext, CheckReport, state_digest};

/// Ordered set of checks evaluated together every round.
pub struct CheckGroup {
    checks: Vec<Box<dyn Check>>,
}

impl CheckGroup {
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Runs every check once, in order, never short-circuiting: a failing
    /// check still lets its siblings observe and report. The first fatal
    /// error is kept; later checks still run so the round's observations
    /// stay complete.
    pub async fn run_round(&self, ctx: &CheckContext<'_>) -> GroupOutcome {
        let mut reports = Vec::with_capacity(self.checks.len());
        let mut fatal = None;
        for check in &self.checks {
            match check.run(ctx).await {
                Ok(report) => reports.push(report),
                Err(error) => {
                    if fatal.is_none() {
                        fatal = Some(error);
                    }
                }
            }
        }
        GroupOutcome { reports, fatal }
    }
}

impl fmt::Debug for CheckGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.checks.iter().map(|check| check.name()).collect();
        f.debug_struct("CheckGroup").field("checks", &names).finish()
    }
}

/// Everything one round of checks produced for an instance.
#[derive(Debug)]
pub struct GroupOutcome {
    pub reports: Vec<CheckReport>,
    /// Error that aborts the wait, e.g. a breached time ceiling.
    pub fatal: Option<StewardError>,
}

impl GroupOutcome {
    /// The instance settled: no fatal error and every check passed.
    pub fn done(&self) -> bool {
        self.fatal.is_none() && self.reports.iter().all(CheckReport::is_passed)
    }

    /// False when any reporting check found the console unreachable.
    pub fn reachable(&self) -> bool {
        !self
            .reports
            .iter()
            .any(|report| report.reachable == Some(false))
    }

    /// Combined digest of every observation this round.
    pub fn state_digest(&self) -> u64 {
        let states: Vec<Option<u64>> = self.reports.iter().map(|report| report.state).collect();
        state_digest(&states)
    }

    /// First failing summary, or the all-clear.
    pub fn summary(&self) -> String {
        self.reports
            .iter()
            .find(|report| !report.is_passed())
            .map(|report| report.summary.clone())
            .unwrap_or_else(|| "All checks passed".to_string())
    }

    /// Every issue reported this round, prefixed with its check name.
    pub fn issues(&self) -> Vec<String> {
        self.reports
            .iter()
            .flat_map(|report| {
                report
                    .issues
                    .iter()
                    .map(|issue| format!("{}: {issue}", report.name))
            })
            .collect()
    }
}
