//! Elapsed-time ceilings that abort a wait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, StewardError, TimeoutCeiling};

use super::{Check, CheckContext, CheckReport};

/// Aborts the wait when one of up to three ceilings is breached: continuous
/// unreachability, an unchanged observed state, or total elapsed time.
///
/// Ceilings never resolve a wait successfully; a breached ceiling is a
/// fatal error carrying the instance and the ceiling that fired.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutCheck {
    /// Unreachability ceiling; `None` for waits where an unreachable
    /// instance is the goal rather than a problem.
    pub unavailable_time: Option<Duration>,
    pub state_time: Duration,
    pub constant_time: Duration,
}

#[async_trait]
impl Check for TimeoutCheck {
    fn name(&self) -> &'static str {
        "timeout"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport> {
        if let Some(ceiling) = self.unavailable_time
            && let Some(unavailable) = ctx.progress.unavailable_for()
            && unavailable >= ceiling
        {
            return Err(StewardError::Timeout {
                instance: ctx.instance.id(),
                ceiling: TimeoutCeiling::Unavailable,
                elapsed: unavailable,
            });
        }

        // The first round has no baseline, so the state clock is meaningless.
        if ctx.progress.rounds() > 0 && ctx.progress.state_time() >= self.state_time {
            return Err(StewardError::Timeout {
                instance: ctx.instance.id(),
                ceiling: TimeoutCeiling::StateUnchanged,
                elapsed: ctx.progress.state_time(),
            });
        }

        if ctx.elapsed >= self.constant_time {
            return Err(StewardError::Timeout {
                instance: ctx.instance.id(),
                ceiling: TimeoutCeiling::Constant,
                elapsed: ctx.elapsed,
            });
        }

        Ok(CheckReport::passed(self.name(), "Within time limits"))
    }
}
