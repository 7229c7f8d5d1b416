use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

use super::{Check, CheckContext, CheckReport};

/// Requires the observed state to hold still for a quiet period before a
/// wait may conclude. Guards against declaring an instance settled in the
/// middle of a burst of changes.
#[derive(Debug, Clone, Copy)]
pub struct UnchangedCheck {
    pub await_time: Duration,
}

impl UnchangedCheck {
    pub fn new(await_time: Duration) -> Self {
        Self { await_time }
    }
}

#[async_trait]
impl Check for UnchangedCheck {
    fn name(&self) -> &'static str {
        "unchanged"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport> {
        // Until a round has been folded into progress there is no state to
        // have held still.
        if ctx.progress.rounds() == 0 {
            return Ok(CheckReport::failed(
                self.name(),
                "Awaiting first observation",
                vec!["no state observed yet".to_string()],
            ));
        }

        let quiet = ctx.progress.state_time();
        let report = if quiet >= self.await_time {
            CheckReport::passed(
                self.name(),
                format!("State unchanged for {}ms", quiet.as_millis()),
            )
        } else {
            CheckReport::failed(
                self.name(),
                "State still changing",
                vec![format!(
                    "quiet for {}ms of {}ms",
                    quiet.as_millis(),
                    self.await_time.as_millis()
                )],
            )
        };
        Ok(report)
    }
}
