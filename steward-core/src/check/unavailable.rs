//! Reachability tracking during start waits.

use async_trait::async_trait;

use crate::error::Result;

use super::{Check, CheckContext, CheckReport};

/// Watches for the instance's console to answer at all, consulting the
/// backing process while it does not.
///
/// Unreachability itself never aborts the wait; it fails the round and
/// feeds the unavailability clock that [`super::TimeoutCheck`] enforces.
/// A process in a transitional state is expected to be unreachable; any
/// other state gets flagged in the report's issues.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCheck;

#[async_trait]
impl Check for UnavailableCheck {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport> {
        let state = ctx.sync.reader.bundle_state(ctx.instance).await;
        if !state.is_unknown() {
            return Ok(CheckReport::passed(self.name(), "Instance reachable").with_reachable(true));
        }

        let status = ctx.sync.process.status(ctx.instance).await;
        let mut issues = vec![format!(
            "console not answering at {}",
            ctx.instance.base_url
        )];
        if !status.is_transitional() {
            issues.push(format!("unexpected process status: {status}"));
        }
        Ok(
            CheckReport::failed(self.name(), format!("Unavailable (process {status})"), issues)
                .with_reachable(false),
        )
    }
}
