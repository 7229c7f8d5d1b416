use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

use super::{Check, CheckContext, CheckReport};

/// Inverse availability for stop waits: passes once the console stops
/// answering and the backing process has come to rest.
#[derive(Debug, Clone, Copy)]
pub struct AvailableCheck {
    /// Grace period during which a still-answering console reads as the
    /// instance finishing its work rather than refusing to stop.
    pub utilisation_time: Duration,
}

impl AvailableCheck {
    pub fn new(utilisation_time: Duration) -> Self {
        Self { utilisation_time }
    }
}

#[async_trait]
impl Check for AvailableCheck {
    fn name(&self) -> &'static str {
        "available"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport> {
        let snapshot = ctx.sync.reader.bundle_state(ctx.instance).await;
        if snapshot.is_unknown() {
            let status = ctx.sync.process.status(ctx.instance).await;
            let report = if status.is_at_rest() {
                CheckReport::passed(self.name(), format!("Instance down (process {status})"))
            } else {
                CheckReport::failed(
                    self.name(),
                    format!("Stopping (process {status})"),
                    vec![format!("process still {status}")],
                )
            };
            return Ok(report.with_state(&snapshot).with_reachable(false));
        }

        let mut issues = vec![format!(
            "console still answering at {}",
            ctx.instance.base_url
        )];
        if ctx.elapsed > self.utilisation_time {
            issues.push(format!(
                "instance in use beyond the {}ms utilisation budget",
                self.utilisation_time.as_millis()
            ));
        }
        let report = CheckReport::failed(self.name(), "Still available", issues);
        Ok(report.with_state(&snapshot).with_reachable(true))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use steward_model::ProcessStatus;

    use super::super::testing::{ScriptedReader, TestWait};
    use super::*;

    #[tokio::test]
    async fn silent_console_with_stopped_process_passes() {
        let wait = TestWait::new(
            Arc::new(ScriptedReader::unreachable()),
            ProcessStatus::Stopped,
        );
        let check = AvailableCheck::new(Duration::from_secs(10));
        let report = check.run(&wait.ctx()).await.expect("runs");
        assert!(report.is_passed());
        assert_eq!(report.summary, "Instance down (process stopped)");
        assert_eq!(report.reachable, Some(false));
    }

    #[tokio::test]
    async fn uncontrolled_process_counts_as_down_once_silent() {
        let wait = TestWait::new(
            Arc::new(ScriptedReader::unreachable()),
            ProcessStatus::Unknown,
        );
        let check = AvailableCheck::new(Duration::from_secs(10));
        let report = check.run(&wait.ctx()).await.expect("runs");
        assert!(report.is_passed());
    }

    #[tokio::test]
    async fn silent_console_with_running_process_keeps_waiting() {
        let wait = TestWait::new(
            Arc::new(ScriptedReader::unreachable()),
            ProcessStatus::Stopping,
        );
        let check = AvailableCheck::new(Duration::from_secs(10));
        let report = check.run(&wait.ctx()).await.expect("runs");
        assert!(!report.is_passed());
        assert_eq!(report.summary, "Stopping (process stopping)");
    }

    #[tokio::test]
    async fn answering_console_fails_and_escalates_past_the_budget() {
        let wait = TestWait::new(Arc::new(ScriptedReader::healthy()), ProcessStatus::Running);
        let check = AvailableCheck::new(Duration::from_secs(10));

        let report = check.run(&wait.ctx()).await.expect("runs");
        assert_eq!(report.summary, "Still available");
        assert_eq!(report.issues.len(), 1);

        let report = check
            .run(&wait.ctx_at(Duration::from_secs(11)))
            .await
            .expect("runs");
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues[1].contains("utilisation"));
    }
}
