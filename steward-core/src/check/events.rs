use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use steward_model::EventInfo;

use crate::error::Result;
use crate::patterns;

use super::{Check, CheckContext, CheckReport};

/// Fails while the framework keeps emitting events that indicate services
/// or bundles are still settling.
#[derive(Debug, Clone)]
pub struct EventsCheck {
    /// Topic patterns whose recent events count as instability.
    pub unstable_topics: Vec<String>,
    /// Events older than this no longer matter.
    pub unstable_age: Duration,
    /// Detail patterns exempted even under an unstable topic, e.g. MBean
    /// registrations that fire on every poll.
    pub ignored_details: Vec<String>,
}

impl EventsCheck {
    pub fn new(
        unstable_topics: Vec<String>,
        unstable_age: Duration,
        ignored_details: Vec<String>,
    ) -> Self {
        Self {
            unstable_topics,
            unstable_age,
            ignored_details,
        }
    }

    fn unstable<'a>(&self, events: &'a [EventInfo], now_ms: i64) -> Vec<&'a EventInfo> {
        let max_age_ms = self.unstable_age.as_millis() as i64;
        events
            .iter()
            .filter(|event| {
                patterns::wildcard_any(&event.topic, &self.unstable_topics)
                    && event.age_ms(now_ms) <= max_age_ms
                    && !patterns::wildcard_any(event.details(), &self.ignored_details)
            })
            .collect()
    }
}

#[async_trait]
impl Check for EventsCheck {
    fn name(&self) -> &'static str {
        "events"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport> {
        let snapshot = ctx.sync.reader.event_state(ctx.instance).await;
        if snapshot.is_unknown() {
            let report = CheckReport::failed(
                self.name(),
                "Events unknown",
                vec![format!(
                    "event console not answering at {}",
                    ctx.instance.base_url
                )],
            );
            return Ok(report.with_state(&snapshot).with_reachable(false));
        }

        let unstable = self.unstable(&snapshot.events, Utc::now().timestamp_millis());
        let report = if unstable.is_empty() {
            CheckReport::passed(self.name(), "Recent events stable")
        } else {
            let issues = unstable
                .iter()
                .map(|event| format!("{} | {}", event.topic, event.details()))
                .collect();
            CheckReport::failed(
                self.name(),
                format!("Unstable events ({})", unstable.len()),
                issues,
            )
        };
        Ok(report.with_state(&snapshot).with_reachable(true))
    }
}
