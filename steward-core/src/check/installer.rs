use async_trait::async_trait;

use crate::error::Result;

use super::{Check, CheckContext, CheckReport};

/// Fails while the OSGi installer is still processing resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallerCheck;

#[async_trait]
impl Check for InstallerCheck {
    fn name(&self) -> &'static str {
        "installer"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport> {
        let snapshot = ctx.sync.reader.installer_state(ctx.instance).await;
        if snapshot.is_unknown() {
            let report = CheckReport::failed(
                self.name(),
                "Installer unknown",
                vec![format!(
                    "installer endpoint not answering at {}",
                    ctx.instance.base_url
                )],
            );
            return Ok(report.with_state(&snapshot).with_reachable(false));
        }

        let report = if snapshot.busy() {
            CheckReport::failed(
                self.name(),
                format!("Installer busy ({} active)", snapshot.active_resource_count),
                vec![format!(
                    "{} resources awaiting installation",
                    snapshot.active_resource_count
                )],
            )
        } else {
            CheckReport::passed(self.name(), "Installer idle")
        };
        Ok(report.with_state(&snapshot).with_reachable(true))
    }
}
