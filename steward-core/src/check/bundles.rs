use async_trait::async_trait;
use steward_model::BundleInfo;

use crate::error::Result;
use crate::patterns;

use super::{Check, CheckContext, CheckReport};

/// Requires every bundle to be started and every fragment resolved, minus
/// an ignore list of symbolic-name patterns.
#[derive(Debug, Clone, Default)]
pub struct BundlesCheck {
    pub symbolic_names_ignored: Vec<String>,
}

impl BundlesCheck {
    pub fn new(symbolic_names_ignored: Vec<String>) -> Self {
        Self {
            symbolic_names_ignored,
        }
    }
}

#[async_trait]
impl Check for BundlesCheck {
    fn name(&self) -> &'static str {
        "bundles"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport> {
        let snapshot = ctx.sync.reader.bundle_state(ctx.instance).await;
        if snapshot.is_unknown() {
            let report = CheckReport::failed(
                self.name(),
                "Bundles unknown",
                vec![format!(
                    "bundle console not answering at {}",
                    ctx.instance.base_url
                )],
            );
            return Ok(report.with_state(&snapshot).with_reachable(false));
        }

        let unstable: Vec<&BundleInfo> = snapshot
            .bundles
            .iter()
            .filter(|bundle| {
                !bundle.stable()
                    && !patterns::wildcard_any(&bundle.symbolic_name, &self.symbolic_names_ignored)
            })
            .collect();

        let report = if unstable.is_empty() {
            CheckReport::passed(
                self.name(),
                format!("Bundles stable ({}%)", snapshot.stable_percent()),
            )
        } else {
            let issues = unstable
                .iter()
                .map(|bundle| format!("{} ({})", bundle.symbolic_name, bundle.state))
                .collect();
            CheckReport::failed(
                self.name(),
                format!(
                    "Unstable bundles ({}/{})",
                    unstable.len(),
                    snapshot.bundles.len()
                ),
                issues,
            )
        };
        Ok(report.with_state(&snapshot).with_reachable(true))
    }
}
