use async_trait::async_trait;

use crate::error::Result;
use crate::patterns;

use super::{Check, CheckContext, CheckReport};

/// Verifies declarative-services components: platform patterns must be
/// active, specific patterns must at least not have failed.
#[derive(Debug, Clone, Default)]
pub struct ComponentsCheck {
    /// Component patterns required to be fully active.
    pub platform_components: Vec<String>,
    /// Component patterns that may still be pending but must not be
    /// unsatisfied or failed.
    pub specific_components: Vec<String>,
}

impl ComponentsCheck {
    pub fn new(platform_components: Vec<String>, specific_components: Vec<String>) -> Self {
        Self {
            platform_components,
            specific_components,
        }
    }

    fn has_requirements(&self) -> bool {
        !self.platform_components.is_empty() || !self.specific_components.is_empty()
    }
}

#[async_trait]
impl Check for ComponentsCheck {
    fn name(&self) -> &'static str {
        "components"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckReport> {
        if !self.has_requirements() {
            return Ok(CheckReport::passed(self.name(), "No component requirements"));
        }

        let snapshot = ctx.sync.reader.component_state(ctx.instance).await;
        if snapshot.is_unknown() {
            let report = CheckReport::failed(
                self.name(),
                "Components unknown",
                vec![format!(
                    "component console not answering at {}",
                    ctx.instance.base_url
                )],
            );
            return Ok(report.with_state(&snapshot).with_reachable(false));
        }

        let mut issues = Vec::new();
        for component in &snapshot.components {
            if patterns::wildcard_any(component.uid(), &self.platform_components)
                && !component.active()
            {
                issues.push(format!("{} ({})", component.uid(), component.state));
            } else if patterns::wildcard_any(component.uid(), &self.specific_components)
                && (component.failed_activation() || component.unsatisfied())
            {
                issues.push(format!("{} ({})", component.uid(), component.state));
            }
        }

        let report = if issues.is_empty() {
            CheckReport::passed(
                self.name(),
                format!("Components active ({} checked)", snapshot.components.len()),
            )
        } else {
            CheckReport::failed(
                self.name(),
                format!("Inactive components ({})", issues.len()),
                issues,
            )
        };
        Ok(report.with_state(&snapshot).with_reachable(true))
    }
}
