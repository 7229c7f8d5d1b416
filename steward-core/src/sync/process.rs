//! Control surface for the OS process backing an instance.

use async_trait::async_trait;
use steward_model::{Instance, ProcessStatus};

use crate::error::{Result, StewardError};

/// Controls and observes the process behind an instance.
///
/// Implementations wrap whatever actually manages the process: an init
/// system, a container runtime, or a vendor control script.
#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Observed process state, [`ProcessStatus::Unknown`] when the
    /// controller cannot tell.
    async fn status(&self, instance: &Instance) -> ProcessStatus;

    /// Applies pending configuration by reloading the process in place.
    async fn reload(&self, instance: &Instance) -> Result<()>;

    async fn restart(&self, instance: &Instance) -> Result<()>;
}

/// Controller for instances whose process lifecycle is managed elsewhere,
/// e.g. remote environments reachable only over HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedProcess;

#[async_trait]
impl ProcessController for DetachedProcess {
    async fn status(&self, _instance: &Instance) -> ProcessStatus {
        ProcessStatus::Unknown
    }

    async fn reload(&self, instance: &Instance) -> Result<()> {
        Err(StewardError::Validation(format!(
            "instance '{}' has no managed process to reload",
            instance.id()
        )))
    }

    async fn restart(&self, instance: &Instance) -> Result<()> {
        Err(StewardError::Validation(format!(
            "instance '{}' has no managed process to restart",
            instance.id()
        )))
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    #[tokio::test]
    async fn detached_processes_report_unknown_and_refuse_control() {
        let instance = Instance::new(
            "prod",
            "publish1",
            Url::parse("https://publish1.example.com").expect("static url"),
            "steward",
            "secret",
        );
        let controller = DetachedProcess;
        assert_eq!(controller.status(&instance).await, ProcessStatus::Unknown);
        assert!(matches!(
            controller.reload(&instance).await,
            Err(StewardError::Validation(_))
        ));
    }
}
