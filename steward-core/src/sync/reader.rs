//! Read access to an instance's management console.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use steward_model::{BundleSnapshot, ComponentSnapshot, EventSnapshot, Instance, InstallerSnapshot};
use tracing::debug;
use url::Url;

use crate::error::Result;

const BUNDLES_PATH: &str = "/system/console/bundles.json";
const COMPONENTS_PATH: &str = "/system/console/components.json";
const EVENTS_PATH: &str = "/system/console/events.json";
const INSTALLER_PATH: &str =
    "/system/sling/monitoring/mbeans/org/apache/sling/installer/Installer/Sling%20OSGi%20Installer.json";

/// Read-only view of an instance's management console.
///
/// Every method performs exactly one probe and maps an unreachable or
/// undecodable console to the matching `unknown` sentinel. Pacing and
/// retrying are the caller's concern.
#[async_trait]
pub trait StateReader: Send + Sync {
    async fn bundle_state(&self, instance: &Instance) -> BundleSnapshot;
    async fn component_state(&self, instance: &Instance) -> ComponentSnapshot;
    async fn event_state(&self, instance: &Instance) -> EventSnapshot;
    async fn installer_state(&self, instance: &Instance) -> InstallerSnapshot;
}

/// Console reader over HTTP with basic-auth credentials from the instance.
#[derive(Debug, Clone)]
pub struct HttpStateReader {
    client: reqwest::Client,
    connection_timeout: Duration,
    component_timeout: Duration,
}

impl HttpStateReader {
    /// `connection_timeout` bounds ordinary console reads; component listings
    /// get their own, larger budget.
    pub fn new(connection_timeout: Duration, component_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            connection_timeout,
            component_timeout,
        })
    }

    fn console_url(&self, instance: &Instance, path: &str) -> Result<Url> {
        let base = instance.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        instance: &Instance,
        path: &str,
        timeout: Duration,
    ) -> Result<T> {
        let url = self.console_url(instance, path)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&instance.user, Some(&instance.password))
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl StateReader for HttpStateReader {
    async fn bundle_state(&self, instance: &Instance) -> BundleSnapshot {
        match self
            .fetch(instance, BUNDLES_PATH, self.connection_timeout)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(error) => {
                debug!(instance = %instance.id(), error = %error, "bundle state read failed");
                BundleSnapshot::unknown()
            }
        }
    }

    async fn component_state(&self, instance: &Instance) -> ComponentSnapshot {
        match self
            .fetch(instance, COMPONENTS_PATH, self.component_timeout)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(error) => {
                debug!(instance = %instance.id(), error = %error, "component state read failed");
                ComponentSnapshot::unknown()
            }
        }
    }

    async fn event_state(&self, instance: &Instance) -> EventSnapshot {
        match self
            .fetch(instance, EVENTS_PATH, self.connection_timeout)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(error) => {
                debug!(instance = %instance.id(), error = %error, "event state read failed");
                EventSnapshot::unknown()
            }
        }
    }

    async fn installer_state(&self, instance: &Instance) -> InstallerSnapshot {
        match self
            .fetch(instance, INSTALLER_PATH, self.connection_timeout)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(error) => {
                debug!(instance = %instance.id(), error = %error, "installer state read failed");
                InstallerSnapshot::unknown()
            }
        }
    }
}
