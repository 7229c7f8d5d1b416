//! Durable per-step execution markers.
//!
//! A marker records when a step last ran on an instance, with which version,
//! and whether it failed. Conditions read markers to decide performability;
//! the instance step lifecycle writes them around each action.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use steward_model::{Instance, InstanceId};
use url::Url;

use crate::error::Result;

/// Execution metadata for one step on one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepRecord {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Version stamped by the last run; condition changes compare against it.
    pub version: Option<String>,
    pub failed: bool,
    /// Runs observed so far, maintained only for countable provisioning.
    pub counter: u64,
}

impl StepRecord {
    pub fn ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Repository node storing the marker for `step_id`, relative to the
/// configured provisioning root. Dots flip to dashes so versioned step ids
/// produce flat node names.
pub fn marker_node(root: &str, step_id: &str) -> String {
    format!(
        "{}/step/{}",
        root.trim_end_matches('/'),
        step_id.replace('.', "-")
    )
}

/// Stores step markers for instances.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Reads the marker, `None` when the step never ran on the instance.
    async fn read(&self, instance: &Instance, step_id: &str) -> Result<Option<StepRecord>>;
    async fn save(&self, instance: &Instance, step_id: &str, record: &StepRecord) -> Result<()>;
}

/// Marker store persisting records as JSON nodes in the instance's own
/// repository, so markers survive everything the instance itself survives.
#[derive(Debug, Clone)]
pub struct HttpMarkerStore {
    client: reqwest::Client,
    root: String,
}

impl HttpMarkerStore {
    pub fn new(root: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            root: root.into(),
        })
    }

    fn node_url(&self, instance: &Instance, step_id: &str, suffix: &str) -> Result<Url> {
        let base = instance.base_url.as_str().trim_end_matches('/');
        let node = marker_node(&self.root, step_id);
        Ok(Url::parse(&format!("{base}{node}{suffix}"))?)
    }
}

#[async_trait]
impl MarkerStore for HttpMarkerStore {
    async fn read(&self, instance: &Instance, step_id: &str) -> Result<Option<StepRecord>> {
        let url = self.node_url(instance, step_id, ".json")?;
        let response = self
            .client
            .get(url)
            .basic_auth(&instance.user, Some(&instance.password))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.error_for_status()?.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn save(&self, instance: &Instance, step_id: &str, record: &StepRecord) -> Result<()> {
        let url = self.node_url(instance, step_id, "")?;
        self.client
            .post(url)
            .basic_auth(&instance.user, Some(&instance.password))
            .json(record)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// In-memory marker store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    records: DashMap<(InstanceId, String), StepRecord>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarkerStore for MemoryMarkerStore {
    async fn read(&self, instance: &Instance, step_id: &str) -> Result<Option<StepRecord>> {
        Ok(self
            .records
            .get(&(instance.id(), step_id.to_string()))
            .map(|entry| entry.clone()))
    }

    async fn save(&self, instance: &Instance, step_id: &str, record: &StepRecord) -> Result<()> {
        self.records
            .insert((instance.id(), step_id.to_string()), record.clone());
        Ok(())
    }
}
