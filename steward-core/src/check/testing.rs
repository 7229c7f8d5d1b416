//! Shared fakes and fixtures for check tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use steward_model::{
    BundleInfo, BundleSnapshot, ComponentInfo, ComponentSnapshot, EventInfo, EventSnapshot,
    Instance, InstanceId, InstallerSnapshot, ProcessStatus,
};
use url::Url;

use crate::check::{CheckContext, CheckProgress};
use crate::error::Result;
use crate::sync::{InstanceSync, MemoryMarkerStore, ProcessController, StateReader};

pub(crate) fn instance(name: &str) -> Instance {
    let port = if name.starts_with("author") { 4502 } else { 4503 };
    Instance::new(
        "local",
        name,
        Url::parse(&format!("http://localhost:{port}")).expect("static url"),
        "admin",
        "admin",
    )
}

pub(crate) fn bundle(symbolic_name: &str, state_raw: i32) -> BundleInfo {
    BundleInfo {
        id: 0,
        name: symbolic_name.to_string(),
        symbolic_name: symbolic_name.to_string(),
        state: if state_raw == BundleInfo::STATE_RAW_ACTIVE {
            "Active".to_string()
        } else {
            "Resolved".to_string()
        },
        state_raw,
        fragment: false,
    }
}

pub(crate) fn stable_bundles() -> BundleSnapshot {
    BundleSnapshot {
        status: String::new(),
        stats: vec![2, 2, 0, 0, 0],
        bundles: vec![
            bundle("org.apache.felix.framework", BundleInfo::STATE_RAW_ACTIVE),
            bundle("org.apache.sling.api", BundleInfo::STATE_RAW_ACTIVE),
        ],
    }
}

pub(crate) fn unstable_bundles(symbolic_name: &str) -> BundleSnapshot {
    BundleSnapshot {
        status: String::new(),
        stats: vec![2, 1, 0, 1, 0],
        bundles: vec![
            bundle("org.apache.felix.framework", BundleInfo::STATE_RAW_ACTIVE),
            bundle(symbolic_name, BundleInfo::STATE_RAW_RESOLVED),
        ],
    }
}

/// Events old enough to never count as instability.
pub(crate) fn quiet_events() -> EventSnapshot {
    EventSnapshot {
        events: vec![EventInfo {
            id: "1".to_string(),
            topic: "org/osgi/framework/BundleEvent/STARTED".to_string(),
            received: Utc::now().timestamp_millis() - 3_600_000,
            info: "startup".to_string(),
        }],
    }
}

pub(crate) fn recent_event(topic: &str, info: &str) -> EventInfo {
    EventInfo {
        id: "2".to_string(),
        topic: topic.to_string(),
        received: Utc::now().timestamp_millis(),
        info: info.to_string(),
    }
}

pub(crate) fn healthy_components() -> ComponentSnapshot {
    ComponentSnapshot {
        total: 2,
        components: vec![
            ComponentInfo {
                id: "10".to_string(),
                name: "OSGi Installer".to_string(),
                state: ComponentInfo::STATE_ACTIVE.to_string(),
                state_raw: 8,
                pid: "org.apache.sling.installer.core.impl.OsgiInstallerImpl".to_string(),
            },
            ComponentInfo {
                id: "11".to_string(),
                name: "Example".to_string(),
                state: ComponentInfo::STATE_SATISFIED.to_string(),
                state_raw: 4,
                pid: "org.example.Component".to_string(),
            },
        ],
    }
}

pub(crate) fn idle_installer() -> InstallerSnapshot {
    InstallerSnapshot {
        active: false,
        active_resource_count: 0,
        installed_resource_count: 240,
    }
}

pub(crate) fn busy_installer(active_resources: i64) -> InstallerSnapshot {
    InstallerSnapshot {
        active: true,
        active_resource_count: active_resources,
        installed_resource_count: 240,
    }
}

/// Console reader whose bundle state can follow a per-instance script while
/// the remaining endpoints stay fixed. Exhausted scripts fall back to the
/// configured steady state; blacked-out instances read as unknown on every
/// endpoint.
pub(crate) struct ScriptedReader {
    scripts: DashMap<InstanceId, VecDeque<BundleSnapshot>>,
    blackouts: DashSet<InstanceId>,
    pub fallback_bundles: BundleSnapshot,
    pub components: ComponentSnapshot,
    pub events: EventSnapshot,
    pub installer: InstallerSnapshot,
}

impl ScriptedReader {
    /// A console that answers and reports a fully settled instance.
    pub(crate) fn healthy() -> Self {
        Self {
            scripts: DashMap::new(),
            blackouts: DashSet::new(),
            fallback_bundles: stable_bundles(),
            components: healthy_components(),
            events: quiet_events(),
            installer: idle_installer(),
        }
    }

    /// A console that never answers.
    pub(crate) fn unreachable() -> Self {
        Self {
            scripts: DashMap::new(),
            blackouts: DashSet::new(),
            fallback_bundles: BundleSnapshot::unknown(),
            components: ComponentSnapshot::unknown(),
            events: EventSnapshot::unknown(),
            installer: InstallerSnapshot::unknown(),
        }
    }

    /// Queues bundle snapshots served to `instance` read by read before
    /// the fallback applies.
    pub(crate) fn script(&self, instance: &Instance, snapshots: Vec<BundleSnapshot>) {
        self.scripts.insert(instance.id(), snapshots.into());
    }

    /// Makes every endpoint of `instance` read as unknown.
    pub(crate) fn mark_unreachable(&self, instance: &Instance) {
        self.blackouts.insert(instance.id());
    }

    fn blacked_out(&self, instance: &Instance) -> bool {
        self.blackouts.contains(&instance.id())
    }
}

#[async_trait]
impl StateReader for ScriptedReader {
    async fn bundle_state(&self, instance: &Instance) -> BundleSnapshot {
        if self.blacked_out(instance) {
            return BundleSnapshot::unknown();
        }
        if let Some(mut script) = self.scripts.get_mut(&instance.id())
            && let Some(next) = script.pop_front()
        {
            return next;
        }
        self.fallback_bundles.clone()
    }

    async fn component_state(&self, instance: &Instance) -> ComponentSnapshot {
        if self.blacked_out(instance) {
            return ComponentSnapshot::unknown();
        }
        self.components.clone()
    }

    async fn event_state(&self, instance: &Instance) -> EventSnapshot {
        if self.blacked_out(instance) {
            return EventSnapshot::unknown();
        }
        self.events.clone()
    }

    async fn installer_state(&self, instance: &Instance) -> InstallerSnapshot {
        if self.blacked_out(instance) {
            return InstallerSnapshot::unknown();
        }
        self.installer.clone()
    }
}

pub(crate) struct FixedProcess(pub ProcessStatus);

#[async_trait]
impl ProcessController for FixedProcess {
    async fn status(&self, _instance: &Instance) -> ProcessStatus {
        self.0
    }

    async fn reload(&self, _instance: &Instance) -> Result<()> {
        Ok(())
    }

    async fn restart(&self, _instance: &Instance) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn sync_with(reader: Arc<dyn StateReader>, status: ProcessStatus) -> InstanceSync {
    InstanceSync::new(
        reader,
        Arc::new(MemoryMarkerStore::new()),
        Arc::new(FixedProcess(status)),
    )
}

/// Owns everything a [`CheckContext`] borrows, so single-check tests can
/// build one without ceremony.
pub(crate) struct TestWait {
    pub instance: Instance,
    pub sync: InstanceSync,
    pub progress: CheckProgress,
}

impl TestWait {
    pub(crate) fn new(reader: Arc<dyn StateReader>, status: ProcessStatus) -> Self {
        Self {
            instance: instance("author"),
            sync: sync_with(reader, status),
            progress: CheckProgress::new(),
        }
    }

    pub(crate) fn ctx(&self) -> CheckContext<'_> {
        self.ctx_at(Duration::ZERO)
    }

    pub(crate) fn ctx_at(&self, elapsed: Duration) -> CheckContext<'_> {
        CheckContext {
            instance: &self.instance,
            sync: &self.sync,
            progress: &self.progress,
            elapsed,
        }
    }
}
