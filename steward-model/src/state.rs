//! Snapshots of a remote instance's management console.
//!
//! Each snapshot mirrors one console endpoint's JSON payload. Transport
//! failures are represented by the `unknown` sentinel of the matching type
//! rather than an error, because an unreachable console is an expected
//! observation while instances start and stop.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One OSGi bundle as listed by the bundle console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInfo {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbolic_name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub state_raw: i32,
    #[serde(default)]
    pub fragment: bool,
}

impl BundleInfo {
    pub const STATE_RAW_RESOLVED: i32 = 4;
    pub const STATE_RAW_ACTIVE: i32 = 32;

    /// A fragment is stable once resolved; anything else must be active.
    pub fn stable(&self) -> bool {
        if self.fragment {
            self.state_raw == Self::STATE_RAW_RESOLVED
        } else {
            self.state_raw == Self::STATE_RAW_ACTIVE
        }
    }
}

/// Bundle console payload: per-bundle rows plus the console's own totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSnapshot {
    /// Console status line, informational only.
    #[serde(default)]
    pub status: String,
    /// Totals as reported by the console: total, active, active fragments,
    /// resolved, installed.
    #[serde(rename = "s", default)]
    pub stats: Vec<i64>,
    #[serde(rename = "data", default)]
    pub bundles: Vec<BundleInfo>,
}

impl BundleSnapshot {
    /// Sentinel for a console that did not answer.
    pub fn unknown() -> Self {
        Self {
            status: String::new(),
            stats: Vec::new(),
            bundles: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn stable(&self) -> bool {
        !self.is_unknown() && self.bundles.iter().all(BundleInfo::stable)
    }

    pub fn stable_count(&self) -> usize {
        self.bundles.iter().filter(|b| b.stable()).count()
    }

    /// Share of stable bundles, rounded down. Zero for the unknown sentinel.
    pub fn stable_percent(&self) -> u32 {
        if self.bundles.is_empty() {
            return 0;
        }
        (self.stable_count() * 100 / self.bundles.len()) as u32
    }
}

// The status line restates the totals, so identity is the data itself.
impl PartialEq for BundleSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.stats == other.stats && self.bundles == other.bundles
    }
}

impl Eq for BundleSnapshot {}

impl Hash for BundleSnapshot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.stats.hash(state);
        self.bundles.hash(state);
    }
}

/// One declarative-services component as listed by the component console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub state_raw: i32,
    #[serde(default)]
    pub pid: String,
}

impl ComponentInfo {
    pub const STATE_ACTIVE: &'static str = "active";
    pub const STATE_SATISFIED: &'static str = "satisfied";
    pub const STATE_UNSATISFIED: &'static str = "unsatisfied";
    pub const STATE_FAILED_ACTIVATION: &'static str = "failed activation";
    pub const STATE_NO_CONFIG: &'static str = "no config";

    /// Persistent identity: the PID when present, the display name otherwise.
    pub fn uid(&self) -> &str {
        if self.pid.is_empty() { &self.name } else { &self.pid }
    }

    pub fn active(&self) -> bool {
        self.state.eq_ignore_ascii_case(Self::STATE_ACTIVE)
    }

    pub fn satisfied(&self) -> bool {
        self.state.eq_ignore_ascii_case(Self::STATE_SATISFIED)
    }

    pub fn unsatisfied(&self) -> bool {
        self.state.eq_ignore_ascii_case(Self::STATE_UNSATISFIED)
    }

    pub fn failed_activation(&self) -> bool {
        self.state.eq_ignore_ascii_case(Self::STATE_FAILED_ACTIVATION)
    }
}

/// Component console payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    /// Total component count as reported by the console.
    #[serde(rename = "status", default)]
    pub total: i64,
    #[serde(rename = "data", default)]
    pub components: Vec<ComponentInfo>,
}

impl ComponentSnapshot {
    pub fn unknown() -> Self {
        Self {
            total: 0,
            components: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.components.is_empty()
    }
}

/// One framework event as listed by the event console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub topic: String,
    /// Reception time in epoch milliseconds.
    #[serde(default)]
    pub received: i64,
    #[serde(default)]
    pub info: String,
}

impl EventInfo {
    /// Human-oriented detail line, falling back to the event id.
    pub fn details(&self) -> &str {
        if self.info.is_empty() { &self.id } else { &self.info }
    }

    /// Milliseconds between reception and `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.received
    }
}

/// Event console payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSnapshot {
    #[serde(rename = "data", default)]
    pub events: Vec<EventInfo>,
}

impl EventSnapshot {
    pub fn unknown() -> Self {
        Self { events: Vec::new() }
    }

    pub fn is_unknown(&self) -> bool {
        self.events.is_empty()
    }
}

/// OSGi installer state as exposed over JMX.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallerSnapshot {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub active_resource_count: i64,
    /// Negative when the installer endpoint did not answer.
    #[serde(default = "InstallerSnapshot::unknown_count")]
    pub installed_resource_count: i64,
}

impl InstallerSnapshot {
    const fn unknown_count() -> i64 {
        -1
    }

    pub fn unknown() -> Self {
        Self {
            active: false,
            active_resource_count: 0,
            installed_resource_count: Self::unknown_count(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.installed_resource_count < 0
    }

    pub fn busy(&self) -> bool {
        self.active || self.active_resource_count > 0
    }

    pub fn idle(&self) -> bool {
        !self.is_unknown() && !self.busy()
    }
}
