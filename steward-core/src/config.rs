//! Orchestrator tuning knobs.
//!
//! Every field carries a default so deployments can adopt individual
//! settings without supplying a full configuration payload. Durations are
//! stored as milliseconds for serialization and exposed through accessors.

use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Global knobs that tune orchestrator behaviour.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Start-wait cadence, ceilings, and per-check tuning.
    pub await_up: AwaitUpConfig,
    /// Stop-wait ceilings.
    pub await_down: AwaitDownConfig,
    /// Provisioning step filtering and marker storage.
    pub provision: ProvisionConfig,
    /// Health probing cadence and retry envelope.
    pub health: HealthConfig,
    /// Reload pipeline behaviour.
    pub reload: ReloadConfig,
}

/// Tuning for waits that drive instances up to a stable state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AwaitUpConfig {
    /// Pause between poll rounds in milliseconds.
    pub delay_ms: u64,
    /// Ceiling for continuous unreachability before the wait aborts.
    pub unavailable_time_ms: u64,
    /// Ceiling for an unchanged observed state before the wait aborts.
    pub state_time_ms: u64,
    /// Absolute ceiling for the whole wait.
    pub constant_time_ms: u64,
    /// Events younger than this on an unstable topic block stability.
    pub event_unstable_age_ms: u64,
    /// Topics whose recent events count as instability.
    pub event_unstable_topics: Vec<String>,
    /// Event detail patterns excluded from the instability signal.
    pub event_ignored_details: Vec<String>,
    /// Bundle symbolic-name patterns excluded from the stability requirement.
    pub bundle_symbolic_names_ignored: Vec<String>,
    /// Component patterns that must all be active.
    pub platform_components: Vec<String>,
    /// Component patterns that must be neither unsatisfied nor failed.
    pub specific_components: Vec<String>,
    /// Quiet period the observed state must hold before the wait resolves.
    pub unchanged_await_time_ms: u64,
    /// Connection budget for one console read.
    pub connection_timeout_ms: u64,
    /// Connection budget for component reads, which run slower on large
    /// instances.
    pub component_connection_timeout_ms: u64,
    /// Log every failing check each round instead of only on state changes.
    pub verbose: bool,
}

impl AwaitUpConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn unavailable_time(&self) -> Duration {
        Duration::from_millis(self.unavailable_time_ms)
    }

    pub fn state_time(&self) -> Duration {
        Duration::from_millis(self.state_time_ms)
    }

    pub fn constant_time(&self) -> Duration {
        Duration::from_millis(self.constant_time_ms)
    }

    pub fn event_unstable_age(&self) -> Duration {
        Duration::from_millis(self.event_unstable_age_ms)
    }

    pub fn unchanged_await_time(&self) -> Duration {
        Duration::from_millis(self.unchanged_await_time_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn component_connection_timeout(&self) -> Duration {
        Duration::from_millis(self.component_connection_timeout_ms)
    }
}

impl Default for AwaitUpConfig {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            unavailable_time_ms: 60_000,
            state_time_ms: 600_000,
            constant_time_ms: 1_800_000,
            event_unstable_age_ms: 5_000,
            event_unstable_topics: vec![
                "org/osgi/framework/ServiceEvent/*".to_string(),
                "org/osgi/framework/FrameworkEvent/*".to_string(),
                "org/osgi/framework/BundleEvent/*".to_string(),
            ],
            event_ignored_details: vec![
                "*.*MBean".to_string(),
                "org.osgi.service.component.runtime.ServiceComponentRuntime".to_string(),
                "java.util.ResourceBundle".to_string(),
            ],
            bundle_symbolic_names_ignored: Vec::new(),
            platform_components: vec!["org.apache.sling.installer.*".to_string()],
            specific_components: Vec::new(),
            unchanged_await_time_ms: 3_000,
            connection_timeout_ms: 1_000,
            component_connection_timeout_ms: 10_000,
            verbose: false,
        }
    }
}

/// Tuning for waits that confirm instances went down.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AwaitDownConfig {
    /// Pause between poll rounds in milliseconds.
    pub delay_ms: u64,
    /// Ceiling for an unchanged observed state before the wait aborts.
    pub state_time_ms: u64,
    /// Absolute ceiling for the whole wait.
    pub constant_time_ms: u64,
    /// Grace for lingering availability after the stop was requested.
    pub utilisation_time_ms: u64,
    /// Quiet period the observed state must hold before the wait resolves.
    pub unchanged_await_time_ms: u64,
    /// Log every failing check each round instead of only on state changes.
    pub verbose: bool,
}

impl AwaitDownConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn state_time(&self) -> Duration {
        Duration::from_millis(self.state_time_ms)
    }

    pub fn constant_time(&self) -> Duration {
        Duration::from_millis(self.constant_time_ms)
    }

    pub fn utilisation_time(&self) -> Duration {
        Duration::from_millis(self.utilisation_time_ms)
    }

    pub fn unchanged_await_time(&self) -> Duration {
        Duration::from_millis(self.unchanged_await_time_ms)
    }
}

impl Default for AwaitDownConfig {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            state_time_ms: 120_000,
            constant_time_ms: 600_000,
            utilisation_time_ms: 10_000,
            unchanged_await_time_ms: 3_000,
            verbose: false,
        }
    }
}

/// Provisioning behaviour shared by every step of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Disables all provisioning when false.
    pub enabled: bool,
    /// Forces every step to perform regardless of markers.
    pub greedy: bool,
    /// Glob filter selecting steps by identifier.
    pub step_name: String,
    /// Maintain per-step run counters in markers, enabling repeat-every
    /// conditions.
    pub countable: bool,
    /// Repository path under which step markers are stored.
    pub path: String,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            greedy: false,
            step_name: "*".to_string(),
            countable: false,
            path: "/var/steward/provision".to_string(),
        }
    }
}

/// Health verification cadence and retry envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Pause between probe attempts in milliseconds.
    pub delay_ms: u64,
    /// Full verification retries before giving up.
    pub retry_times: u32,
}

impl HealthConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            retry_times: 5,
        }
    }
}

/// Reload pipeline behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Run health verification after each reload batch.
    pub verify: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self { verify: true }
    }
}
