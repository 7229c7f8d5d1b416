//! Instances under orchestration and their process lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Identifies one managed instance by its full name, e.g. `local-author`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InstanceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Role an instance plays within its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Author,
    Publish,
}

impl Purpose {
    /// Derives the purpose from an instance name like `author` or `publish2`.
    /// Anything that does not start with `author` counts as a publisher.
    pub fn from_name(name: &str) -> Self {
        if name.to_ascii_lowercase().starts_with("author") {
            Purpose::Author
        } else {
            Purpose::Publish
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::Author => f.write_str("author"),
            Purpose::Publish => f.write_str("publish"),
        }
    }
}

/// A remote content-repository instance reachable over HTTP.
///
/// The pair of `env` and `name` identifies the instance across a fleet;
/// credentials authenticate against its management console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Environment the instance belongs to, e.g. `local` or `prod`.
    pub env: String,
    /// Role name within the environment, e.g. `author` or `publish1`.
    pub name: String,
    /// Base URL of the instance, without a trailing console path.
    pub base_url: Url,
    pub user: String,
    pub password: String,
}

impl Instance {
    pub fn new(
        env: impl Into<String>,
        name: impl Into<String>,
        base_url: Url,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            env: env.into(),
            name: name.into(),
            base_url,
            user: user.into(),
            password: password.into(),
        }
    }

    /// Full name joining environment and role, e.g. `local-author`.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.env, self.name)
    }

    pub fn id(&self) -> InstanceId {
        InstanceId::new(self.full_name())
    }

    pub fn purpose(&self) -> Purpose {
        Purpose::from_name(&self.name)
    }

    pub fn is_author(&self) -> bool {
        self.purpose() == Purpose::Author
    }

    pub fn is_publish(&self) -> bool {
        self.purpose() == Purpose::Publish
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name(), self.base_url)
    }
}

/// Observed state of the OS process backing an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    /// The controller could not determine a state, e.g. for instances whose
    /// process lives on another host.
    Unknown,
}

impl ProcessStatus {
    /// Parses control-script output such as `RUNNING`; anything unrecognised
    /// maps to [`ProcessStatus::Unknown`].
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "starting" => ProcessStatus::Starting,
            "running" => ProcessStatus::Running,
            "stopping" => ProcessStatus::Stopping,
            "stopped" => ProcessStatus::Stopped,
            _ => ProcessStatus::Unknown,
        }
    }

    /// States in which the HTTP interface is structurally absent, so an
    /// unreachable console is no surprise.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            ProcessStatus::Starting | ProcessStatus::Stopping | ProcessStatus::Stopped
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }

    /// States in which a stop wait may conclude.
    pub fn is_at_rest(&self) -> bool {
        matches!(self, ProcessStatus::Stopped | ProcessStatus::Unknown)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProcessStatus::Starting => "starting",
            ProcessStatus::Running => "running",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}
