//! Core data model definitions shared across Steward crates.
//!
//! Everything here is a plain value: instances under management, snapshots
//! of their management consoles, health check definitions, and filesystem
//! change events. Orchestration behaviour lives in `steward-core`; these
//! types only describe what was observed or requested.

#![allow(missing_docs)]

pub mod event;
pub mod health;
pub mod instance;
pub mod state;

// Intentionally curated re-exports for downstream consumers.
pub use event::{ChangeKind, FileEvent};
pub use health::HealthCheck;
pub use instance::{Instance, InstanceId, ProcessStatus, Purpose};
pub use state::{
    BundleInfo, BundleSnapshot, ComponentInfo, ComponentSnapshot, EventInfo, EventSnapshot,
    InstallerSnapshot,
};
