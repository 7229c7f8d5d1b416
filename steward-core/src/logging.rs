//! Tracing subscriber setup for embedding applications.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a formatted subscriber honouring `RUST_LOG`, falling back to
/// `default_filter` when the environment does not set one.
///
/// Calling this more than once is harmless; later calls leave the existing
/// subscriber in place. Applications with their own subscriber setup should
/// skip this entirely.
pub fn init(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// [`init`] with the orchestrator's usual default of `info`.
pub fn init_default() {
    init("info");
}
