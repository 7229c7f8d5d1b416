//! # Steward Core
//!
//! Core library for the Steward fleet orchestrator, driving remote
//! content-repository instances to a stable state and keeping them there.
//!
//! ## Overview
//!
//! `steward-core` covers the four orchestration concerns:
//!
//! - **Availability checking**: grouped checks polled across a fleet until
//!   every instance settles or an elapsed-time ceiling aborts the wait
//! - **Provisioning**: declarative steps performed exactly as often as
//!   their conditions allow, with durable markers and an availability gate
//!   between steps
//! - **Health verification**: parallel HTTP probing of an environment's
//!   endpoints with per-check budgets and a retry envelope
//! - **Reload automation**: filesystem watching that coalesces change
//!   bursts into per-process reloads followed by health verification
//!
//! ## Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`sync`]: collaborator seams (console reader, marker store, process
//!   controller, artifact resolution) with HTTP implementations
//! - [`check`]: the check state machine, its runner, and the await-up /
//!   await-down assemblies
//! - [`provision`]: steps, conditions, and the provisioner
//! - [`health`]: the health checker and its probe seam
//! - [`reload`]: the filesystem-driven reload pipeline
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use steward_core::check::await_up;
//! use steward_core::config::OrchestratorConfig;
//! use steward_core::sync::{DetachedProcess, HttpMarkerStore, HttpStateReader, InstanceSync};
//! use steward_model::Instance;
//!
//! async fn settle(instances: &[Instance]) -> steward_core::Result<bool> {
//!     let config = OrchestratorConfig::default();
//!     let reader = HttpStateReader::new(
//!         config.await_up.connection_timeout(),
//!         config.await_up.component_connection_timeout(),
//!     )?;
//!     let sync = InstanceSync::new(
//!         Arc::new(reader),
//!         Arc::new(HttpMarkerStore::new(&config.provision.path)?),
//!         Arc::new(DetachedProcess),
//!     );
//!     let outcome = await_up(&sync, &config.await_up, instances).await?;
//!     Ok(outcome.stable())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Memoisation shared across one orchestration run
pub mod cache;
/// Availability checks, their runner, and await assemblies
pub mod check;
/// Orchestrator tuning knobs
pub mod config;
/// Error types and error handling utilities
pub mod error;
/// Environment health verification
pub mod health;
/// Tracing subscriber setup for embedding applications
pub mod logging;
/// Glob-style pattern matching used by checks and step filters
pub mod patterns;
/// Provisioning steps and their runner
pub mod provision;
/// Configuration reload automation
pub mod reload;
/// Bounded retry policies
pub mod retry;
/// Collaborator seams towards the managed fleet
pub mod sync;

pub use error::{Result, StewardError};
