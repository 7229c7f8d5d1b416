//! Collaborator seams between the orchestrator and the managed fleet.
//!
//! Orchestration logic never talks HTTP or the filesystem directly; it goes
//! through the traits in this module. Production wiring uses the `Http*`
//! implementations, tests substitute in-memory fakes.

mod artifact;
mod marker;
mod process;
mod reader;

use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

pub use artifact::{ArtifactInstaller, ArtifactResolver, ArtifactSource, LocalArtifactResolver, checksum};
pub use marker::{HttpMarkerStore, MarkerStore, MemoryMarkerStore, StepRecord, marker_node};
pub use process::{DetachedProcess, ProcessController};
pub use reader::{HttpStateReader, StateReader};

/// Bundles the collaborator handles used to reach one fleet.
#[derive(Clone)]
pub struct InstanceSync {
    pub reader: Arc<dyn StateReader>,
    pub markers: Arc<dyn MarkerStore>,
    pub process: Arc<dyn ProcessController>,
}

impl InstanceSync {
    pub fn new(
        reader: Arc<dyn StateReader>,
        markers: Arc<dyn MarkerStore>,
        process: Arc<dyn ProcessController>,
    ) -> Self {
        Self {
            reader,
            markers,
            process,
        }
    }
}

impl fmt::Debug for InstanceSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceSync")
            .field("reader", &type_name_of_val(self.reader.as_ref()))
            .field("markers", &type_name_of_val(self.markers.as_ref()))
            .field("process", &type_name_of_val(self.process.as_ref()))
            .finish()
    }
}
