//! Trace reader boundary
//!
//! The trace database is an external collaborator; the core only needs to
//! ask it for the entity set recorded at a tick. Two readers ship with the
//! crate: an in-memory one and one backed by a log directory.

mod log_dir;

pub use log_dir::{write_core, AssemblySnapshot, ConflictRecord, LogDirReader, SNAPSHOT_SUFFIX};

use crate::error::TraceError;
use crate::model::{Core, EntitySet};
use execmon_types::Tick;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Read-only query-by-tick access to a recorded trace
pub trait TraceReader {
    /// Entity set recorded at `tick`, or `TickOutOfRange` when there is none
    fn query_at_tick(&self, tick: Tick) -> Result<EntitySet, TraceError>;

    /// Ticks with data, ascending
    fn ticks(&self) -> Vec<Tick>;

    fn first_tick(&self) -> Option<Tick> {
        self.ticks().into_iter().next()
    }

    fn log_path(&self) -> Option<&Path> {
        None
    }
}

/// Trace held entirely in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryTrace {
    frames: BTreeMap<Tick, Vec<Arc<Core>>>,
}

impl MemoryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a core at its own tick. A second core for the same reactor and
    /// tick replaces the first.
    pub fn insert(&mut self, core: Core) {
        let frame = self.frames.entry(core.tick).or_default();
        frame.retain(|existing| existing.reactor_name != core.reactor_name);
        frame.push(Arc::new(core));
    }

    pub fn with_core(mut self, core: Core) -> Self {
        self.insert(core);
        self
    }
}

impl TraceReader for MemoryTrace {
    fn query_at_tick(&self, tick: Tick) -> Result<EntitySet, TraceError> {
        let cores = self
            .frames
            .get(&tick)
            .ok_or(TraceError::TickOutOfRange(tick))?;
        Ok(EntitySet::from_cores(tick, cores.iter().cloned()))
    }

    fn ticks(&self) -> Vec<Tick> {
        self.frames.keys().copied().collect()
    }
}
