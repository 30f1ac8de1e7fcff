//! # execmon-core
//!
//! Cross-view synchronization core for the execution monitor.
//!
//! This crate holds the entity model shared by the monitor's views, the
//! listener and context-extension registries that connect them, the token
//! network and its filter, the trace readers, and the coordinator that wires
//! everything together.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extension;
pub mod filter;
pub mod listener;
pub mod model;
pub mod network;
pub mod trace;
pub mod views;

pub use config::{ConfigError, MonitorConfig};
pub use coordinator::ViewCoordinator;
pub use error::{
    ActionError, ActionResult, DispatchError, ModelError, MonitorError, PatternError, Result,
    TraceError,
};
pub use extension::{ActionContext, ActionFn, ContextExtension, ContextExtensionRegistry};
pub use filter::{exact_key_pattern, FilterEngine};
pub use listener::{
    DispatchPolicy, EntitySetRegistry, EntityUpdate, ListenerFn, ListenerId, ListenerRegistry,
};
pub use model::{Assembly, Conflict, Core, EntitySet, Token};
pub use network::{Edge, NetworkEvent, TokenNetwork};
pub use trace::{LogDirReader, MemoryTrace, TraceReader};
pub use views::{
    ConflictListView, DbReaderView, FilterView, InspectorFactory, NetworkView, PropertyInspector,
    Shared, TimelineRow, TimelineView,
};

pub use execmon_types::{ActionId, ReactorName, SourceKey, Tick, TokenKey, ViewKind};
