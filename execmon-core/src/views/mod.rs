//! View state for each visualization surface
//!
//! Views hold data and selection only; rendering is left to whatever front
//! end drives them. Each view is shared as an `Rc<RefCell<_>>` so listener
//! and action callbacks can reach it.

mod conflicts;
mod db_reader;
mod inspector;
mod network;
mod timeline;

pub use conflicts::ConflictListView;
pub use db_reader::DbReaderView;
pub use inspector::{InspectorFactory, PropertyInspector};
pub use network::{FilterView, NetworkView};
pub use timeline::{TimelineRow, TimelineView};

use std::cell::RefCell;
use std::rc::Rc;

/// Handle to a view shared between the coordinator and callbacks
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(view: T) -> Shared<T> {
    Rc::new(RefCell::new(view))
}
