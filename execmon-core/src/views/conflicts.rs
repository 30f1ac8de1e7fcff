//! Conflict list with jump-on-activate.

use super::Shared;
use crate::error::ActionResult;
use crate::extension::{ActionContext, ActionFn};
use crate::listener::EntityUpdate;
use crate::model::Conflict;
use std::fmt::{self, Write};
use std::rc::Rc;

/// Flat list of the conflicts recorded at the loaded tick
#[derive(Default)]
pub struct ConflictListView {
    conflicts: Vec<Conflict>,
    on_activate: Option<Rc<ActionFn>>,
}

impl fmt::Debug for ConflictListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictListView")
            .field("conflicts", &self.conflicts)
            .field("on_activate", &self.on_activate.is_some())
            .finish()
    }
}

impl ConflictListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entity_sets(&mut self, update: &EntityUpdate) {
        self.conflicts = update.set.conflicts().cloned().collect();
        tracing::debug!(conflicts = self.conflicts.len(), "conflict list updated");
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Callback run with `(tick, reactor)` when an entry is activated.
    /// Replaces any earlier one.
    pub fn register_activate_callback(&mut self, callback: Rc<ActionFn>) {
        self.on_activate = Some(callback);
    }

    /// Activate entry `index`. Returns `false` when there is no such entry
    /// or no callback.
    ///
    /// The view is not borrowed while the callback runs, so the callback may
    /// reload the views, this one included.
    pub fn activate(view: &Shared<ConflictListView>, index: usize) -> ActionResult<bool> {
        let (callback, context) = {
            let this = view.borrow();
            let (Some(callback), Some(conflict)) =
                (this.on_activate.clone(), this.conflicts.get(index))
            else {
                return Ok(false);
            };
            (
                callback,
                ActionContext::tick_reactor(conflict.tick, conflict.reactor.clone()),
            )
        };
        callback(&context)?;
        Ok(true)
    }

    pub fn render(&self, tick_width: usize) -> String {
        let mut out = String::new();
        if self.conflicts.is_empty() {
            let _ = writeln!(out, "(no conflicts)");
            return out;
        }
        for (index, conflict) in self.conflicts.iter().enumerate() {
            let token = conflict
                .token
                .as_ref()
                .map(|key| key.as_str())
                .unwrap_or("-");
            let _ = writeln!(
                out,
                "#{:<3} {}  {:<12} {:<8} {}",
                index,
                conflict.tick.format(tick_width),
                conflict.reactor,
                token,
                conflict.message
            );
        }
        out
    }
}
