//! Token network window and its filter pane.

use super::Shared;
use crate::error::{ActionError, ActionResult, DispatchError, PatternError};
use crate::extension::ActionContext;
use crate::filter::FilterEngine;
use crate::listener::{DispatchPolicy, EntityUpdate, ListenerId, ListenerRegistry};
use crate::network::{NetworkEvent, TokenNetwork};
use execmon_types::TokenKey;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Filter pane of the network window: the entry text and regex toggle as
/// typed, plus the engine they were last applied to
#[derive(Debug, Clone, Default)]
pub struct FilterView {
    entry: String,
    use_regex: bool,
    engine: FilterEngine,
}

impl FilterView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, text: &str) {
        self.entry = text.to_string();
    }

    pub fn text(&self) -> &str {
        &self.entry
    }

    pub fn set_use_regex(&mut self, use_regex: bool) {
        self.use_regex = use_regex;
    }

    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    /// Turn filtering on or off without touching the pattern. Takes effect
    /// on the next apply.
    pub fn set_active(&mut self, active: bool) {
        self.engine.set_active(active);
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_active()
    }

    /// Compile the entry into the engine. On error the engine keeps its
    /// previous pattern.
    pub fn apply(&mut self) -> Result<(), PatternError> {
        self.engine.set_pattern(&self.entry, self.use_regex)
    }
}

/// Token network window state
///
/// The `&mut self` updates return the event they produce instead of
/// publishing it. `update` and `refilter` publish once the view's borrow has
/// been released, so listeners may read the view.
#[derive(Debug, Default)]
pub struct NetworkView {
    network: TokenNetwork,
    filter: FilterView,
    visible: BTreeSet<TokenKey>,
    presented: bool,
    listeners: ListenerRegistry<NetworkEvent>,
}

impl NetworkView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DispatchPolicy) -> Self {
        Self {
            listeners: ListenerRegistry::with_policy(policy),
            ..Self::default()
        }
    }

    pub fn network(&self) -> &TokenNetwork {
        &self.network
    }

    pub fn filter(&self) -> &FilterView {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut FilterView {
        &mut self.filter
    }

    /// Rebuild from an update and recompute visibility under the current
    /// filter
    pub fn set_entity_sets(&mut self, update: &EntityUpdate) -> NetworkEvent {
        let event = self
            .network
            .set_entity_sets(update.set.clone(), update.active.clone());
        self.visible = self.network.apply_filter(self.filter.engine());
        event
    }

    /// Compile the filter entry and recompute visibility. A bad pattern
    /// leaves the visible set as it was.
    pub fn apply_filter(&mut self) -> ActionResult<NetworkEvent> {
        if let Err(err) = self.filter.apply() {
            tracing::warn!(error = %err, "filter not applied");
            return Err(err.into());
        }
        self.visible = self.network.apply_filter(self.filter.engine());
        Ok(NetworkEvent::FilterChanged {
            visible: self.visible.len(),
        })
    }

    /// Rebuild `view` from an update, then notify its listeners
    pub fn update(view: &Shared<Self>, update: &EntityUpdate) -> Result<(), DispatchError> {
        let (event, listeners) = {
            let mut view = view.borrow_mut();
            let event = view.set_entity_sets(update);
            (event, view.listeners.clone())
        };
        listeners.publish(&event)
    }

    /// Apply `view`'s filter entry, then notify its listeners
    pub fn refilter(view: &Shared<Self>) -> ActionResult<()> {
        let (event, listeners) = {
            let mut view = view.borrow_mut();
            let event = view.apply_filter()?;
            (event, view.listeners.clone())
        };
        listeners.publish(&event)?;
        Ok(())
    }

    pub fn visible(&self) -> &BTreeSet<TokenKey> {
        &self.visible
    }

    /// Bring the window forward
    pub fn present(&mut self) {
        self.presented = true;
    }

    pub fn is_presented(&self) -> bool {
        self.presented
    }

    /// Register a view-update listener, run after every rebuild and filter
    /// change
    pub fn register_listener<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&NetworkEvent) -> Result<(), ActionError> + 'static,
    {
        self.listeners.register(callback)
    }

    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    /// Context for an action on node `key`
    pub fn node_context(&self, key: &TokenKey) -> ActionResult<ActionContext> {
        let (core, _) = self
            .network
            .locate(key)
            .ok_or_else(|| ActionError::UnknownNode(key.clone()))?;
        Ok(ActionContext::core_token(core, key.clone()))
    }

    /// Visible nodes with their visible neighbors
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} of {} nodes visible (filter: '{}'{})",
            self.visible.len(),
            self.network.node_count(),
            self.filter.engine().pattern(),
            if self.filter.engine().use_regex() {
                ", regex"
            } else {
                ""
            }
        );
        for key in &self.visible {
            let neighbors: Vec<&str> = self
                .network
                .neighbors(key)
                .filter(|n| self.visible.contains(*n))
                .map(|n| n.as_str())
                .collect();
            if neighbors.is_empty() {
                let _ = writeln!(out, "  {}", key);
            } else {
                let _ = writeln!(out, "  {} -- {}", key, neighbors.join(", "));
            }
        }
        out
    }
}
