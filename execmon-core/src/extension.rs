//! Context-menu and double-click extensions
//!
//! Views expose operations on whatever entity the user is pointing at by
//! looking actions up here. The registry only keeps the bookkeeping; all side
//! effects live in the callbacks.

use crate::error::{ActionError, ActionResult};
use crate::model::Core;
use execmon_types::{ActionId, ReactorName, Tick, TokenKey, ViewKind};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Entity under the cursor when an action fires
#[derive(Debug, Clone)]
pub enum ActionContext {
    /// Timeline rows and conflict entries
    TickReactor { tick: Tick, reactor: ReactorName },
    /// Tokens shown by graph and timeline views
    CoreToken { core: Arc<Core>, token: TokenKey },
}

impl ActionContext {
    pub fn tick_reactor(tick: Tick, reactor: impl Into<ReactorName>) -> Self {
        ActionContext::TickReactor {
            tick,
            reactor: reactor.into(),
        }
    }

    pub fn core_token(core: Arc<Core>, token: impl Into<TokenKey>) -> Self {
        ActionContext::CoreToken {
            core,
            token: token.into(),
        }
    }

    /// Unpack a `(core, token)` context for `action`
    pub fn as_core_token(&self, action: &ActionId) -> ActionResult<(&Arc<Core>, &TokenKey)> {
        match self {
            ActionContext::CoreToken { core, token } => Ok((core, token)),
            _ => Err(ActionError::WrongContext {
                action: action.to_string(),
                expected: "core and token",
            }),
        }
    }

    /// Unpack a `(tick, reactor)` context for `action`
    pub fn as_tick_reactor(&self, action: &ActionId) -> ActionResult<(Tick, &ReactorName)> {
        match self {
            ActionContext::TickReactor { tick, reactor } => Ok((*tick, reactor)),
            _ => Err(ActionError::WrongContext {
                action: action.to_string(),
                expected: "tick and reactor",
            }),
        }
    }
}

/// Callback run by a context extension
pub type ActionFn = dyn Fn(&ActionContext) -> ActionResult<()>;

/// One registered menu action
#[derive(Clone)]
pub struct ContextExtension {
    pub id: ActionId,
    pub label: String,
    callback: Rc<ActionFn>,
}

impl ContextExtension {
    pub fn callback(&self) -> Rc<ActionFn> {
        Rc::clone(&self.callback)
    }
}

impl fmt::Debug for ContextExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextExtension")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

/// Per-view ordered action tables plus one double-click callback per view
#[derive(Default)]
pub struct ContextExtensionRegistry {
    actions: BTreeMap<ViewKind, Vec<ContextExtension>>,
    double_click: BTreeMap<ViewKind, Rc<ActionFn>>,
}

impl fmt::Debug for ContextExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextExtensionRegistry")
            .field("actions", &self.actions)
            .field("double_click", &self.double_click.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ContextExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to a view's menu. Duplicate labels are kept and
    /// offered side by side.
    pub fn register<F>(&mut self, view: ViewKind, id: ActionId, label: &str, callback: F)
    where
        F: Fn(&ActionContext) -> ActionResult<()> + 'static,
    {
        self.register_rc(view, id, label, Rc::new(callback));
    }

    /// Same as `register` for a callback shared with other registrations
    pub fn register_rc(
        &mut self,
        view: ViewKind,
        id: ActionId,
        label: &str,
        callback: Rc<ActionFn>,
    ) {
        tracing::debug!(view = %view, action = %id, label, "context extension registered");
        self.actions.entry(view).or_default().push(ContextExtension {
            id,
            label: label.to_string(),
            callback,
        });
    }

    /// Menu entries for a view, in registration order
    pub fn actions(&self, view: ViewKind) -> &[ContextExtension] {
        self.actions.get(&view).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Callback of the first action registered under `id`
    pub fn callback(&self, view: ViewKind, id: &ActionId) -> ActionResult<Rc<ActionFn>> {
        self.actions(view)
            .iter()
            .find(|ext| &ext.id == id)
            .map(ContextExtension::callback)
            .ok_or_else(|| ActionError::UnknownAction {
                view,
                action: id.to_string(),
            })
    }

    /// Callback of the first action displayed as `label`
    pub fn callback_by_label(&self, view: ViewKind, label: &str) -> ActionResult<Rc<ActionFn>> {
        self.actions(view)
            .iter()
            .find(|ext| ext.label == label)
            .map(ContextExtension::callback)
            .ok_or_else(|| ActionError::UnknownAction {
                view,
                action: label.to_string(),
            })
    }

    pub fn invoke(
        &self,
        view: ViewKind,
        id: &ActionId,
        context: &ActionContext,
    ) -> ActionResult<()> {
        let callback = self.callback(view, id)?;
        callback(context)
    }

    pub fn invoke_label(
        &self,
        view: ViewKind,
        label: &str,
        context: &ActionContext,
    ) -> ActionResult<()> {
        let callback = self.callback_by_label(view, label)?;
        callback(context)
    }

    /// Install the double-click callback for a view, replacing any earlier
    /// one. Returns whether a callback was replaced.
    pub fn register_double_click<F>(&mut self, view: ViewKind, callback: F) -> bool
    where
        F: Fn(&ActionContext) -> ActionResult<()> + 'static,
    {
        self.register_double_click_rc(view, Rc::new(callback))
    }

    pub fn register_double_click_rc(&mut self, view: ViewKind, callback: Rc<ActionFn>) -> bool {
        let replaced = self.double_click.insert(view, callback).is_some();
        if replaced {
            tracing::debug!(view = %view, "double-click callback replaced");
        }
        replaced
    }

    pub fn double_click_callback(&self, view: ViewKind) -> Option<Rc<ActionFn>> {
        self.double_click.get(&view).cloned()
    }

    /// Deliver a double-click. Returns `false` when the view has no callback.
    pub fn double_click(&self, view: ViewKind, context: &ActionContext) -> ActionResult<bool> {
        match self.double_click_callback(view) {
            Some(callback) => callback(context).map(|_| true),
            None => Ok(false),
        }
    }
}
