//! Listener registry for broadcasting updates between views
//!
//! A source of updates owns one registry; consumers register callbacks and
//! every publish reaches them synchronously, in registration order.

use crate::error::{ActionError, DispatchError};
use crate::model::EntitySet;
use execmon_types::{ReactorName, SourceKey};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Callback invoked for each published event
pub type ListenerFn<E> = dyn Fn(&E) -> Result<(), ActionError>;

/// Handle returned by `register`, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// What happens when a listener returns an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchPolicy {
    /// Stop at the first failing listener and return its error
    #[default]
    FailFast,
    /// Run every listener, then report all failures together
    CollectAndContinue,
}

/// One entity set delivery: the set plus the reactor to focus by default
#[derive(Debug, Clone)]
pub struct EntityUpdate {
    pub set: Arc<EntitySet>,
    pub active: Option<ReactorName>,
}

impl EntityUpdate {
    pub fn new(set: Arc<EntitySet>) -> Self {
        let active = set.active().cloned();
        Self { set, active }
    }

    /// The update as seen by a listener keyed on `source`. Reactor-keyed
    /// listeners receive only their reactor's core and nothing when that
    /// reactor is absent.
    pub fn routed(&self, source: &SourceKey) -> Option<EntityUpdate> {
        match source {
            SourceKey::All => Some(self.clone()),
            SourceKey::Reactor(name) => self.set.get(name).map(|core| EntityUpdate {
                set: Arc::new(EntitySet::single(Arc::clone(core))),
                active: Some(name.clone()),
            }),
        }
    }
}

struct Listener<E> {
    id: ListenerId,
    source: SourceKey,
    callback: Rc<ListenerFn<E>>,
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            source: self.source.clone(),
            callback: Rc::clone(&self.callback),
        }
    }
}

/// Ordered one-to-many notification channel
///
/// Publishing from inside one of this registry's own listeners is refused
/// with `DispatchError::Reentrant`.
pub struct ListenerRegistry<E> {
    listeners: Vec<Listener<E>>,
    next_id: u64,
    policy: DispatchPolicy,
    dispatching: Rc<Cell<bool>>,
}

/// A clone is a snapshot of the current listeners. It shares the original's
/// dispatch guard, so it can be published after the owning view's borrow is
/// released without losing reentrancy detection.
impl<E> Clone for ListenerRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
            next_id: self.next_id,
            policy: self.policy,
            dispatching: Rc::clone(&self.dispatching),
        }
    }
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<E> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
            policy: DispatchPolicy::default(),
            dispatching: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_policy(policy: DispatchPolicy) -> Self {
        Self {
            policy,
            ..Self::new()
        }
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DispatchPolicy) {
        self.policy = policy;
    }

    /// Register a listener for every update
    pub fn register<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&E) -> Result<(), ActionError> + 'static,
    {
        self.register_for(SourceKey::All, callback)
    }

    /// Register a listener under a source key. No deduplication is done:
    /// the same callback registered twice runs twice.
    pub fn register_for<F>(&mut self, source: SourceKey, callback: F) -> ListenerId
    where
        F: Fn(&E) -> Result<(), ActionError> + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            source,
            callback: Rc::new(callback),
        });
        id
    }

    /// Remove a listener. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        before != self.listeners.len()
    }

    /// Source key a listener was registered under
    pub fn source_of(&self, id: ListenerId) -> Option<&SourceKey> {
        self.listeners.iter().find(|l| l.id == id).map(|l| &l.source)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Whether a publish on this registry, or on a clone of it, is running
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Deliver `event` to every listener regardless of source
    pub fn publish(&self, event: &E) -> Result<(), DispatchError> {
        self.dispatch(|_| Some(EventRef::Borrowed(event)))
    }

    /// Deliver `event` to listeners keyed on `source` and to those keyed on
    /// `SourceKey::All`
    pub fn publish_to(&self, source: &SourceKey, event: &E) -> Result<(), DispatchError> {
        self.dispatch(|key| {
            (key == &SourceKey::All || key == source).then_some(EventRef::Borrowed(event))
        })
    }

    /// Deliver a per-source event. `route` maps each listener's source key to
    /// the event it should see; `None` skips that listener.
    pub fn publish_with<R>(&self, route: R) -> Result<(), DispatchError>
    where
        R: Fn(&SourceKey) -> Option<E>,
    {
        self.dispatch(|source| route(source).map(EventRef::Owned))
    }

    fn dispatch<'e, R>(&self, route: R) -> Result<(), DispatchError>
    where
        R: Fn(&SourceKey) -> Option<EventRef<'e, E>>,
        E: 'e,
    {
        if self.dispatching.get() {
            return Err(DispatchError::Reentrant);
        }
        let _guard = DispatchGuard::enter(&self.dispatching);

        // Snapshot so listeners registered mid-dispatch wait for the next publish
        let listeners: Vec<Listener<E>> = self.listeners.clone();
        tracing::debug!(listeners = listeners.len(), "dispatching update");

        let mut failures = Vec::new();
        for listener in &listeners {
            let Some(event) = route(&listener.source) else {
                continue;
            };
            if let Err(err) = (listener.callback)(event.as_ref()) {
                match self.policy {
                    DispatchPolicy::FailFast => {
                        tracing::warn!(listener = ?listener.id, error = %err, "listener failed");
                        return Err(DispatchError::Listener(Box::new(err)));
                    }
                    DispatchPolicy::CollectAndContinue => {
                        tracing::warn!(listener = ?listener.id, error = %err, "listener failed, continuing");
                        failures.push(err);
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Collected(failures))
        }
    }
}

/// Borrowed-or-owned event, so plain publish needs no `E: Clone`
enum EventRef<'e, E> {
    Borrowed(&'e E),
    Owned(E),
}

impl<E> AsRef<E> for EventRef<'_, E> {
    fn as_ref(&self) -> &E {
        match self {
            EventRef::Borrowed(e) => e,
            EventRef::Owned(e) => e,
        }
    }
}

struct DispatchGuard<'a>(&'a Cell<bool>);

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Registry carrying entity set deliveries from the trace reader
pub type EntitySetRegistry = ListenerRegistry<EntityUpdate>;

impl ListenerRegistry<EntityUpdate> {
    /// Publish `update`, narrowing it per listener source key
    pub fn publish_update(&self, update: &EntityUpdate) -> Result<(), DispatchError> {
        self.publish_with(|source| update.routed(source))
    }
}
