//! Trace reader window: tick entry, go action and update fan-out.

use super::Shared;
use crate::error::{ActionError, ActionResult, DispatchError, TraceError};
use crate::listener::{DispatchPolicy, EntitySetRegistry, EntityUpdate};
use crate::model::EntitySet;
use crate::trace::TraceReader;
use execmon_types::{ReactorName, Tick};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Trace reader surface: a tick entry, a go action and the registry that
/// fans loaded entity sets out to the other views
pub struct DbReaderView {
    reader: Box<dyn TraceReader>,
    tick_text: String,
    tick_width: usize,
    selected_reactor: Option<ReactorName>,
    current: Option<Arc<EntitySet>>,
    listeners: EntitySetRegistry,
}

impl fmt::Debug for DbReaderView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbReaderView")
            .field("tick_text", &self.tick_text)
            .field("selected_reactor", &self.selected_reactor)
            .field("current", &self.current.as_ref().map(|set| set.tick()))
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl DbReaderView {
    pub fn new(reader: Box<dyn TraceReader>, tick_width: usize, policy: DispatchPolicy) -> Self {
        Self {
            reader,
            tick_text: String::new(),
            tick_width,
            selected_reactor: None,
            current: None,
            listeners: EntitySetRegistry::with_policy(policy),
        }
    }

    pub fn format_tick(&self, tick: Tick) -> String {
        tick.format(self.tick_width)
    }

    pub fn tick_text(&self) -> &str {
        &self.tick_text
    }

    /// Replace the tick entry contents without loading anything
    pub fn set_tick_text(&mut self, text: &str) {
        self.tick_text = text.to_string();
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick_text = self.format_tick(tick);
    }

    /// Reactor to mark active in the next loaded set, when present there
    pub fn select_reactor(&mut self, reactor: Option<ReactorName>) {
        self.selected_reactor = reactor;
    }

    pub fn selected_reactor(&self) -> Option<&ReactorName> {
        self.selected_reactor.as_ref()
    }

    /// Most recently loaded set
    pub fn current(&self) -> Option<&Arc<EntitySet>> {
        self.current.as_ref()
    }

    pub fn ticks(&self) -> Vec<Tick> {
        self.reader.ticks()
    }

    pub fn first_tick(&self) -> Option<Tick> {
        self.reader.first_tick()
    }

    /// First recorded tick after the loaded one
    pub fn next_tick(&self) -> Option<Tick> {
        let after = self.current.as_ref().map(|set| set.tick());
        self.reader
            .ticks()
            .into_iter()
            .find(|tick| after.map_or(true, |current| *tick > current))
    }

    /// Last recorded tick before the loaded one
    pub fn previous_tick(&self) -> Option<Tick> {
        let current = self.current.as_ref()?.tick();
        self.reader
            .ticks()
            .into_iter()
            .rev()
            .find(|tick| *tick < current)
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.reader.log_path()
    }

    pub fn listeners(&self) -> &EntitySetRegistry {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut EntitySetRegistry {
        &mut self.listeners
    }

    /// Validate the tick entry and query the trace, making the result
    /// current without telling any listener
    ///
    /// On a bad entry or a failed query nothing changes.
    pub fn load(&mut self) -> ActionResult<Arc<EntitySet>> {
        let Some(tick) = Tick::parse(&self.tick_text) else {
            tracing::warn!(entry = %self.tick_text, "invalid tick entry");
            return Err(TraceError::InvalidTick(self.tick_text.clone()).into());
        };

        let set = match self.reader.query_at_tick(tick) {
            Ok(set) => set,
            Err(err) => {
                tracing::warn!(tick = %tick, error = %err, "trace query failed");
                return Err(ActionError::Trace(err));
            }
        };

        let active = self
            .selected_reactor
            .clone()
            .filter(|reactor| set.get(reactor).is_some())
            .or_else(|| set.reactor_names().next().cloned());
        let set = Arc::new(set.with_active(active));

        self.tick_text = self.format_tick(tick);
        self.current = Some(Arc::clone(&set));
        tracing::info!(tick = %tick, reactors = set.len(), "entity set loaded");
        Ok(set)
    }

    /// Press go: load the tick entry, then publish the set to every
    /// listener once `view` is no longer borrowed
    ///
    /// On a bad entry or a failed query the previous set stays current and
    /// no listener runs. Pressing go from inside a listener is refused.
    pub fn go(view: &Shared<Self>) -> ActionResult<Arc<EntitySet>> {
        let (set, listeners) = {
            let mut view = view.borrow_mut();
            if view.listeners.is_dispatching() {
                return Err(DispatchError::Reentrant.into());
            }
            let set = view.load()?;
            (set, view.listeners.clone())
        };
        listeners.publish_update(&EntityUpdate::new(Arc::clone(&set)))?;
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Assembly, Core};
    use crate::trace::MemoryTrace;
    use crate::views::shared;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn reader_view() -> DbReaderView {
        let trace = MemoryTrace::new()
            .with_core(Core::new(Tick(3), Assembly::new("exec")))
            .with_core(Core::new(Tick(3), Assembly::new("nav")))
            .with_core(Core::new(Tick(8), Assembly::new("nav")));
        DbReaderView::new(Box::new(trace), 6, DispatchPolicy::FailFast)
    }

    #[test]
    fn test_go_publishes_and_formats_entry() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let view = shared(reader_view());
        {
            let seen = Rc::clone(&seen);
            view.borrow_mut()
                .listeners_mut()
                .register(move |update: &EntityUpdate| {
                    seen.borrow_mut()
                        .push((update.set.tick(), update.active.clone()));
                    Ok(())
                });
        }

        view.borrow_mut().set_tick_text(" 3");
        let set = DbReaderView::go(&view).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(view.borrow().tick_text(), "000003");
        assert_eq!(
            *seen.borrow(),
            vec![(Tick(3), Some(ReactorName::new("exec")))]
        );
    }

    #[test]
    fn test_selected_reactor_becomes_active() {
        let mut view = reader_view();
        view.select_reactor(Some(ReactorName::new("nav")));
        view.set_tick(Tick(3));
        let set = view.load().unwrap();
        assert_eq!(set.active(), Some(&ReactorName::new("nav")));
    }

    #[test]
    fn test_failed_go_keeps_previous_state() {
        let calls = Rc::new(RefCell::new(0));
        let view = shared(reader_view());
        {
            let calls = Rc::clone(&calls);
            view.borrow_mut().listeners_mut().register(move |_| {
                *calls.borrow_mut() += 1;
                Ok(())
            });
        }
        view.borrow_mut().set_tick(Tick(8));
        DbReaderView::go(&view).unwrap();

        view.borrow_mut().set_tick_text("abc");
        assert!(matches!(
            DbReaderView::go(&view),
            Err(ActionError::Trace(TraceError::InvalidTick(_)))
        ));
        view.borrow_mut().set_tick_text("5");
        assert!(matches!(
            DbReaderView::go(&view),
            Err(ActionError::Trace(TraceError::TickOutOfRange(Tick(5))))
        ));

        assert_eq!(view.borrow().current().unwrap().tick(), Tick(8));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_listeners_can_read_the_reader() {
        let view = shared(reader_view());
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let reader = Rc::downgrade(&view);
            let seen = Rc::clone(&seen);
            view.borrow_mut().listeners_mut().register(move |_| {
                if let Some(view) = reader.upgrade() {
                    seen.borrow_mut().push(view.borrow().tick_text().to_string());
                }
                Ok(())
            });
        }

        view.borrow_mut().set_tick(Tick(8));
        DbReaderView::go(&view).unwrap();
        assert_eq!(*seen.borrow(), vec!["000008"]);
    }

    #[test]
    fn test_go_from_a_listener_is_refused() {
        let view = shared(reader_view());
        let inner = Rc::new(RefCell::new(None));
        {
            let reader = Rc::downgrade(&view);
            let inner = Rc::clone(&inner);
            view.borrow_mut().listeners_mut().register(move |_| {
                if let Some(view) = reader.upgrade() {
                    *inner.borrow_mut() = Some(matches!(
                        DbReaderView::go(&view),
                        Err(ActionError::Dispatch(DispatchError::Reentrant))
                    ));
                }
                Ok(())
            });
        }

        view.borrow_mut().set_tick(Tick(3));
        DbReaderView::go(&view).unwrap();
        assert_eq!(*inner.borrow(), Some(true));
        assert_eq!(view.borrow().current().unwrap().tick(), Tick(3));
    }

    #[test]
    fn test_tick_stepping() {
        let mut view = reader_view();
        assert_eq!(view.next_tick(), Some(Tick(3)));
        assert_eq!(view.previous_tick(), None);

        view.set_tick(Tick(3));
        view.load().unwrap();
        assert_eq!(view.next_tick(), Some(Tick(8)));
        assert_eq!(view.previous_tick(), None);

        view.set_tick(Tick(8));
        view.load().unwrap();
        assert_eq!(view.next_tick(), None);
        assert_eq!(view.previous_tick(), Some(Tick(3)));
    }
}
