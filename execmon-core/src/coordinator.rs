//! Composition root wiring the views together
//!
//! The coordinator owns every view, subscribes the consumers to the reader's
//! registry and installs the cross-view actions. Front ends drive it through
//! the methods below, which mirror what a user can do in each window.

use crate::config::MonitorConfig;
use crate::error::{ActionError, ActionResult, Result};
use crate::extension::{ActionContext, ActionFn, ContextExtensionRegistry};
use crate::filter::exact_key_pattern;
use crate::listener::{EntityUpdate, ListenerId};
use crate::model::EntitySet;
use crate::trace::{LogDirReader, TraceReader};
use crate::views::{
    shared, ConflictListView, DbReaderView, InspectorFactory, NetworkView, Shared, TimelineView,
};
use execmon_types::{ActionId, ReactorName, SourceKey, Tick, TokenKey, ViewKind};
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

const INSPECT_LABEL: &str = "View token properties...";
const HIGHLIGHT_LABEL: &str = "Highlight in token network...";
const JUMP_LABEL: &str = "Jump to tick";

pub struct ViewCoordinator {
    config: MonitorConfig,
    reader: Shared<DbReaderView>,
    timeline: Shared<TimelineView>,
    conflicts: Shared<ConflictListView>,
    network: Shared<NetworkView>,
    inspectors: Shared<InspectorFactory>,
    extensions: ContextExtensionRegistry,
    network_source: SourceKey,
    network_subscription: ListenerId,
}

impl ViewCoordinator {
    /// Open the log directory named by `config` and wire the views to it
    pub fn open(config: MonitorConfig) -> Result<Self> {
        let reader = LogDirReader::open(&config.log_path)?;
        Ok(Self::new(Box::new(reader), config))
    }

    pub fn new(reader: Box<dyn TraceReader>, config: MonitorConfig) -> Self {
        let reader = shared(DbReaderView::new(
            reader,
            config.tick_width,
            config.dispatch_policy,
        ));
        let timeline = shared(TimelineView::new());
        let conflicts = shared(ConflictListView::new());
        let network = shared(NetworkView::with_policy(config.dispatch_policy));
        let inspectors = shared(InspectorFactory::new());

        {
            let mut reader = reader.borrow_mut();
            let listeners = reader.listeners_mut();

            let view = Rc::clone(&timeline);
            listeners.register(move |update: &EntityUpdate| {
                view.borrow_mut().set_entity_sets(update);
                Ok(())
            });

            let view = Rc::clone(&conflicts);
            listeners.register(move |update: &EntityUpdate| {
                view.borrow_mut().set_entity_sets(update);
                Ok(())
            });
        }
        let network_source = config.network_source.clone();
        let network_subscription = subscribe_network(&reader, &network, network_source.clone());

        let open_inspector = open_inspector_action(Rc::clone(&inspectors));
        let highlight = highlight_action(Rc::clone(&network));
        let jump = jump_action(Rc::clone(&reader), Rc::clone(&timeline));

        let mut extensions = ContextExtensionRegistry::new();
        extensions.register_rc(
            ViewKind::Timeline,
            ActionId::OPEN_INSPECTOR,
            INSPECT_LABEL,
            Rc::clone(&open_inspector),
        );
        extensions.register_rc(
            ViewKind::Timeline,
            ActionId::HIGHLIGHT_IN_NETWORK,
            HIGHLIGHT_LABEL,
            Rc::clone(&highlight),
        );
        extensions.register_double_click_rc(ViewKind::Timeline, highlight);
        extensions.register_double_click_rc(ViewKind::TokenNetwork, open_inspector);
        extensions.register_rc(
            ViewKind::ConflictList,
            ActionId::JUMP_TO_TICK,
            JUMP_LABEL,
            Rc::clone(&jump),
        );
        conflicts.borrow_mut().register_activate_callback(jump);

        tracing::debug!(source = %network_source, "views wired");

        Self {
            config,
            reader,
            timeline,
            conflicts,
            network,
            inspectors,
            extensions,
            network_source,
            network_subscription,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Load the configured initial tick, or the first recorded one. Returns
    /// `None` for an empty trace.
    pub fn start(&self) -> Result<Option<Arc<EntitySet>>> {
        let first = self
            .config
            .initial_tick
            .or_else(|| self.reader.borrow().first_tick());
        match first {
            Some(tick) => Ok(Some(self.go_to(tick)?)),
            None => {
                tracing::warn!("trace has no recorded ticks");
                Ok(None)
            }
        }
    }

    /// Type `text` into the tick entry and press go
    pub fn go(&self, text: &str) -> ActionResult<Arc<EntitySet>> {
        self.reader.borrow_mut().set_tick_text(text);
        DbReaderView::go(&self.reader)
    }

    pub fn go_to(&self, tick: Tick) -> ActionResult<Arc<EntitySet>> {
        self.reader.borrow_mut().set_tick(tick);
        DbReaderView::go(&self.reader)
    }

    /// Set and apply the network filter text
    pub fn set_filter(&self, text: &str) -> ActionResult<BTreeSet<TokenKey>> {
        self.network.borrow_mut().filter_mut().set_text(text);
        NetworkView::refilter(&self.network)?;
        Ok(self.visible_nodes())
    }

    pub fn set_use_regex(&self, use_regex: bool) -> ActionResult<BTreeSet<TokenKey>> {
        self.network.borrow_mut().filter_mut().set_use_regex(use_regex);
        NetworkView::refilter(&self.network)?;
        Ok(self.visible_nodes())
    }

    /// Switch network filtering on or off, keeping the pattern
    pub fn set_filter_active(&self, active: bool) -> ActionResult<BTreeSet<TokenKey>> {
        self.network.borrow_mut().filter_mut().set_active(active);
        NetworkView::refilter(&self.network)?;
        Ok(self.visible_nodes())
    }

    pub fn visible_nodes(&self) -> BTreeSet<TokenKey> {
        self.network.borrow().visible().clone()
    }

    /// Run a timeline menu action on a token of the loaded set
    pub fn timeline_action(
        &self,
        action: &ActionId,
        reactor: &ReactorName,
        key: &TokenKey,
    ) -> ActionResult<()> {
        let context = self.timeline.borrow().token_context(reactor, key)?;
        self.extensions.invoke(ViewKind::Timeline, action, &context)
    }

    pub fn highlight(&self, reactor: &ReactorName, key: &TokenKey) -> ActionResult<()> {
        self.timeline_action(&ActionId::HIGHLIGHT_IN_NETWORK, reactor, key)
    }

    pub fn inspect(&self, reactor: &ReactorName, key: &TokenKey) -> ActionResult<()> {
        self.timeline_action(&ActionId::OPEN_INSPECTOR, reactor, key)
    }

    pub fn timeline_double_click(
        &self,
        reactor: &ReactorName,
        key: &TokenKey,
    ) -> ActionResult<bool> {
        let context = self.timeline.borrow().token_context(reactor, key)?;
        self.extensions.double_click(ViewKind::Timeline, &context)
    }

    pub fn network_double_click(&self, key: &TokenKey) -> ActionResult<bool> {
        let context = self.network.borrow().node_context(key)?;
        self.extensions.double_click(ViewKind::TokenNetwork, &context)
    }

    /// Move every view to `tick` with `reactor` shown in the timeline
    pub fn jump(&self, tick: Tick, reactor: &ReactorName) -> ActionResult<()> {
        let context = ActionContext::tick_reactor(tick, reactor.clone());
        self.extensions
            .invoke(ViewKind::ConflictList, &ActionId::JUMP_TO_TICK, &context)
    }

    /// Activate entry `index` of the conflict list
    pub fn activate_conflict(&self, index: usize) -> ActionResult<bool> {
        ConflictListView::activate(&self.conflicts, index)
    }

    /// Resubscribe the token network under another source key
    pub fn select_network_source(&mut self, source: SourceKey) {
        if source == self.network_source {
            return;
        }
        self.reader
            .borrow_mut()
            .listeners_mut()
            .unregister(self.network_subscription);
        self.network_subscription = subscribe_network(&self.reader, &self.network, source.clone());
        tracing::info!(source = %source, "token network source changed");
        self.network_source = source;
    }

    pub fn network_source(&self) -> &SourceKey {
        &self.network_source
    }

    pub fn reader(&self) -> &Shared<DbReaderView> {
        &self.reader
    }

    pub fn timeline(&self) -> &Shared<TimelineView> {
        &self.timeline
    }

    pub fn conflicts(&self) -> &Shared<ConflictListView> {
        &self.conflicts
    }

    pub fn network(&self) -> &Shared<NetworkView> {
        &self.network
    }

    pub fn inspectors(&self) -> &Shared<InspectorFactory> {
        &self.inspectors
    }

    pub fn extensions(&self) -> &ContextExtensionRegistry {
        &self.extensions
    }

    /// For embedders adding their own menu actions
    pub fn extensions_mut(&mut self) -> &mut ContextExtensionRegistry {
        &mut self.extensions
    }
}

fn subscribe_network(
    reader: &Shared<DbReaderView>,
    network: &Shared<NetworkView>,
    source: SourceKey,
) -> ListenerId {
    let view = Rc::clone(network);
    reader
        .borrow_mut()
        .listeners_mut()
        .register_for(source, move |update: &EntityUpdate| {
            NetworkView::update(&view, update).map_err(ActionError::from)
        })
}

/// Open a property inspector on `(core, token)`
fn open_inspector_action(inspectors: Shared<InspectorFactory>) -> Rc<ActionFn> {
    Rc::new(move |context: &ActionContext| -> ActionResult<()> {
        let (core, key) = context.as_core_token(&ActionId::OPEN_INSPECTOR)?;
        inspectors.borrow_mut().open(Arc::clone(core), key)?;
        Ok(())
    })
}

/// Narrow the network to the token's core, filter on its exact key and
/// bring the network forward
fn highlight_action(network: Shared<NetworkView>) -> Rc<ActionFn> {
    Rc::new(move |context: &ActionContext| -> ActionResult<()> {
        let (core, key) = context.as_core_token(&ActionId::HIGHLIGHT_IN_NETWORK)?;
        let update = EntityUpdate::new(Arc::new(EntitySet::single(Arc::clone(core))));
        NetworkView::update(&network, &update)?;
        {
            let mut view = network.borrow_mut();
            view.filter_mut().set_text(&exact_key_pattern(key.as_str()));
            view.filter_mut().set_use_regex(true);
        }
        NetworkView::refilter(&network)?;
        network.borrow_mut().present();
        tracing::info!(reactor = %core.reactor_name, token = %key, "highlighted in token network");
        Ok(())
    })
}

/// Load `tick` and show `reactor` in the timeline
fn jump_action(reader: Shared<DbReaderView>, timeline: Shared<TimelineView>) -> Rc<ActionFn> {
    Rc::new(move |context: &ActionContext| -> ActionResult<()> {
        let (tick, reactor) = context.as_tick_reactor(&ActionId::JUMP_TO_TICK)?;
        {
            let mut reader = reader.borrow_mut();
            reader.set_tick(tick);
            reader.select_reactor(Some(reactor.clone()));
        }
        DbReaderView::go(&reader)?;
        timeline.borrow_mut().set_visible_reactor(reactor)?;
        tracing::info!(tick = %tick, reactor = %reactor, "jumped to tick");
        Ok(())
    })
}
