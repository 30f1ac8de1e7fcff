//! Per-reactor timeline of the loaded tick.

use crate::error::{ActionError, ActionResult};
use crate::extension::ActionContext;
use crate::listener::EntityUpdate;
use crate::model::{Core, EntitySet};
use execmon_types::{ReactorName, Tick, TokenKey};
use std::fmt::Write;
use std::sync::Arc;

/// One token row of the visible reactor's timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    pub timeline: String,
    pub predicate: String,
    pub key: TokenKey,
}

/// Per-reactor timeline of tokens at the loaded tick
#[derive(Debug, Default)]
pub struct TimelineView {
    entity_set: Arc<EntitySet>,
    visible_reactor: Option<ReactorName>,
}

impl TimelineView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a new entity set. The visible reactor follows the update's
    /// active reactor.
    pub fn set_entity_sets(&mut self, update: &EntityUpdate) {
        self.entity_set = Arc::clone(&update.set);
        self.visible_reactor = update
            .active
            .clone()
            .or_else(|| self.entity_set.reactor_names().next().cloned());
        tracing::debug!(
            tick = %self.entity_set.tick(),
            visible = ?self.visible_reactor,
            "timeline updated"
        );
    }

    pub fn entity_sets(&self) -> &Arc<EntitySet> {
        &self.entity_set
    }

    pub fn tick(&self) -> Tick {
        self.entity_set.tick()
    }

    pub fn visible_reactor(&self) -> Option<&ReactorName> {
        self.visible_reactor.as_ref()
    }

    /// Show `reactor`'s timeline; it must be in the current set
    pub fn set_visible_reactor(&mut self, reactor: &ReactorName) -> ActionResult<()> {
        if self.entity_set.get(reactor).is_none() {
            return Err(ActionError::UnknownReactor(reactor.clone()));
        }
        self.visible_reactor = Some(reactor.clone());
        Ok(())
    }

    pub fn visible_core(&self) -> Option<&Arc<Core>> {
        self.visible_reactor
            .as_ref()
            .and_then(|reactor| self.entity_set.get(reactor))
    }

    /// Token rows grouped by timeline, then by key
    pub fn rows(&self) -> Vec<TimelineRow> {
        let Some(core) = self.visible_core() else {
            return Vec::new();
        };
        let mut rows: Vec<TimelineRow> = core
            .assembly
            .tokens()
            .map(|token| TimelineRow {
                timeline: token.timeline.clone(),
                predicate: token.predicate.clone(),
                key: token.key.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.timeline.cmp(&b.timeline).then_with(|| a.key.cmp(&b.key)));
        rows
    }

    /// Context for an action on a token of `reactor` in the loaded set
    pub fn token_context(&self, reactor: &ReactorName, key: &TokenKey) -> ActionResult<ActionContext> {
        let core = self
            .entity_set
            .get(reactor)
            .ok_or_else(|| ActionError::UnknownReactor(reactor.clone()))?;
        Ok(ActionContext::core_token(Arc::clone(core), key.clone()))
    }

    /// Plain-text rendering of the visible timeline
    pub fn render(&self, tick_width: usize) -> String {
        let mut out = String::new();
        let Some(reactor) = &self.visible_reactor else {
            let _ = writeln!(out, "(no reactor)");
            return out;
        };
        let _ = writeln!(out, "{} @ {}", reactor, self.tick().format(tick_width));
        let mut current_timeline: Option<&str> = None;
        let rows = self.rows();
        for row in &rows {
            if current_timeline != Some(row.timeline.as_str()) {
                let _ = writeln!(out, "  [{}]", row.timeline);
                current_timeline = Some(row.timeline.as_str());
            }
            let _ = writeln!(out, "    {} {}", row.key, row.predicate);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Assembly, Token};

    fn update(active: Option<&str>) -> EntityUpdate {
        let nav = Core::new(
            Tick(12),
            Assembly::with_tokens(
                "nav",
                [
                    Token::new("T2").with_predicate("Navigator", "At"),
                    Token::new("T1").with_predicate("Navigator", "Going"),
                    Token::new("T3").with_predicate("Battery", "Charging"),
                ],
            ),
        );
        let exec = Core::new(Tick(12), Assembly::new("exec"));
        let set = EntitySet::from_cores(Tick(12), [Arc::new(nav), Arc::new(exec)])
            .with_active(active.map(ReactorName::new));
        EntityUpdate::new(Arc::new(set))
    }

    #[test]
    fn test_visible_reactor_follows_update() {
        let mut view = TimelineView::new();
        view.set_entity_sets(&update(Some("nav")));
        assert_eq!(view.visible_reactor(), Some(&ReactorName::new("nav")));

        view.set_entity_sets(&update(None));
        assert_eq!(view.visible_reactor(), Some(&ReactorName::new("exec")));
    }

    #[test]
    fn test_set_visible_reactor_requires_known_reactor() {
        let mut view = TimelineView::new();
        view.set_entity_sets(&update(None));
        view.set_visible_reactor(&ReactorName::new("nav")).unwrap();
        let err = view
            .set_visible_reactor(&ReactorName::new("ghost"))
            .unwrap_err();
        assert!(matches!(err, ActionError::UnknownReactor(_)));
        assert_eq!(view.visible_reactor(), Some(&ReactorName::new("nav")));
    }

    #[test]
    fn test_render() {
        let mut view = TimelineView::new();
        view.set_entity_sets(&update(Some("nav")));
        insta::assert_snapshot!(view.render(6), @r"
        nav @ 000012
          [Battery]
            T3 Charging
          [Navigator]
            T1 Going
            T2 At
        ");
    }

    #[test]
    fn test_token_context() {
        let mut view = TimelineView::new();
        view.set_entity_sets(&update(Some("nav")));
        let ctx = view
            .token_context(&ReactorName::new("nav"), &TokenKey::new("T1"))
            .unwrap();
        assert!(matches!(ctx, ActionContext::CoreToken { ref token, .. } if token.as_str() == "T1"));
        assert!(view
            .token_context(&ReactorName::new("ghost"), &TokenKey::new("T1"))
            .is_err());
    }
}
