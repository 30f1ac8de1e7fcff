//! End-to-end wiring tests for the view coordinator

use execmon_core::trace::write_core;
use execmon_core::{
    ActionContext, ActionError, ActionId, Assembly, Conflict, Core, DispatchPolicy, MemoryTrace,
    MonitorConfig, ReactorName, SourceKey, Tick, Token, TokenKey, ViewCoordinator, ViewKind,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tempfile::tempdir;

fn nav_core(tick: u64) -> Core {
    Core::new(
        Tick(tick),
        Assembly::with_tokens(
            "R1",
            [
                Token::new("T7")
                    .with_predicate("Navigator", "Going")
                    .related_to("T8"),
                Token::new("T8")
                    .with_predicate("Navigator", "At")
                    .related_to("T9"),
                Token::new("T9").with_predicate("Navigator", "Going"),
                Token::new("T70").with_predicate("Battery", "Charging"),
            ],
        ),
    )
    .with_conflicts(vec![Conflict {
        tick: Tick(tick),
        reactor: ReactorName::new("R1"),
        token: Some(TokenKey::new("T9")),
        message: "no compatible slot".into(),
    }])
}

fn exec_core(tick: u64) -> Core {
    Core::new(
        Tick(tick),
        Assembly::with_tokens("R2", [Token::new("G1").related_to("T7")]),
    )
}

fn trace() -> MemoryTrace {
    MemoryTrace::new()
        .with_core(nav_core(10))
        .with_core(exec_core(10))
        .with_core(exec_core(11))
        .with_core(nav_core(12))
}

fn keys(set: &std::collections::BTreeSet<TokenKey>) -> Vec<String> {
    set.iter().map(|k| k.to_string()).collect()
}

#[test]
fn highlight_narrows_network_to_token_core() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    coordinator.start().unwrap();

    // Before the highlight the network spans both reactors
    assert_eq!(coordinator.network().borrow().network().node_count(), 5);

    coordinator
        .highlight(&ReactorName::new("R1"), &TokenKey::new("T7"))
        .unwrap();

    let view = coordinator.network().borrow();
    let network = view.network();
    let reactors: Vec<_> = network
        .entity_sets()
        .reactor_names()
        .map(|r| r.to_string())
        .collect();
    assert_eq!(reactors, vec!["R1"]);
    assert_eq!(network.active_reactor(), Some(&ReactorName::new("R1")));
    assert_eq!(view.filter().engine().pattern(), "^T7$");
    assert!(view.filter().engine().use_regex());
    assert_eq!(keys(view.visible()), vec!["T7", "T8"]);
    assert!(view.is_presented());
}

#[test]
fn timeline_double_click_is_highlight() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    coordinator.start().unwrap();

    let handled = coordinator
        .timeline_double_click(&ReactorName::new("R1"), &TokenKey::new("T8"))
        .unwrap();
    assert!(handled);
    assert_eq!(keys(&coordinator.visible_nodes()), vec!["T7", "T8", "T9"]);
}

#[test]
fn highlight_escapes_regex_metacharacters() {
    let trace = MemoryTrace::new().with_core(Core::new(
        Tick(1),
        Assembly::with_tokens("R1", [Token::new("a.b"), Token::new("axb")]),
    ));
    let coordinator = ViewCoordinator::new(Box::new(trace), MonitorConfig::default());
    coordinator.start().unwrap();
    coordinator
        .highlight(&ReactorName::new("R1"), &TokenKey::new("a.b"))
        .unwrap();
    assert_eq!(keys(&coordinator.visible_nodes()), vec!["a.b"]);
}

#[test]
fn inspector_opens_from_timeline_and_network() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    coordinator.start().unwrap();

    coordinator
        .inspect(&ReactorName::new("R1"), &TokenKey::new("T7"))
        .unwrap();
    assert!(coordinator
        .network_double_click(&TokenKey::new("G1"))
        .unwrap());

    let inspectors = coordinator.inspectors().borrow();
    let opened: Vec<_> = inspectors
        .inspectors()
        .iter()
        .map(|i| (i.reactor().to_string(), i.key().to_string()))
        .collect();
    assert_eq!(
        opened,
        vec![
            ("R1".to_string(), "T7".to_string()),
            ("R2".to_string(), "G1".to_string())
        ]
    );
}

#[test]
fn inspecting_a_missing_token_is_an_error() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    coordinator.start().unwrap();

    let err = coordinator
        .inspect(&ReactorName::new("R2"), &TokenKey::new("T7"))
        .unwrap_err();
    assert!(matches!(err, ActionError::UnknownToken { .. }));
    assert!(coordinator.inspectors().borrow().is_empty());
}

#[test]
fn unknown_action_leaves_views_unchanged() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    coordinator.start().unwrap();
    let before = coordinator.visible_nodes();

    let core = Arc::clone(
        coordinator
            .timeline()
            .borrow()
            .entity_sets()
            .get(&ReactorName::new("R1"))
            .unwrap(),
    );
    let err = coordinator
        .extensions()
        .invoke(
            ViewKind::Timeline,
            &ActionId::new("missing-label"),
            &ActionContext::core_token(core, "T7"),
        )
        .unwrap_err();

    assert!(matches!(err, ActionError::UnknownAction { .. }));
    assert_eq!(coordinator.visible_nodes(), before);
    assert!(!coordinator.network().borrow().is_presented());
}

#[test]
fn conflict_activation_jumps_views() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    coordinator.go("11").unwrap();
    assert!(coordinator.conflicts().borrow().is_empty());

    coordinator.jump(Tick(12), &ReactorName::new("R1")).unwrap();
    assert_eq!(coordinator.reader().borrow().tick_text(), "000012");
    assert_eq!(coordinator.conflicts().borrow().len(), 1);

    coordinator.go("10").unwrap();
    assert_eq!(
        coordinator.timeline().borrow().visible_reactor(),
        Some(&ReactorName::new("R1"))
    );
    assert!(coordinator.activate_conflict(0).unwrap());
    let timeline = coordinator.timeline().borrow();
    assert_eq!(timeline.tick(), Tick(10));
    assert_eq!(timeline.visible_reactor(), Some(&ReactorName::new("R1")));
}

#[test]
fn failed_go_keeps_every_view() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    coordinator.go("12").unwrap();

    assert!(coordinator.go("99").is_err());
    assert!(coordinator.go("twelve").is_err());

    assert_eq!(coordinator.timeline().borrow().tick(), Tick(12));
    assert_eq!(coordinator.network().borrow().network().tick(), Tick(12));
    assert_eq!(
        coordinator.reader().borrow().current().unwrap().tick(),
        Tick(12)
    );
}

#[test]
fn extra_listeners_see_every_update_in_order() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    {
        let seen = Rc::clone(&seen);
        coordinator
            .reader()
            .borrow_mut()
            .listeners_mut()
            .register_for(SourceKey::reactor("R2"), move |update| {
                seen.borrow_mut().push(update.set.tick());
                Ok(())
            });
    }

    for tick in ["10", "11", "12"] {
        coordinator.go(tick).unwrap();
    }
    // R2 has no core at tick 12
    assert_eq!(*seen.borrow(), vec![Tick(10), Tick(11)]);
}

#[test]
fn collect_and_continue_reaches_later_views() {
    let config = MonitorConfig {
        dispatch_policy: DispatchPolicy::CollectAndContinue,
        ..MonitorConfig::default()
    };
    let mut coordinator = ViewCoordinator::new(Box::new(trace()), config);
    coordinator
        .reader()
        .borrow_mut()
        .listeners_mut()
        .register(|_| Err(ActionError::UnknownReactor(ReactorName::new("broken"))));
    // Resubscribing moves the network behind the failing listener
    coordinator.select_network_source(SourceKey::reactor("R1"));

    assert!(coordinator.go("10").is_err());
    assert_eq!(coordinator.timeline().borrow().tick(), Tick(10));
    assert_eq!(coordinator.network().borrow().network().node_count(), 4);
}

#[test]
fn fail_fast_stops_before_later_views() {
    let mut coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    coordinator
        .reader()
        .borrow_mut()
        .listeners_mut()
        .register(|_| Err(ActionError::UnknownReactor(ReactorName::new("broken"))));
    coordinator.select_network_source(SourceKey::reactor("R1"));

    assert!(coordinator.go("10").is_err());
    assert_eq!(coordinator.timeline().borrow().tick(), Tick(10));
    assert_eq!(coordinator.network().borrow().network().node_count(), 0);
}

#[test]
fn log_directory_drives_the_views() {
    let dir = tempdir().unwrap();
    write_core(dir.path(), &nav_core(10)).unwrap();
    write_core(dir.path(), &exec_core(10)).unwrap();

    let coordinator = ViewCoordinator::open(MonitorConfig::for_log_path(dir.path())).unwrap();
    let set = coordinator.start().unwrap().unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(coordinator.conflicts().borrow().len(), 1);

    let timeline = coordinator.timeline().borrow();
    insta::assert_snapshot!(timeline.render(6), @r"
    R1 @ 000010
      [Battery]
        T70 Charging
      [Navigator]
        T7 Going
        T8 At
        T9 Going
    ");
}

#[test]
fn missing_log_directory_fails_to_open() {
    let dir = tempdir().unwrap();
    let result = ViewCoordinator::open(MonitorConfig::for_log_path(dir.path().join("nope")));
    assert!(result.is_err());
}

#[test]
fn network_listeners_can_read_the_view() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    let redraws = Rc::new(RefCell::new(Vec::new()));
    {
        let view = Rc::downgrade(coordinator.network());
        let redraws = Rc::clone(&redraws);
        coordinator
            .network()
            .borrow_mut()
            .register_listener(move |_| {
                if let Some(view) = view.upgrade() {
                    let view = view.borrow();
                    redraws
                        .borrow_mut()
                        .push((view.network().node_count(), view.visible().len()));
                }
                Ok(())
            });
    }

    coordinator.start().unwrap();
    coordinator
        .highlight(&ReactorName::new("R1"), &TokenKey::new("T7"))
        .unwrap();
    coordinator.set_filter("T9").unwrap();

    // Load, highlight rebuild, highlight filter, filter entry
    assert_eq!(*redraws.borrow(), vec![(5, 5), (4, 4), (4, 2), (4, 2)]);
}

#[test]
fn reader_listeners_can_read_every_view() {
    let coordinator = ViewCoordinator::new(Box::new(trace()), MonitorConfig::default());
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let reader = Rc::downgrade(coordinator.reader());
        let timeline = Rc::downgrade(coordinator.timeline());
        let seen = Rc::clone(&seen);
        coordinator
            .reader()
            .borrow_mut()
            .listeners_mut()
            .register(move |_| {
                if let (Some(reader), Some(timeline)) = (reader.upgrade(), timeline.upgrade()) {
                    seen.borrow_mut().push((
                        reader.borrow().tick_text().to_string(),
                        timeline.borrow().tick(),
                    ));
                }
                Ok(())
            });
    }

    coordinator.go("11").unwrap();
    coordinator.jump(Tick(12), &ReactorName::new("R1")).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![
            ("000011".to_string(), Tick(11)),
            ("000012".to_string(), Tick(12))
        ]
    );
}
