//! Init/shutdown cycling of the application context

mod common;

use common::{fake_app, log, test_config, Recorder};
use proptest::prelude::*;
use tessera::{AppError, Application, ToplevelOptions};

#[test]
fn shutdown_returns_to_fresh_state() {
    let baseline = Application::new(test_config()).state_snapshot();
    let (mut app, _handle) = fake_app();
    assert_ne!(app.state_snapshot(), baseline);

    app.shutdown();
    assert_eq!(app.state_snapshot(), baseline);
}

#[test]
fn shutdown_clears_stack_grab_and_popover() {
    let (mut app, _handle) = fake_app();
    let log = log();
    let top = app.add_toplevel(Recorder::new("top", &log), ToplevelOptions::new("top"));
    let popover = app.add_view(Recorder::new("pop", &log));
    let _state = app.begin(top).unwrap();
    app.grab_mouse(top).unwrap();
    app.set_popover(Some(popover)).unwrap();
    app.events.iteration.subscribe(|_| {});

    app.shutdown();

    let snapshot = app.state_snapshot();
    assert!(snapshot.toplevels.is_empty());
    assert_eq!(snapshot.mouse_grab_view, None);
    assert_eq!(snapshot.popover, None);
    assert_eq!(snapshot.subscribers, 0);
    assert!(!app.views().toplevel(top).unwrap().running);
}

#[test]
fn operations_after_shutdown_report_not_initialized() {
    let (mut app, _handle) = fake_app();
    app.shutdown();

    let log = log();
    let top = app.add_toplevel(Recorder::new("top", &log), ToplevelOptions::new("top"));
    assert!(matches!(app.begin(top), Err(AppError::NotInitialized)));
    assert!(matches!(
        app.add_idle(|_| false),
        Err(AppError::NotInitialized)
    ));
    assert!(matches!(app.refresh(), Ok(())));
}

#[test]
fn context_can_be_reinitialized() {
    let (mut app, _handle) = fake_app();
    app.shutdown();
    app.init(None, Some("fake")).unwrap();
    assert!(app.is_initialized());
    assert_eq!(app.driver().map(|d| d.name()), Some("fake"));
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Init,
    Shutdown,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Init), Just(Op::Shutdown)]
}

proptest! {
    /// Any sequence of init and shutdown leaves the context either freshly
    /// initialized or exactly as `new` built it.
    #[test]
    fn init_shutdown_sequences_are_idempotent(ops in prop::collection::vec(op(), 1..12)) {
        let baseline = Application::new(test_config()).state_snapshot();
        let mut app = Application::new(test_config());
        let mut initialized_snapshot = None;

        for op in ops {
            match op {
                Op::Init => {
                    app.init(None, Some("fake")).unwrap();
                    prop_assert!(app.is_initialized());
                    let snapshot = app.state_snapshot();
                    match &initialized_snapshot {
                        Some(expected) => prop_assert_eq!(&snapshot, expected),
                        None => initialized_snapshot = Some(snapshot),
                    }
                }
                Op::Shutdown => {
                    app.shutdown();
                    prop_assert!(!app.is_initialized());
                    prop_assert_eq!(app.state_snapshot(), baseline.clone());
                }
            }
        }
    }
}
