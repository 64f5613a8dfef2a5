//! Timers, idle handlers and cross-thread invocation through the application

mod common;

use common::{fake_app, test_config};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tessera::main_loop::{LoopHost, ManualClock};
use tessera::{AppError, Application, Container, FakeDriver, MainLoop, ToplevelOptions, ViewId};

fn app_with_clock() -> (Application, ManualClock) {
    let clock = ManualClock::new();
    let mut app = Application::new(test_config()).with_clock(Arc::new(clock.clone()));
    app.init(Some(Box::new(FakeDriver::new())), None).unwrap();
    (app, clock)
}

fn iterate(app: &mut Application) {
    MainLoop::run_iteration(app).unwrap();
}

#[test]
fn timeouts_fire_in_deadline_order() {
    let (mut app, clock) = app_with_clock();
    let fired = Rc::new(RefCell::new(Vec::new()));
    for (name, ms) in [("late", 30), ("early", 10), ("middle", 20)] {
        let f = fired.clone();
        app.add_timeout(Duration::from_millis(ms), move |_| {
            f.borrow_mut().push(name);
            false
        })
        .unwrap();
    }

    clock.advance(Duration::from_millis(15));
    iterate(&mut app);
    assert_eq!(*fired.borrow(), vec!["early"]);

    clock.advance(Duration::from_millis(20));
    iterate(&mut app);
    assert_eq!(*fired.borrow(), vec!["early", "middle", "late"]);
}

#[test]
fn timeouts_sharing_a_deadline_all_fire_in_insertion_order() {
    let (mut app, clock) = app_with_clock();
    let fired = Rc::new(RefCell::new(Vec::new()));
    for n in 0..3 {
        let f = fired.clone();
        app.add_timeout(Duration::from_millis(5), move |_| {
            f.borrow_mut().push(n);
            false
        })
        .unwrap();
    }

    // equal deadlines are nudged apart by a tick each
    clock.advance(Duration::from_millis(6));
    iterate(&mut app);
    assert_eq!(*fired.borrow(), vec![0, 1, 2]);
}

#[test]
fn repeating_timeout_runs_until_it_returns_false() {
    let (mut app, clock) = app_with_clock();
    let count = Rc::new(RefCell::new(0));
    let c = count.clone();
    app.add_timeout(Duration::from_millis(10), move |_| {
        *c.borrow_mut() += 1;
        *c.borrow() < 3
    })
    .unwrap();

    for _ in 0..5 {
        clock.advance(Duration::from_millis(10));
        iterate(&mut app);
    }
    assert_eq!(*count.borrow(), 3);
}

#[test]
fn counting_timeout_on_real_clock_fires_three_times_then_retires() {
    let (mut app, _handle) = fake_app();
    let count = Rc::new(RefCell::new(0));
    let c = count.clone();
    app.add_timeout(Duration::from_millis(100), move |_| {
        *c.borrow_mut() += 1;
        *c.borrow() < 3
    })
    .unwrap();

    let started = Instant::now();
    // at least 350ms, longer only if a slow machine delayed the third firing
    while started.elapsed() < Duration::from_millis(350)
        || (*count.borrow() < 3 && started.elapsed() < Duration::from_secs(2))
    {
        if app.main_loop().unwrap().events_pending().unwrap() {
            iterate(&mut app);
        }
    }

    assert_eq!(*count.borrow(), 3);
    assert_eq!(app.main_loop().unwrap().scheduler().timeout_count(), 0);
}

#[test]
fn removed_timeout_never_fires() {
    let (mut app, clock) = app_with_clock();
    let fired = Rc::new(RefCell::new(false));
    let f = fired.clone();
    let id = app
        .add_timeout(Duration::from_millis(1), move |_| {
            *f.borrow_mut() = true;
            false
        })
        .unwrap();

    assert!(app.remove_timeout(id));
    assert!(!app.remove_timeout(id));
    clock.advance(Duration::from_millis(5));
    iterate(&mut app);
    assert!(!*fired.borrow());
}

#[test]
fn idle_added_by_idle_waits_for_the_next_iteration() {
    let (mut app, _clock) = app_with_clock();
    let order = Rc::new(RefCell::new(Vec::new()));
    let o = order.clone();
    app.add_idle(move |app| {
        o.borrow_mut().push("outer");
        let inner = o.clone();
        app.add_idle(move |_| {
            inner.borrow_mut().push("inner");
            false
        })
        .unwrap();
        false
    })
    .unwrap();

    iterate(&mut app);
    assert_eq!(*order.borrow(), vec!["outer"]);
    iterate(&mut app);
    assert_eq!(*order.borrow(), vec!["outer", "inner"]);
    iterate(&mut app);
    assert_eq!(order.borrow().len(), 2);
}

/// Modal dialog whose run is stopped by a timer once it starts
fn self_closing_dialog(app: &mut Application) -> ViewId {
    app.add_toplevel(Container, ToplevelOptions::new("dialog").modal(true))
}

fn run_dialog(app: &mut Application, dialog: ViewId) {
    app.add_timeout(Duration::ZERO, move |app| {
        app.request_stop(Some(dialog)).unwrap();
        false
    })
    .unwrap();
    app.run(dialog).unwrap();
}

#[test]
fn dialog_run_from_idle_keeps_persistent_idle_handlers() {
    let (mut app, _handle) = fake_app();
    let dialog = self_closing_dialog(&mut app);
    let shown = Rc::new(Cell::new(false));
    let s = shown.clone();
    app.invoke(move |app| {
        run_dialog(app, dialog);
        s.set(true);
    })
    .unwrap();
    let ticks = Rc::new(Cell::new(0));
    let t = ticks.clone();
    app.add_idle(move |_| {
        t.set(t.get() + 1);
        true
    })
    .unwrap();

    for _ in 0..5 {
        iterate(&mut app);
    }
    assert!(shown.get());
    assert!(app.toplevels().is_empty());
    assert_eq!(ticks.get(), 5);
    assert_eq!(app.main_loop().unwrap().scheduler().idle_count(), 1);
}

#[test]
fn dialog_run_from_timeout_keeps_sibling_timeouts() {
    let (mut app, clock) = app_with_clock();
    let dialog = self_closing_dialog(&mut app);
    let fired = Rc::new(RefCell::new(Vec::new()));

    let f = fired.clone();
    app.add_timeout(Duration::from_millis(5), move |app| {
        run_dialog(app, dialog);
        f.borrow_mut().push("a");
        false
    })
    .unwrap();
    let f = fired.clone();
    app.add_timeout(Duration::from_millis(5), move |_| {
        f.borrow_mut().push("b");
        true
    })
    .unwrap();

    clock.advance(Duration::from_millis(6));
    iterate(&mut app);
    assert_eq!(*fired.borrow(), vec!["a", "b"]);

    clock.advance(Duration::from_millis(5));
    iterate(&mut app);
    assert_eq!(*fired.borrow(), vec!["a", "b", "b"]);
    assert_eq!(app.main_loop().unwrap().scheduler().timeout_count(), 1);
}

#[test]
fn invoke_runs_once_on_the_main_loop() {
    let (mut app, _clock) = app_with_clock();
    let ran = Rc::new(RefCell::new(0));
    let r = ran.clone();
    app.invoke(move |_| *r.borrow_mut() += 1).unwrap();

    assert!(app.main_loop().unwrap().events_pending().unwrap());
    iterate(&mut app);
    iterate(&mut app);
    assert_eq!(*ran.borrow(), 1);
}

#[test]
fn invoker_from_worker_thread_runs_on_main_thread() {
    let (mut app, _handle) = fake_app();
    let invoker = app.invoker().unwrap();
    let main_thread = thread::current().id();
    let seen_on = Arc::new(std::sync::Mutex::new(None));
    let calls = Arc::new(AtomicUsize::new(0));

    let worker = {
        let seen_on = seen_on.clone();
        let calls = calls.clone();
        thread::spawn(move || {
            assert!(!invoker.is_main_thread());
            invoker
                .invoke(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if let Ok(mut slot) = seen_on.lock() {
                        *slot = Some(thread::current().id());
                    }
                })
                .unwrap();
            invoker.send(|app| app.is_initialized()).unwrap()
        })
    };

    while !worker.is_finished() {
        if app.main_loop().unwrap().events_pending().unwrap() {
            iterate(&mut app);
        }
    }
    assert!(worker.join().unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen_on.lock().unwrap(), Some(main_thread));
}

#[test]
fn send_from_main_thread_is_rejected() {
    let (mut app, _handle) = fake_app();
    let invoker = app.invoker().unwrap();
    assert!(invoker.is_main_thread());
    assert!(matches!(
        invoker.send(|_| ()),
        Err(AppError::SendFromMainThread)
    ));
}

#[test]
fn send_after_shutdown_reports_disconnect() {
    let (mut app, _handle) = fake_app();
    let invoker = app.invoker().unwrap();
    app.shutdown();
    drop(app);

    let result = thread::spawn(move || invoker.send(|_| 1)).join().unwrap();
    assert!(matches!(result, Err(AppError::Disconnected)));
}

#[test]
fn invoker_requires_initialized_application() {
    let mut app = Application::new(test_config());
    assert!(matches!(app.invoker(), Err(AppError::NotInitialized)));
}
