//! Key and mouse routing through the toplevel stack

mod common;

use common::{entries, fake_app, focusable, log, place, point, Log, Recorder};
use crossterm::event::{KeyCode, MouseButton};
use std::cell::Cell;
use std::rc::Rc;
use tessera::geometry::Rect;
use tessera::input::{KeyBinding, KeyBindingScope, MouseEvent};
use tessera::view::VisibleChangingArgs;
use tessera::{AppError, Application, Command, EventContext, Key, ToplevelOptions, View, ViewId};

fn esc() -> Key {
    Key::from(KeyCode::Esc)
}

/// Running toplevel `top` with a child `c` at (0,0) 10x5
fn top_with_child(app: &mut Application, log: &Log, child: Recorder) -> (ViewId, ViewId) {
    let top = app.add_toplevel(Recorder::new("top", log), ToplevelOptions::new("top"));
    let c = app.add_view(child);
    place(app, top, c, Rect::new(0, 0, 10, 5));
    (top, c)
}

mod keys {
    use super::*;

    #[test]
    fn view_handler_runs_before_application_binding() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let quit_ran = Rc::new(Cell::new(false));
        let q = quit_ran.clone();
        app.add_command(Command::Quit, move |_| {
            q.set(true);
            Ok(true)
        });

        let top = app.add_toplevel(
            Recorder::new("top", &log).handling_key(esc()),
            ToplevelOptions::new("top"),
        );
        let _state = app.begin(top).unwrap();

        assert!(app.on_key_down(esc()).unwrap());
        assert!(!quit_ran.get());
    }

    #[test]
    fn unhandled_key_reaches_application_binding() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let quit_ran = Rc::new(Cell::new(false));
        let q = quit_ran.clone();
        app.add_command(Command::Quit, move |_| {
            q.set(true);
            Ok(true)
        });

        let top = app.add_toplevel(Recorder::new("top", &log), ToplevelOptions::new("top"));
        let _state = app.begin(top).unwrap();

        assert!(app.on_key_down(esc()).unwrap());
        assert!(quit_ran.get());
        assert_eq!(entries(&log, "top:key_down").len(), 1);
    }

    #[test]
    fn focus_chain_is_offered_the_key_deepest_first() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        focusable(&mut app, c);
        let _state = app.begin(top).unwrap();
        log.borrow_mut().clear();

        assert!(!app.on_key_down(Key::char('k')).unwrap());
        let keys: Vec<String> = log
            .borrow()
            .iter()
            .filter(|e| e.contains("key_down"))
            .cloned()
            .collect();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].starts_with("c:"));
        assert!(keys[1].starts_with("top:"));
    }

    #[test]
    fn modal_toplevel_blocks_keys_from_lower_toplevels() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let a = app.add_toplevel(Recorder::new("a", &log), ToplevelOptions::new("a"));
        let b = app.add_toplevel(
            Recorder::new("b", &log),
            ToplevelOptions::new("b").modal(true),
        );
        let c = app.add_toplevel(Recorder::new("c", &log), ToplevelOptions::new("c"));
        let _sa = app.begin(a).unwrap();
        let _sb = app.begin(b).unwrap();
        let _sc = app.begin(c).unwrap();

        assert!(!app.on_key_down(Key::char('k')).unwrap());
        assert_eq!(entries(&log, "c:key_down").len(), 1);
        assert_eq!(entries(&log, "b:key_down").len(), 1);
        assert!(entries(&log, "a:key_down").is_empty());
    }

    #[test]
    fn key_down_subscriber_can_swallow_keys() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let top = app.add_toplevel(Recorder::new("top", &log), ToplevelOptions::new("top"));
        let _state = app.begin(top).unwrap();
        app.events.key_down.subscribe(|args| args.handled = true);

        assert!(app.on_key_down(Key::char('x')).unwrap());
        assert!(entries(&log, "top:key_down").is_empty());
    }

    #[test]
    fn focused_binding_without_view_support_is_an_error() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        focusable(&mut app, c);
        app.views_mut()
            .get_mut(c)
            .unwrap()
            .key_bindings
            .add(
                Key::char('r'),
                KeyBinding::new([Command::Refresh], KeyBindingScope::Focused),
            )
            .unwrap();
        let _state = app.begin(top).unwrap();

        let err = app.on_key_down(Key::char('r')).unwrap_err();
        assert!(matches!(err, AppError::CommandNotSupported(Command::Refresh)));
    }

    #[test]
    fn application_binding_without_implementation_is_an_error() {
        let (mut app, _handle) = fake_app();
        let top = app.add_toplevel(tessera::Container, ToplevelOptions::new("top"));
        let _state = app.begin(top).unwrap();
        assert!(app.remove_command(Command::Quit));

        let err = app.on_key_down(esc()).unwrap_err();
        assert!(matches!(err, AppError::CommandNotSupported(Command::Quit)));
    }

    #[test]
    fn hot_key_fires_without_focus() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, c) = top_with_child(
            &mut app,
            &log,
            Recorder::new("c", &log).supporting_commands(true),
        );
        app.views_mut()
            .get_mut(c)
            .unwrap()
            .key_bindings
            .add(
                Key::ctrl('o'),
                KeyBinding::new([Command::Accept], KeyBindingScope::HotKey),
            )
            .unwrap();
        let _state = app.begin(top).unwrap();
        assert_eq!(app.focused_view(), None);

        assert!(app.on_key_down(Key::ctrl('o')).unwrap());
        assert_eq!(entries(&log, "c:command").len(), 1);
    }

    #[test]
    fn tab_cycles_focus_through_the_current_toplevel() {
        let (mut app, _handle) = fake_app();
        let top = app.add_toplevel(tessera::Container, ToplevelOptions::new("top"));
        let first = app.add_view(tessera::Container);
        let second = app.add_view(tessera::Container);
        place(&mut app, top, first, Rect::new(0, 0, 5, 1));
        place(&mut app, top, second, Rect::new(0, 1, 5, 1));
        focusable(&mut app, first);
        focusable(&mut app, second);
        let _state = app.begin(top).unwrap();
        assert_eq!(app.focused_view(), Some(first));

        let tab = Key::from(KeyCode::Tab);
        assert!(app.on_key_down(tab).unwrap());
        assert_eq!(app.focused_view(), Some(second));
        assert!(app.on_key_down(tab).unwrap());
        assert_eq!(app.focused_view(), Some(first));
    }

    #[test]
    fn key_up_skips_application_bindings() {
        let (mut app, _handle) = fake_app();
        let quit_ran = Rc::new(Cell::new(false));
        let q = quit_ran.clone();
        app.add_command(Command::Quit, move |_| {
            q.set(true);
            Ok(true)
        });
        let top = app.add_toplevel(tessera::Container, ToplevelOptions::new("top"));
        let _state = app.begin(top).unwrap();

        assert!(!app.on_key_up(esc()).unwrap());
        assert!(!quit_ran.get());
    }
}

mod mouse {
    use super::*;

    fn press(x: i32, y: i32) -> MouseEvent {
        MouseEvent::pressed(MouseButton::Left, point(x, y))
    }

    fn hover_entries(log: &Log, name: &str) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|e| e.starts_with(name) && (e.ends_with(":enter") || e.ends_with(":leave")))
            .cloned()
            .collect()
    }

    #[test]
    fn enter_and_leave_are_raised_once_per_crossing() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, _c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        let _state = app.begin(top).unwrap();

        app.on_mouse_event(MouseEvent::moved(point(1, 1))).unwrap();
        app.on_mouse_event(MouseEvent::moved(point(2, 2))).unwrap();
        app.on_mouse_event(MouseEvent::moved(point(20, 20))).unwrap();
        app.on_mouse_event(MouseEvent::moved(point(30, 20))).unwrap();

        assert_eq!(hover_entries(&log, "c:"), vec!["c:enter", "c:leave"]);
        assert_eq!(hover_entries(&log, "top:"), vec!["top:enter"]);
    }

    #[test]
    fn unhandled_event_bubbles_with_local_coordinates() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let top = app.add_toplevel(Recorder::new("top", &log), ToplevelOptions::new("top"));
        let c = app.add_view(Recorder::new("c", &log));
        place(&mut app, top, c, Rect::new(5, 3, 10, 5));
        let _state = app.begin(top).unwrap();

        assert!(!app.on_mouse_event(press(6, 4)).unwrap());
        assert_eq!(entries(&log, "c:mouse"), vec!["c:mouse 1,1"]);
        assert_eq!(entries(&log, "top:mouse"), vec!["top:mouse 6,4"]);
        assert_eq!(app.last_mouse_position(), Some(point(6, 4)));
    }

    #[test]
    fn handled_event_stops_bubbling() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, _c) = top_with_child(&mut app, &log, Recorder::new("c", &log).handling_mouse());
        let _state = app.begin(top).unwrap();

        assert!(app.on_mouse_event(press(1, 1)).unwrap());
        assert!(entries(&log, "top:mouse").is_empty());
    }

    #[test]
    fn grab_is_exclusive_until_released() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, c) = top_with_child(&mut app, &log, Recorder::new("c", &log).handling_mouse());
        let _state = app.begin(top).unwrap();

        assert!(app.grab_mouse(c).unwrap());
        assert!(app.grab_mouse(c).unwrap());
        match app.grab_mouse(top) {
            Err(AppError::MouseAlreadyGrabbed { holder, requested }) => {
                assert_eq!(holder, c);
                assert_eq!(requested, top);
            }
            other => panic!("expected grab conflict, got {other:?}"),
        }
        assert_eq!(app.mouse_grab_view(), Some(c));

        // outside c's frame, still delivered to c in c's coordinates
        assert!(app.on_mouse_event(press(40, 20)).unwrap());
        assert_eq!(entries(&log, "c:mouse"), vec!["c:mouse 40,20"]);
        assert!(entries(&log, "top:mouse").is_empty());

        assert!(app.ungrab_mouse());
        assert!(!app.ungrab_mouse());
        assert_eq!(app.mouse_grab_view(), None);
    }

    #[test]
    fn grabbing_subscriber_can_refuse() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        let _state = app.begin(top).unwrap();
        app.events.grabbing_mouse.subscribe(|args| args.cancel = true);

        assert!(!app.grab_mouse(c).unwrap());
        assert_eq!(app.mouse_grab_view(), None);
    }

    #[test]
    fn removed_grab_view_releases_the_grab() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        let _state = app.begin(top).unwrap();

        app.grab_mouse(c).unwrap();
        app.remove_view(c).unwrap();
        assert_eq!(app.mouse_grab_view(), None);
        assert!(app.grab_mouse(top).unwrap());
    }

    #[test]
    fn press_outside_popover_dismisses_it_and_redelivers_once() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, _c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        let pop = app.add_view(Recorder::new("pop", &log));
        app.views_mut().get_mut(pop).unwrap().frame = Rect::new(20, 10, 5, 5);
        let _state = app.begin(top).unwrap();
        app.set_popover(Some(pop)).unwrap();

        app.on_mouse_event(press(1, 1)).unwrap();

        assert!(!app.views().get(pop).unwrap().is_visible());
        assert_eq!(entries(&log, "c:mouse").len(), 1);
        assert!(entries(&log, "pop:mouse").is_empty());
    }

    #[test]
    fn press_inside_popover_keeps_it_open() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, _c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        let pop = app.add_view(Recorder::new("pop", &log));
        app.views_mut().get_mut(pop).unwrap().frame = Rect::new(20, 10, 5, 5);
        let _state = app.begin(top).unwrap();
        app.set_popover(Some(pop)).unwrap();

        app.on_mouse_event(press(21, 11)).unwrap();

        assert!(app.views().get(pop).unwrap().is_visible());
        assert_eq!(entries(&log, "pop:mouse"), vec!["pop:mouse 1,1"]);
        assert!(entries(&log, "c:mouse").is_empty());
    }

    struct StubbornPopover;

    impl View for StubbornPopover {
        fn on_visible_changing(&mut self, _cx: &mut EventContext<'_>, args: &mut VisibleChangingArgs) {
            args.cancel = true;
        }
    }

    #[test]
    fn popover_refusing_to_hide_does_not_loop() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, _c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        let pop = app.add_view(StubbornPopover);
        app.views_mut().get_mut(pop).unwrap().frame = Rect::new(20, 10, 5, 5);
        let _state = app.begin(top).unwrap();
        app.set_popover(Some(pop)).unwrap();

        app.on_mouse_event(press(1, 1)).unwrap();

        assert!(app.views().get(pop).unwrap().is_visible());
        assert_eq!(entries(&log, "c:mouse").len(), 1);
    }

    #[test]
    fn modal_toplevel_hides_lower_toplevels_from_the_mouse() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let a = app.add_toplevel(Recorder::new("a", &log), ToplevelOptions::new("a"));
        let b = app.add_toplevel(
            Recorder::new("b", &log),
            ToplevelOptions::new("b").modal(true),
        );
        app.views_mut().get_mut(b).unwrap().frame = Rect::new(10, 10, 5, 5);
        let _sa = app.begin(a).unwrap();
        let _sb = app.begin(b).unwrap();

        assert!(!app.on_mouse_event(press(0, 0)).unwrap());
        assert!(entries(&log, "a:mouse").is_empty());

        app.on_mouse_event(press(11, 11)).unwrap();
        assert_eq!(entries(&log, "b:mouse"), vec!["b:mouse 1,1"]);
    }

    #[test]
    fn disabled_mouse_only_tracks_position() {
        let (mut app, _handle) = fake_app();
        let log = log();
        let (top, _c) = top_with_child(&mut app, &log, Recorder::new("c", &log));
        let _state = app.begin(top).unwrap();
        app.set_mouse_enabled(false);

        assert!(!app.on_mouse_event(press(1, 1)).unwrap());
        assert_eq!(app.last_mouse_position(), Some(point(1, 1)));
        assert!(entries(&log, "c:").iter().all(|e| !e.contains("mouse")));
    }
}
