//! Shared helpers for application integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use tessera::geometry::{Point, Rect};
use tessera::input::MouseEvent;
use tessera::tessera_config::ApplicationConfig;
use tessera::view::ToplevelClosingArgs;
use tessera::{Application, Command, EventContext, FakeDriver, FakeHandle, Key, View, ViewId};

/// Hook calls in the order they happened, as `"name:hook"` strings
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Entries of `log` that start with `prefix`
pub fn entries(log: &Log, prefix: &str) -> Vec<String> {
    log.borrow()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .cloned()
        .collect()
}

/// View that records every hook it receives
pub struct Recorder {
    pub name: &'static str,
    pub log: Log,
    /// Key this view handles
    pub handles_key: Option<Key>,
    pub handles_mouse: bool,
    pub cancel_close: bool,
    /// Result of `invoke_command`; `None` means unsupported
    pub command_result: Option<bool>,
}

impl Recorder {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            handles_key: None,
            handles_mouse: false,
            cancel_close: false,
            command_result: None,
        }
    }

    pub fn handling_key(mut self, key: Key) -> Self {
        self.handles_key = Some(key);
        self
    }

    pub fn handling_mouse(mut self) -> Self {
        self.handles_mouse = true;
        self
    }

    pub fn cancelling_close(mut self) -> Self {
        self.cancel_close = true;
        self
    }

    pub fn supporting_commands(mut self, result: bool) -> Self {
        self.command_result = Some(result);
        self
    }

    fn record(&self, what: impl std::fmt::Display) {
        self.log.borrow_mut().push(format!("{}:{what}", self.name));
    }
}

impl View for Recorder {
    fn on_key_down(&mut self, _cx: &mut EventContext<'_>, key: Key) -> bool {
        self.record(format_args!("key_down {key}"));
        self.handles_key == Some(key)
    }

    fn on_key_up(&mut self, _cx: &mut EventContext<'_>, key: Key) -> bool {
        self.record(format_args!("key_up {key}"));
        self.handles_key == Some(key)
    }

    fn on_mouse_event(&mut self, _cx: &mut EventContext<'_>, event: &mut MouseEvent) -> bool {
        self.record(format_args!("mouse {},{}", event.position.x, event.position.y));
        self.handles_mouse
    }

    fn on_mouse_enter(&mut self, _cx: &mut EventContext<'_>) {
        self.record("enter");
    }

    fn on_mouse_leave(&mut self, _cx: &mut EventContext<'_>) {
        self.record("leave");
    }

    fn invoke_command(&mut self, _cx: &mut EventContext<'_>, command: Command) -> Option<bool> {
        self.record(format_args!("command {command}"));
        self.command_result
    }

    fn on_initialized(&mut self, _cx: &mut EventContext<'_>) {
        self.record("initialized");
    }

    fn on_loaded(&mut self, _cx: &mut EventContext<'_>) {
        self.record("loaded");
    }

    fn on_ready(&mut self, _cx: &mut EventContext<'_>) {
        self.record("ready");
    }

    fn on_unloaded(&mut self, _cx: &mut EventContext<'_>) {
        self.record("unloaded");
    }

    fn on_closing(&mut self, _cx: &mut EventContext<'_>, args: &mut ToplevelClosingArgs) {
        self.record("closing");
        args.cancel = self.cancel_close;
    }

    fn on_closed(&mut self, _cx: &mut EventContext<'_>) {
        self.record("closed");
    }

    fn on_activate(&mut self, _cx: &mut EventContext<'_>, _deactivated: Option<ViewId>) {
        self.record("activate");
    }

    fn on_deactivate(&mut self, _cx: &mut EventContext<'_>, _activated: Option<ViewId>) {
        self.record("deactivate");
    }
}

/// Config whose blocking waits are capped so tests never hang on an idle driver
pub fn test_config() -> ApplicationConfig {
    let mut config = ApplicationConfig::default();
    config.main_loop.max_wait_ms = Some(5);
    config
}

/// Initialized application on a fake driver, plus the driver's input handle
pub fn fake_app() -> (Application, FakeHandle) {
    let driver = FakeDriver::new();
    let handle = driver.handle();
    let mut app = Application::new(test_config());
    app.init(Some(Box::new(driver)), None)
        .expect("fake driver init");
    (app, handle)
}

/// Attach `child` under `parent` with `frame`
pub fn place(app: &mut Application, parent: ViewId, child: ViewId, frame: Rect) {
    app.add_child(parent, child).expect("add child");
    app.views_mut().get_mut(child).expect("child").frame = frame;
}

pub fn focusable(app: &mut Application, view: ViewId) {
    app.views_mut().get_mut(view).expect("view").can_focus = true;
}

pub fn point(x: i32, y: i32) -> Point {
    Point::new(x, y)
}
