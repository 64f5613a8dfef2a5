//! The application context
//!
//! [`Application`] owns the driver, the main loop, the view arena and the
//! toplevel stack, and routes driver input to views. One value holds what
//! would otherwise be process-wide state: `new` builds it uninitialized,
//! [`init`](Application::init) acquires a driver, and
//! [`shutdown`](Application::shutdown) returns it to the state `new` left it
//! in, so a context can be cycled any number of times.

mod keyboard;
mod lifecycle;
mod mouse;
mod navigation;
mod sync;
mod toplevel_stack;

pub use lifecycle::StateSnapshot;
pub use sync::Invoker;
pub use toplevel_stack::RunState;

use crate::driver::{ConsoleDriver, DriverEvent, DriverRegistry};
use crate::error::{AppError, Result};
use crate::event::EventHandlers;
use crate::geometry::{Point, Rect};
use crate::input::{Command, GrabMouseEventArgs, KeyBindings, KeyEventArgs, MouseEvent};
use crate::main_loop::{Clock, IdleId, LoopHost, MainLoop, TimeoutId};
use crate::view::{
    EventContext, SizeChangedArgs, ToplevelClosingArgs, ToplevelOptions, View, ViewId, ViewTree,
};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;
use tessera_config::ApplicationConfig;

/// Implementation of an application-scoped command. `Ok(true)` stops
/// evaluation of the binding's remaining commands.
pub type CommandHandler = Rc<dyn Fn(&mut Application) -> Result<bool>>;

/// Subscriber lists for application events
#[derive(Debug, Default)]
pub struct ApplicationEvents {
    /// Before any view sees a key; set `handled` to swallow it
    pub key_down: EventHandlers<KeyEventArgs>,
    pub key_up: EventHandlers<KeyEventArgs>,
    /// Before any view sees a mouse event; set `handled` to swallow it
    pub mouse_event: EventHandlers<MouseEvent>,
    pub grabbing_mouse: EventHandlers<GrabMouseEventArgs>,
    pub grabbed_mouse: EventHandlers<ViewId>,
    pub ungrabbing_mouse: EventHandlers<GrabMouseEventArgs>,
    pub ungrabbed_mouse: EventHandlers<ViewId>,
    /// After every main loop iteration that had work
    pub iteration: EventHandlers<()>,
    pub new_run_state: EventHandlers<ViewId>,
    pub stop_run_state: EventHandlers<ViewId>,
    pub size_changing: EventHandlers<SizeChangedArgs>,
    pub toplevel_closing: EventHandlers<ToplevelClosingArgs>,
    /// Raised with the new value after `init` and `shutdown`
    pub initialized_changed: EventHandlers<bool>,
}

impl ApplicationEvents {
    /// Drop every subscriber except `initialized_changed`
    fn clear(&mut self) {
        let initialized_changed = std::mem::take(&mut self.initialized_changed);
        *self = Self {
            initialized_changed,
            ..Self::default()
        };
    }
}

pub struct Application {
    config: ApplicationConfig,
    registry: DriverRegistry,
    clock: Option<Arc<dyn Clock>>,
    driver: Option<Box<dyn ConsoleDriver>>,
    main_loop: Option<MainLoop<Application>>,
    views: ViewTree,
    /// Last element is the top of the stack
    toplevels: Vec<ViewId>,
    current: Option<ViewId>,
    top: Option<ViewId>,
    mouse_grab_view: Option<ViewId>,
    popover: Option<ViewId>,
    key_bindings: KeyBindings,
    commands: HashMap<Command, CommandHandler>,
    end_after_first_iteration: bool,
    initialized: bool,
    main_thread_id: Option<ThreadId>,
    last_mouse_position: Option<Point>,
    /// Views the mouse is inside, outermost first
    mouse_enter_views: Vec<ViewId>,
    mouse_enabled: bool,
    screen: Rect,
    pub events: ApplicationEvents,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("initialized", &self.initialized)
            .field("driver", &self.driver.as_ref().map(|d| d.name().to_string()))
            .field("toplevels", &self.toplevels)
            .field("current", &self.current)
            .field("top", &self.top)
            .field("mouse_grab_view", &self.mouse_grab_view)
            .field("popover", &self.popover)
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Uninitialized context using the built-in drivers
    pub fn new(config: ApplicationConfig) -> Self {
        Self::with_registry(config, DriverRegistry::with_builtins())
    }

    pub fn with_registry(config: ApplicationConfig, registry: DriverRegistry) -> Self {
        let mouse_enabled = config.mouse_enabled;
        let mut app = Self {
            config,
            registry,
            clock: None,
            driver: None,
            main_loop: None,
            views: ViewTree::new(),
            toplevels: Vec::new(),
            current: None,
            top: None,
            mouse_grab_view: None,
            popover: None,
            key_bindings: KeyBindings::new(),
            commands: HashMap::new(),
            end_after_first_iteration: false,
            initialized: false,
            main_thread_id: None,
            last_mouse_position: None,
            mouse_enter_views: Vec::new(),
            mouse_enabled,
            screen: Rect::default(),
            events: ApplicationEvents::default(),
        };
        app.register_builtin_commands();
        app
    }

    /// Use `clock` for timer deadlines from the next `init` on
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    pub fn registry_mut(&mut self) -> &mut DriverRegistry {
        &mut self.registry
    }

    pub fn driver(&self) -> Option<&dyn ConsoleDriver> {
        self.driver.as_deref()
    }

    pub fn driver_mut(&mut self) -> Result<&mut (dyn ConsoleDriver + 'static)> {
        self.driver.as_deref_mut().ok_or(AppError::NotInitialized)
    }

    /// Screen bounds as last reported by the driver
    pub fn screen(&self) -> Rect {
        self.screen
    }

    pub fn views(&self) -> &ViewTree {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut ViewTree {
        &mut self.views
    }

    pub fn add_view(&mut self, view: impl View) -> ViewId {
        self.views.insert(Box::new(view))
    }

    pub fn add_toplevel(&mut self, view: impl View, options: ToplevelOptions) -> ViewId {
        self.views.insert_toplevel(Box::new(view), options)
    }

    pub fn add_child(&mut self, parent: ViewId, child: ViewId) -> Result<()> {
        self.views.add_child(parent, child)
    }

    /// Remove a view and its subtree. Toplevels must not be on the stack.
    pub fn remove_view(&mut self, id: ViewId) -> Result<()> {
        let subtree = self.views.subtree(id);
        if let Some(on_stack) = subtree.iter().find(|v| self.toplevels.contains(v)) {
            return Err(AppError::ToplevelOnStack(*on_stack));
        }
        self.forget_views(&subtree);
        self.views.remove(id)?;
        Ok(())
    }

    /// Clear grab, popover and hover entries that point into `views`
    fn forget_views(&mut self, views: &[ViewId]) {
        if self.mouse_grab_view.is_some_and(|g| views.contains(&g)) {
            tracing::debug!("grab view went away, releasing grab");
            self.mouse_grab_view = None;
        }
        if self.popover.is_some_and(|p| views.contains(&p)) {
            self.popover = None;
        }
        self.mouse_enter_views.retain(|v| !views.contains(v));
    }

    pub fn toplevels(&self) -> &[ViewId] {
        &self.toplevels
    }

    /// Toplevel that has focus
    pub fn current(&self) -> Option<ViewId> {
        self.current
    }

    /// Primary toplevel
    pub fn top(&self) -> Option<ViewId> {
        self.top
    }

    pub fn mouse_grab_view(&self) -> Option<ViewId> {
        self.mouse_grab_view
    }

    pub fn popover(&self) -> Option<ViewId> {
        self.popover
    }

    pub fn last_mouse_position(&self) -> Option<Point> {
        self.last_mouse_position
    }

    pub fn is_mouse_enabled(&self) -> bool {
        self.mouse_enabled
    }

    pub fn set_mouse_enabled(&mut self, enabled: bool) {
        self.mouse_enabled = enabled;
    }

    /// Make `run_loop` return after its first iteration
    pub fn set_end_after_first_iteration(&mut self, end: bool) {
        self.end_after_first_iteration = end;
    }

    pub fn end_after_first_iteration(&self) -> bool {
        self.end_after_first_iteration
    }

    pub fn add_timeout(
        &mut self,
        span: Duration,
        callback: impl FnMut(&mut Application) -> bool + 'static,
    ) -> Result<TimeoutId> {
        Ok(self.main_loop()?.add_timeout(span, callback))
    }

    pub fn remove_timeout(&mut self, id: TimeoutId) -> bool {
        self.main_loop
            .as_mut()
            .is_some_and(|ml| ml.remove_timeout(id))
    }

    pub fn add_idle(
        &mut self,
        callback: impl FnMut(&mut Application) -> bool + 'static,
    ) -> Result<IdleId> {
        Ok(self.main_loop()?.add_idle(callback))
    }

    pub fn remove_idle(&mut self, id: IdleId) -> bool {
        self.main_loop.as_mut().is_some_and(|ml| ml.remove_idle(id))
    }

    /// Break a blocking wait of the main loop
    pub fn wakeup(&self) {
        if let Some(ml) = &self.main_loop {
            ml.wakeup();
        }
    }

    /// Run `f` with the behavior of `id` taken out of the arena.
    ///
    /// Returns `default` without calling `f` if the behavior is already out,
    /// which happens when a hook reenters routing for its own view.
    pub(crate) fn with_view<R>(
        &mut self,
        id: ViewId,
        default: R,
        f: impl FnOnce(&mut dyn View, &mut EventContext<'_>) -> R,
    ) -> Result<R> {
        let Some(mut behavior) = self.views.get_mut(id)?.behavior.take() else {
            return Ok(default);
        };
        let result = {
            let mut cx = EventContext { app: self, view: id };
            f(behavior.as_mut(), &mut cx)
        };
        // the view may have been removed by its own hook
        if let Ok(node) = self.views.get_mut(id) {
            node.behavior = Some(behavior);
        }
        Ok(result)
    }
}

impl LoopHost for Application {
    fn main_loop(&mut self) -> Result<&mut MainLoop<Self>> {
        self.main_loop.as_mut().ok_or(AppError::NotInitialized)
    }

    fn dispatch(&mut self, event: DriverEvent) -> Result<()> {
        tracing::trace!(?event, "dispatch");
        match event {
            DriverEvent::Resize(size) => {
                self.on_size_changed(size)?;
            }
            DriverEvent::KeyDown(key) => {
                self.on_key_down(key)?;
            }
            DriverEvent::KeyUp(key) => {
                self.on_key_up(key)?;
            }
            DriverEvent::Mouse(event) => {
                self.on_mouse_event(event)?;
            }
        }
        Ok(())
    }
}
