use super::{Application, ApplicationEvents};
use crate::driver::ConsoleDriver;
use crate::error::{AppError, Result};
use crate::geometry::{Point, Rect};
use crate::input::Command;
use crate::main_loop::{MainLoop, MonotonicClock};
use crate::view::ViewId;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Every field `init`/`shutdown`/`reset_state` touch, in comparable form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub initialized: bool,
    pub has_driver: bool,
    pub has_main_loop: bool,
    pub toplevels: Vec<ViewId>,
    pub current: Option<ViewId>,
    pub top: Option<ViewId>,
    pub mouse_grab_view: Option<ViewId>,
    pub popover: Option<ViewId>,
    /// `(key, commands)` sorted by key text
    pub key_bindings: Vec<(String, Vec<Command>)>,
    pub commands: Vec<Command>,
    pub end_after_first_iteration: bool,
    pub main_thread_id: Option<ThreadId>,
    pub last_mouse_position: Option<Point>,
    pub mouse_enter_views: Vec<ViewId>,
    pub mouse_enabled: bool,
    pub screen: Rect,
    pub subscribers: usize,
}

impl Application {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn main_thread_id(&self) -> Option<ThreadId> {
        self.main_thread_id
    }

    /// Acquire a console driver and start the main loop.
    ///
    /// The driver is `driver` if given, else the one registered as
    /// `driver_name`, else the configured driver, else the registry default.
    /// Calling again while initialized is a no-op unless an explicit driver
    /// is passed, which is [`AppError::AlreadyInitialized`].
    pub fn init(
        &mut self,
        driver: Option<Box<dyn ConsoleDriver>>,
        driver_name: Option<&str>,
    ) -> Result<()> {
        if self.initialized {
            if driver.is_some() {
                return Err(AppError::AlreadyInitialized);
            }
            tracing::debug!("init called while initialized, ignoring");
            return Ok(());
        }

        // parse keys before touching the console so a bad spec leaves nothing to undo
        let key_bindings = self.default_key_bindings()?;

        let mut driver = match driver {
            Some(driver) => driver,
            None => {
                let name = driver_name
                    .map(str::to_string)
                    .or_else(|| self.config.driver.clone());
                self.registry.create_or_default(name.as_deref())?
            }
        };
        let driver_name = driver.name().to_string();
        let loop_driver = driver.init().map_err(|source| AppError::DriverInit {
            driver: driver_name.clone(),
            source,
        })?;

        let clock = self
            .clock
            .clone()
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let max_wait = self.config.main_loop.max_wait_ms.map(Duration::from_millis);
        self.main_loop = Some(MainLoop::with_clock(loop_driver, clock).with_max_wait(max_wait));
        self.screen = driver.screen();
        self.driver = Some(driver);
        self.key_bindings = key_bindings;
        self.mouse_enabled = self.config.mouse_enabled;
        self.main_thread_id = Some(thread::current().id());
        self.initialized = true;

        tracing::info!(driver = %driver_name, screen = ?self.screen, "application initialized");
        self.events.initialized_changed.raise(&mut true);
        Ok(())
    }

    /// Release the driver and reset all state. Safe to call at any time.
    pub fn shutdown(&mut self) {
        let was_initialized = self.initialized;
        self.reset_state();
        if was_initialized {
            tracing::info!("application shut down");
            self.events.initialized_changed.raise(&mut false);
        }
    }

    /// Put every field back to its value after `new`, ending the driver if
    /// one is still attached. Views stay in the arena; they belong to the host.
    pub fn reset_state(&mut self) {
        for toplevel in std::mem::take(&mut self.toplevels) {
            if let Ok(state) = self.views.toplevel_mut(toplevel) {
                state.running = false;
            }
        }
        if let Some(mut main_loop) = self.main_loop.take() {
            main_loop.tear_down();
        }
        if let Some(mut driver) = self.driver.take() {
            if let Err(e) = driver.end() {
                tracing::warn!(driver = driver.name(), error = %e, "driver end failed");
            }
        }

        self.current = None;
        self.top = None;
        self.mouse_grab_view = None;
        self.popover = None;
        self.key_bindings.clear();
        self.commands.clear();
        self.register_builtin_commands();
        self.end_after_first_iteration = false;
        self.initialized = false;
        self.main_thread_id = None;
        self.last_mouse_position = None;
        self.mouse_enter_views.clear();
        self.mouse_enabled = self.config.mouse_enabled;
        self.screen = Rect::default();
        self.events.clear();
    }

    pub fn state_snapshot(&self) -> StateSnapshot {
        let mut key_bindings: Vec<(String, Vec<Command>)> = self
            .key_bindings
            .iter()
            .map(|(key, binding)| (key.to_string(), binding.commands.clone()))
            .collect();
        key_bindings.sort_by(|a, b| a.0.cmp(&b.0));
        let mut commands: Vec<Command> = self.commands.keys().copied().collect();
        commands.sort_by_key(|c| c.name());

        StateSnapshot {
            initialized: self.initialized,
            has_driver: self.driver.is_some(),
            has_main_loop: self.main_loop.is_some(),
            toplevels: self.toplevels.clone(),
            current: self.current,
            top: self.top,
            mouse_grab_view: self.mouse_grab_view,
            popover: self.popover,
            key_bindings,
            commands,
            end_after_first_iteration: self.end_after_first_iteration,
            main_thread_id: self.main_thread_id,
            last_mouse_position: self.last_mouse_position,
            mouse_enter_views: self.mouse_enter_views.clone(),
            mouse_enabled: self.mouse_enabled,
            screen: self.screen,
            subscribers: subscriber_count(&self.events),
        }
    }
}

fn subscriber_count(events: &ApplicationEvents) -> usize {
    events.key_down.len()
        + events.key_up.len()
        + events.mouse_event.len()
        + events.grabbing_mouse.len()
        + events.grabbed_mouse.len()
        + events.ungrabbing_mouse.len()
        + events.ungrabbed_mouse.len()
        + events.iteration.len()
        + events.new_run_state.len()
        + events.stop_run_state.len()
        + events.size_changing.len()
        + events.toplevel_closing.len()
        + events.initialized_changed.len()
}

impl Drop for Application {
    fn drop(&mut self) {
        if self.initialized {
            self.shutdown();
        }
    }
}
