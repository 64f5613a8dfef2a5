//! Key routing and application commands
//!
//! A key goes to the `key_down` subscribers, then down the toplevel stack
//! from the top, then to the application-scoped bindings. Each toplevel
//! offers it to its focus chain deepest first: the view's own handler, then
//! the view's focused-scope bindings. Hot-key bindings anywhere in the
//! toplevel come last. A modal toplevel ends the walk.

use super::{Application, CommandHandler};
use crate::error::{AppError, Result};
use crate::input::{Command, Key, KeyBinding, KeyBindingScope, KeyBindings, KeyEventArgs};
use crate::view::ViewId;
use std::rc::Rc;

impl Application {
    pub fn key_bindings(&self) -> &KeyBindings {
        &self.key_bindings
    }

    /// Application-scoped bindings
    pub fn key_bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.key_bindings
    }

    /// Register (or replace) the implementation of an application command
    pub fn add_command(
        &mut self,
        command: Command,
        handler: impl Fn(&mut Application) -> Result<bool> + 'static,
    ) {
        self.commands.insert(command, Rc::new(handler));
    }

    pub fn remove_command(&mut self, command: Command) -> bool {
        self.commands.remove(&command).is_some()
    }

    pub fn has_command(&self, command: Command) -> bool {
        self.commands.contains_key(&command)
    }

    pub(super) fn register_builtin_commands(&mut self) {
        self.add_command(Command::Quit, |app| {
            app.request_stop(None)?;
            Ok(true)
        });
        self.add_command(Command::Suspend, |app| {
            tracing::debug!("suspending");
            app.driver_mut()?.suspend()?;
            app.refresh()?;
            Ok(true)
        });
        self.add_command(Command::NextView, |app| app.move_next_view());
        self.add_command(Command::PreviousView, |app| app.move_previous_view());
        self.add_command(Command::NextViewOrTop, |app| app.move_next_view_or_top());
        self.add_command(Command::PreviousViewOrTop, |app| {
            app.move_previous_view_or_top()
        });
        self.add_command(Command::Refresh, |app| {
            app.refresh()?;
            Ok(true)
        });
    }

    /// Application bindings from the configured key specs
    pub(super) fn default_key_bindings(&self) -> Result<KeyBindings> {
        let mut bindings = KeyBindings::new();
        for (name, spec) in self.config.keys.entries() {
            let command: Command = name.parse()?;
            let key: Key = spec.parse()?;
            bindings.add(key, KeyBinding::application([command]))?;
        }
        Ok(bindings)
    }

    /// Route a key press. Returns whether anything handled it.
    pub fn on_key_down(&mut self, key: Key) -> Result<bool> {
        let mut args = KeyEventArgs::new(key);
        self.events.key_down.raise(&mut args);
        if args.handled {
            return Ok(true);
        }

        let stack: Vec<ViewId> = self.toplevels.iter().rev().copied().collect();
        for toplevel in stack {
            if self.toplevel_key_down(toplevel, key)? {
                return Ok(true);
            }
            if self.views.is_modal(toplevel) {
                tracing::trace!(%key, %toplevel, "key stopped at modal toplevel");
                break;
            }
        }

        self.invoke_application_bindings(key)
    }

    /// Route a key release. Application bindings are not consulted.
    pub fn on_key_up(&mut self, key: Key) -> Result<bool> {
        let mut args = KeyEventArgs::new(key);
        self.events.key_up.raise(&mut args);
        if args.handled {
            return Ok(true);
        }

        let stack: Vec<ViewId> = self.toplevels.iter().rev().copied().collect();
        for toplevel in stack {
            for view in self.views.focus_chain(toplevel).into_iter().rev() {
                if !self.accepts_input(view) {
                    continue;
                }
                if self.with_view(view, false, |v, cx| v.on_key_up(cx, key))? {
                    return Ok(true);
                }
            }
            if self.views.is_modal(toplevel) {
                break;
            }
        }
        Ok(false)
    }

    fn accepts_input(&self, view: ViewId) -> bool {
        self.views
            .get(view)
            .is_ok_and(|n| n.enabled && n.is_visible())
    }

    fn toplevel_key_down(&mut self, toplevel: ViewId, key: Key) -> Result<bool> {
        for view in self.views.focus_chain(toplevel).into_iter().rev() {
            if !self.accepts_input(view) {
                continue;
            }
            if self.with_view(view, false, |v, cx| v.on_key_down(cx, key))? {
                return Ok(true);
            }
            let binding = self
                .views
                .get(view)?
                .key_bindings
                .get_in_scope(&key, &[KeyBindingScope::Focused])
                .cloned();
            if let Some(binding) = binding {
                if self.invoke_view_commands(binding.bound_view.unwrap_or(view), &binding)? {
                    return Ok(true);
                }
            }
        }

        for view in self.views.subtree(toplevel) {
            if !self.views.is_shown(view) || !self.accepts_input(view) {
                continue;
            }
            let binding = self
                .views
                .get(view)?
                .key_bindings
                .get_in_scope(&key, &[KeyBindingScope::HotKey])
                .cloned();
            if let Some(binding) = binding {
                if self.invoke_view_commands(binding.bound_view.unwrap_or(view), &binding)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn invoke_view_commands(&mut self, view: ViewId, binding: &KeyBinding) -> Result<bool> {
        for command in &binding.commands {
            let command = *command;
            match self.with_view(view, Some(false), |v, cx| v.invoke_command(cx, command))? {
                Some(true) => return Ok(true),
                Some(false) => continue,
                None => return Err(AppError::CommandNotSupported(command)),
            }
        }
        Ok(false)
    }

    fn invoke_application_bindings(&mut self, key: Key) -> Result<bool> {
        let Some(binding) = self.key_bindings.get(&key).cloned() else {
            return Ok(false);
        };
        if let Some(view) = binding.bound_view {
            return self.invoke_view_commands(view, &binding);
        }
        for command in binding.commands {
            tracing::debug!(%key, %command, "application command");
            if self.invoke_command(command)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run the application implementation of `command`
    pub fn invoke_command(&mut self, command: Command) -> Result<bool> {
        let handler: CommandHandler = self
            .commands
            .get(&command)
            .cloned()
            .ok_or(AppError::CommandNotSupported(command))?;
        handler(self)
    }
}
