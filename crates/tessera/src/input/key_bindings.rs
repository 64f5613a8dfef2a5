//! Key → command tables
//!
//! Each view carries a table for its own (focused/hot-key) bindings; the
//! application carries the application-scoped table consulted after no
//! toplevel handled the key.

use crate::error::{AppError, Result};
use crate::input::{Command, Key};
use crate::view::ViewId;
use std::collections::HashMap;

/// Where a binding applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyBindingScope {
    /// Only while the owning view is in the focus chain
    #[default]
    Focused,
    /// Owning view's hot key, while it is in the focus chain
    HotKey,
    /// Anywhere in the application, after toplevels decline the key
    Application,
}

/// Commands bound to one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub commands: Vec<Command>,
    pub scope: KeyBindingScope,
    /// View that implements the commands. `None` for application commands.
    pub bound_view: Option<ViewId>,
}

impl KeyBinding {
    pub fn new(commands: impl Into<Vec<Command>>, scope: KeyBindingScope) -> Self {
        Self {
            commands: commands.into(),
            scope,
            bound_view: None,
        }
    }

    pub fn application(commands: impl Into<Vec<Command>>) -> Self {
        Self::new(commands, KeyBindingScope::Application)
    }

    pub fn bound_to(mut self, view: ViewId) -> Self {
        self.bound_view = Some(view);
        self
    }
}

/// A key binding table
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    bindings: HashMap<Key, KeyBinding>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key`. Binding an already bound key is an error; use
    /// [`replace_commands`](Self::replace_commands) to change it.
    pub fn add(&mut self, key: Key, binding: KeyBinding) -> Result<()> {
        if self.bindings.contains_key(&key) {
            return Err(AppError::DuplicateKeyBinding(key.to_string()));
        }
        self.bindings.insert(key, binding);
        Ok(())
    }

    /// Bind `key` to commands in `scope`
    pub fn add_commands(
        &mut self,
        key: Key,
        scope: KeyBindingScope,
        commands: impl Into<Vec<Command>>,
    ) -> Result<()> {
        self.add(key, KeyBinding::new(commands, scope))
    }

    pub fn get(&self, key: &Key) -> Option<&KeyBinding> {
        self.bindings.get(key)
    }

    /// Binding for `key` if it is in one of `scopes`
    pub fn get_in_scope(&self, key: &Key, scopes: &[KeyBindingScope]) -> Option<&KeyBinding> {
        self.bindings
            .get(key)
            .filter(|binding| scopes.contains(&binding.scope))
    }

    pub fn commands(&self, key: &Key) -> &[Command] {
        self.bindings
            .get(key)
            .map(|b| b.commands.as_slice())
            .unwrap_or(&[])
    }

    /// First key bound to exactly `commands`
    pub fn key_for_commands(&self, commands: &[Command]) -> Option<Key> {
        self.bindings
            .iter()
            .find(|(_, binding)| binding.commands == commands)
            .map(|(key, _)| *key)
    }

    pub fn remove(&mut self, key: &Key) -> bool {
        self.bindings.remove(key).is_some()
    }

    /// Move the binding of `old` to `new`. Returns `false` if `old` is unbound.
    /// Any binding already on `new` is replaced.
    pub fn replace_key(&mut self, old: &Key, new: Key) -> bool {
        match self.bindings.remove(old) {
            Some(binding) => {
                self.bindings.insert(new, binding);
                true
            }
            None => false,
        }
    }

    /// Change the commands of an existing binding, or add an application
    /// binding if `key` is unbound.
    pub fn replace_commands(&mut self, key: Key, commands: impl Into<Vec<Command>>) {
        let commands = commands.into();
        match self.bindings.get_mut(&key) {
            Some(binding) => binding.commands = commands,
            None => {
                self.bindings.insert(key, KeyBinding::application(commands));
            }
        }
    }

    /// Remove every binding bound to `view`
    pub fn remove_bound_to(&mut self, view: ViewId) {
        self.bindings.retain(|_, b| b.bound_view != Some(view));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &KeyBinding)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;

    #[test]
    fn duplicate_add_is_rejected() {
        let mut table = KeyBindings::new();
        table
            .add_commands(Key::ctrl('q'), KeyBindingScope::Application, [Command::Quit])
            .unwrap();

        let err = table
            .add_commands(Key::ctrl('q'), KeyBindingScope::Application, [Command::Refresh])
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKeyBinding(_)));
        assert_eq!(table.commands(&Key::ctrl('q')), &[Command::Quit]);
    }

    #[test]
    fn reverse_lookup_finds_key() {
        let mut table = KeyBindings::new();
        table
            .add(KeyCode::F(6).into(), KeyBinding::application([Command::NextViewOrTop]))
            .unwrap();

        assert_eq!(
            table.key_for_commands(&[Command::NextViewOrTop]),
            Some(Key::from(KeyCode::F(6)))
        );
        assert_eq!(table.key_for_commands(&[Command::Quit]), None);
    }

    #[test]
    fn replace_key_moves_binding() {
        let mut table = KeyBindings::new();
        table
            .add(KeyCode::Esc.into(), KeyBinding::application([Command::Quit]))
            .unwrap();

        assert!(table.replace_key(&KeyCode::Esc.into(), Key::ctrl('q')));
        assert!(table.get(&KeyCode::Esc.into()).is_none());
        assert_eq!(table.commands(&Key::ctrl('q')), &[Command::Quit]);
        assert!(!table.replace_key(&KeyCode::Esc.into(), Key::ctrl('x')));
    }

    #[test]
    fn scope_filter() {
        let mut table = KeyBindings::new();
        table
            .add_commands(Key::char('a'), KeyBindingScope::HotKey, [Command::HotKey])
            .unwrap();

        let key = Key::char('a');
        assert!(table.get_in_scope(&key, &[KeyBindingScope::Focused]).is_none());
        assert!(table
            .get_in_scope(&key, &[KeyBindingScope::Focused, KeyBindingScope::HotKey])
            .is_some());
    }

    #[test]
    fn unbound_key_has_no_commands() {
        let table = KeyBindings::new();
        assert!(table.commands(&Key::char('z')).is_empty());
        assert!(!KeyBindings::new().remove(&Key::char('z')));
    }
}
