//! Input types: keys, mouse events, commands and binding tables

mod command;
mod key;
mod key_bindings;
mod mouse;

pub use command::Command;
pub use key::{Key, KeyEventArgs};
pub use key_bindings::{KeyBinding, KeyBindingScope, KeyBindings};
pub use mouse::{GrabMouseEventArgs, MouseEvent};
