//! Normalized keys
//!
//! Uses crossterm's `KeyCode`/`KeyModifiers` directly; [`Key`] only
//! normalizes them so that lookups in binding tables are stable:
//! `Char` codes carry their case, so `SHIFT` is dropped from them, and
//! `BackTab` never carries `SHIFT`.

use crate::error::{AppError, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::fmt;
use std::str::FromStr;

/// A key press as seen by bindings and views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl Key {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let mut modifiers = modifiers & (KeyModifiers::SHIFT | KeyModifiers::CONTROL | KeyModifiers::ALT);
        if matches!(code, KeyCode::Char(_) | KeyCode::BackTab) {
            modifiers.remove(KeyModifiers::SHIFT);
        }
        Self { code, modifiers }
    }

    /// Plain character key
    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    /// Ctrl + lowercase character
    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c.to_ascii_lowercase()), KeyModifiers::CONTROL)
    }

    pub fn code(&self) -> KeyCode {
        self.code
    }

    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }

    pub fn with_modifiers(self, modifiers: KeyModifiers) -> Self {
        Self::new(self.code, self.modifiers | modifiers)
    }

    pub fn is_ctrl(&self) -> bool {
        self.modifiers.contains(KeyModifiers::CONTROL)
    }

    pub fn is_alt(&self) -> bool {
        self.modifiers.contains(KeyModifiers::ALT)
    }

    pub fn is_shift(&self) -> bool {
        self.modifiers.contains(KeyModifiers::SHIFT)
            || matches!(self.code, KeyCode::BackTab)
            || matches!(self.code, KeyCode::Char(c) if c.is_uppercase())
    }
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }
}

impl From<KeyEvent> for Key {
    fn from(event: KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }
}

fn named_code(name: &str) -> Option<KeyCode> {
    let code = match name.to_ascii_lowercase().as_str() {
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "space" => KeyCode::Char(' '),
        other => {
            let n = other.strip_prefix('f')?.parse::<u8>().ok()?;
            if (1..=24).contains(&n) {
                KeyCode::F(n)
            } else {
                return None;
            }
        }
    };
    Some(code)
}

impl FromStr for Key {
    type Err = AppError;

    /// Parse specs like `"Esc"`, `"Ctrl+Z"`, `"Shift+F6"`, `"Alt+x"`.
    ///
    /// Letters are case-insensitive and produce the lowercase key unless
    /// `Shift` is given. `Shift+Tab` becomes `BackTab`.
    fn from_str(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split('+').map(str::trim).collect();
        let (name, mods) = match parts.split_last() {
            // "Ctrl++" splits into ["Ctrl", "", ""]
            Some((last, rest)) if last.is_empty() && rest.last() == Some(&"") => {
                ("+", &rest[..rest.len() - 1])
            }
            Some((last, rest)) if !last.is_empty() => (*last, rest),
            _ => return Err(AppError::invalid_key(spec)),
        };

        let mut modifiers = KeyModifiers::NONE;
        for m in mods {
            match m.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" | "meta" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                _ => return Err(AppError::invalid_key(spec)),
            }
        }

        let shift = modifiers.contains(KeyModifiers::SHIFT);
        let mut chars = name.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                if shift {
                    KeyCode::Char(c.to_ascii_uppercase())
                } else {
                    KeyCode::Char(c.to_ascii_lowercase())
                }
            }
            (Some(c), None) => KeyCode::Char(c),
            _ => match named_code(name) {
                Some(KeyCode::Tab) if shift => KeyCode::BackTab,
                Some(code) => code,
                None => return Err(AppError::invalid_key(spec)),
            },
        };

        Ok(Key::new(code, modifiers))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ctrl() {
            f.write_str("Ctrl+")?;
        }
        if self.is_alt() {
            f.write_str("Alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("Shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) if c.is_ascii_uppercase() => write!(f, "Shift+{c}"),
            KeyCode::Char(c) if c.is_ascii_lowercase() => write!(f, "{}", c.to_ascii_uppercase()),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "F{n}"),
            KeyCode::BackTab => f.write_str("Shift+Tab"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Delete => f.write_str("Delete"),
            KeyCode::Insert => f.write_str("Insert"),
            KeyCode::Home => f.write_str("Home"),
            KeyCode::End => f.write_str("End"),
            KeyCode::PageUp => f.write_str("PageUp"),
            KeyCode::PageDown => f.write_str("PageDown"),
            KeyCode::Up => f.write_str("Up"),
            KeyCode::Down => f.write_str("Down"),
            KeyCode::Left => f.write_str("Left"),
            KeyCode::Right => f.write_str("Right"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Args for the application `key_down`/`key_up` events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEventArgs {
    pub key: Key,
    pub handled: bool,
}

impl KeyEventArgs {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            handled: false,
        }
    }
}
