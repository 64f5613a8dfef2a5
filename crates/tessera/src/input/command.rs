//! Commands that key bindings resolve to

use crate::error::AppError;
use std::fmt;
use std::str::FromStr;

/// What a key binding does - the semantic layer between keys and behavior.
///
/// The application implements the first seven; views implement whichever
/// they bind in their own tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Quit,
    Suspend,
    NextView,
    PreviousView,
    NextViewOrTop,
    PreviousViewOrTop,
    Refresh,
    Accept,
    Cancel,
    HotKey,
    ScrollUp,
    ScrollDown,
    Arrange,
}

impl Command {
    pub const ALL: [Command; 13] = [
        Command::Quit,
        Command::Suspend,
        Command::NextView,
        Command::PreviousView,
        Command::NextViewOrTop,
        Command::PreviousViewOrTop,
        Command::Refresh,
        Command::Accept,
        Command::Cancel,
        Command::HotKey,
        Command::ScrollUp,
        Command::ScrollDown,
        Command::Arrange,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::Quit => "quit",
            Command::Suspend => "suspend",
            Command::NextView => "next_view",
            Command::PreviousView => "previous_view",
            Command::NextViewOrTop => "next_view_or_top",
            Command::PreviousViewOrTop => "previous_view_or_top",
            Command::Refresh => "refresh",
            Command::Accept => "accept",
            Command::Cancel => "cancel",
            Command::HotKey => "hot_key",
            Command::ScrollUp => "scroll_up",
            Command::ScrollDown => "scroll_down",
            Command::Arrange => "arrange",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = AppError;

    /// Accepts snake_case, kebab-case or PascalCase names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Command::ALL
            .into_iter()
            .find(|c| c.name().replace('_', "") == normalized)
            .ok_or_else(|| AppError::UnknownCommand(s.to_string()))
    }
}
