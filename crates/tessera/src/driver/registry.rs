//! Name → driver factory lookup

use super::{ConsoleDriver, CrosstermDriver, FakeDriver};
use crate::error::{AppError, Result};
use std::fmt;

pub type DriverFactory = Box<dyn Fn() -> Box<dyn ConsoleDriver> + Send + Sync>;

/// Drivers selectable by short name. Names are case-insensitive.
pub struct DriverRegistry {
    factories: Vec<(String, DriverFactory)>,
    default: String,
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("names", &self.names())
            .field("default", &self.default)
            .finish()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl DriverRegistry {
    /// Empty registry with `default` as the fallback name
    pub fn empty(default: impl Into<String>) -> Self {
        Self {
            factories: Vec::new(),
            default: default.into().to_ascii_lowercase(),
        }
    }

    /// `crossterm` (default) and `fake`
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty("crossterm");
        registry.register("crossterm", || Box::new(CrosstermDriver::new()));
        registry.register("fake", || Box::new(FakeDriver::new()));
        registry
    }

    /// Add or replace a factory
    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn() -> Box<dyn ConsoleDriver> + Send + Sync + 'static,
    ) {
        let name = name.to_ascii_lowercase();
        self.factories.retain(|(n, _)| *n != name);
        self.factories.push((name, Box::new(factory)));
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.factories.iter().any(|(n, _)| *n == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    /// Build the driver registered as `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn ConsoleDriver>> {
        let wanted = name.to_ascii_lowercase();
        self.factories
            .iter()
            .find(|(n, _)| *n == wanted)
            .map(|(_, factory)| factory())
            .ok_or_else(|| AppError::UnknownDriver(name.to_string()))
    }

    /// Build `name`, or the default driver when `None`
    pub fn create_or_default(&self, name: Option<&str>) -> Result<Box<dyn ConsoleDriver>> {
        self.create(name.unwrap_or(&self.default))
    }
}
