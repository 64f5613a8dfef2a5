//! Configuration types for the application core

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides [`ApplicationConfig::driver`]
pub const DRIVER_ENV_VAR: &str = "TESSERA_DRIVER";

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Short name of the console driver to use (`crossterm`, `fake`, ...).
    /// `None` selects the platform default.
    #[serde(default)]
    pub driver: Option<String>,
    /// Whether mouse events are routed at all
    #[serde(default = "default_true")]
    pub mouse_enabled: bool,
    /// Key specs for the built-in application commands
    #[serde(default)]
    pub keys: KeysConfig,
    /// Main loop tuning
    #[serde(default)]
    pub main_loop: MainLoopConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool {
    true
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            driver: None,
            mouse_enabled: true,
            keys: KeysConfig::default(),
            main_loop: MainLoopConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ApplicationConfig {
    /// Apply overrides from the process environment.
    ///
    /// `TESSERA_DRIVER` replaces the configured driver name when set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var(DRIVER_ENV_VAR) {
            let name = name.trim();
            if !name.is_empty() {
                tracing::debug!(driver = name, "driver overridden from environment");
                self.driver = Some(name.to_string());
            }
        }
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(driver) = &self.driver {
            if driver.trim().is_empty() {
                return Err(ConfigError::invalid("driver name must not be empty"));
            }
        }
        for (name, spec) in self.keys.entries() {
            if spec.trim().is_empty() {
                return Err(ConfigError::invalid(format!("keys.{name} must not be empty")));
            }
        }
        if self.main_loop.send_poll_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "main_loop.send_poll_interval_ms must be at least 1",
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::invalid("logging.filter must not be empty"));
        }
        Ok(())
    }
}

/// Key specs for the application-scoped commands.
///
/// Specs are `+`-separated modifier names followed by a key name, e.g.
/// `"Ctrl+Z"`, `"Shift+F6"`, `"Esc"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Stops the current toplevel
    #[serde(default = "default_quit")]
    pub quit: String,
    /// Suspends the process (unix job control)
    #[serde(default = "default_suspend")]
    pub suspend: String,
    /// Moves focus to the next view
    #[serde(default = "default_next_view")]
    pub next_view: String,
    /// Moves focus to the previous view
    #[serde(default = "default_previous_view")]
    pub previous_view: String,
    /// Moves focus to the next tab group or overlapped toplevel
    #[serde(default = "default_next_view_or_top")]
    pub next_view_or_top: String,
    /// Moves focus to the previous tab group or overlapped toplevel
    #[serde(default = "default_previous_view_or_top")]
    pub previous_view_or_top: String,
    /// Redraws the whole screen
    #[serde(default = "default_refresh")]
    pub refresh: String,
}

fn default_quit() -> String {
    "Esc".to_string()
}
fn default_suspend() -> String {
    "Ctrl+Z".to_string()
}
fn default_next_view() -> String {
    "Tab".to_string()
}
fn default_previous_view() -> String {
    "Shift+Tab".to_string()
}
fn default_next_view_or_top() -> String {
    "F6".to_string()
}
fn default_previous_view_or_top() -> String {
    "Shift+F6".to_string()
}
fn default_refresh() -> String {
    "Ctrl+L".to_string()
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            suspend: default_suspend(),
            next_view: default_next_view(),
            previous_view: default_previous_view(),
            next_view_or_top: default_next_view_or_top(),
            previous_view_or_top: default_previous_view_or_top(),
            refresh: default_refresh(),
        }
    }
}

impl KeysConfig {
    /// All `(command name, key spec)` pairs, in a stable order.
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("quit", &self.quit),
            ("suspend", &self.suspend),
            ("next_view", &self.next_view),
            ("previous_view", &self.previous_view),
            ("next_view_or_top", &self.next_view_or_top),
            ("previous_view_or_top", &self.previous_view_or_top),
            ("refresh", &self.refresh),
        ]
    }
}

/// Main loop tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainLoopConfig {
    /// Upper bound for a single blocking wait in `events_pending`.
    /// `None` waits until input, a timer deadline, or a wakeup.
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
    /// Sleep between polls while a cross-thread `send` waits for the main thread
    #[serde(default = "default_send_poll_interval")]
    pub send_poll_interval_ms: u64,
}

fn default_send_poll_interval() -> u64 {
    15
}

impl Default for MainLoopConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: None,
            send_poll_interval_ms: default_send_poll_interval(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Log file. The terminal belongs to the driver, so logs never go to stdout.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "tessera=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}
