//! Loading configuration from TOML files

use crate::config::ApplicationConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;

/// Loads [`ApplicationConfig`] values
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> ConfigResult<ApplicationConfig> {
        let config: ApplicationConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<ApplicationConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults when it does not exist.
    ///
    /// Other read failures and parse failures are still errors.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<ApplicationConfig> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(ApplicationConfig::default());
        }
        Self::load_from_file(path)
    }
}
