//! File logging setup
//!
//! The console belongs to the driver while the application runs, so log
//! output goes to a file or nowhere.

use crate::error::{AppError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tessera_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG` when set, else from the configured directives
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    parse_filter(&config.filter)
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|source| AppError::LogFilter {
        filter: directives.to_string(),
        source,
    })
}

/// Install a global subscriber appending to `config.file`.
///
/// Returns `Ok(false)` without installing anything when no file is set.
pub fn init_file_logging(config: &LoggingConfig) -> Result<bool> {
    let Some(path) = &config.file else {
        return Ok(false);
    };
    let filter = build_filter(config)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AppError::LogFile {
            path: path.clone(),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(AppError::LogSubscriber)?;

    tracing::info!(path = %path.display(), "logging to file");
    Ok(true)
}
