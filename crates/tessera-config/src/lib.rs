//! # Tessera Configuration Library
//!
//! Configuration for the tessera terminal UI toolkit. Hosts load an
//! [`ApplicationConfig`] (usually from a TOML file) and hand it to the
//! application core, which resolves key specs and the console driver from it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tessera_config::ConfigLoader;
//!
//! let mut config = ConfigLoader::load_or_default("tessera.toml")?;
//! config.apply_env_overrides();
//! config.validate()?;
//! # Ok::<(), tessera_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::*;
pub use loader::*;
