//! Application error types

use crate::input::Command;
use crate::view::ViewId;
use std::path::PathBuf;
use tessera_config::ConfigError;
use thiserror::Error;

/// Errors raised by the application core.
///
/// Contract violations mean the host broke the API contract and are never
/// retried. Recoverable conditions (removing an unknown timeout, ungrabbing
/// with no grab, stopping a stopped toplevel) are not errors at all and
/// report `false` instead.
#[derive(Debug, Error)]
pub enum AppError {
    /// `init` called again with an explicit driver before `shutdown`
    #[error("Application is already initialized; call shutdown before init")]
    AlreadyInitialized,

    /// Operation needs an initialized application
    #[error("Application is not initialized")]
    NotInitialized,

    /// `end` called with a run state that is not the top of the stack
    #[error("End must be balanced with calls to Begin: expected {expected:?}, got {actual}")]
    UnbalancedEnd {
        /// Toplevel currently on top of the stack
        expected: Option<ViewId>,
        /// Toplevel of the run state passed to `end`
        actual: ViewId,
    },

    /// The run state was already ended
    #[error("Run state has already been ended")]
    RunStateEnded,

    /// Two different toplevels on the stack share an id
    #[error("Duplicate toplevel id on the stack: {0}")]
    DuplicateToplevelId(String),

    /// A bound command has no implementation
    #[error("No implementation registered for command {0:?}")]
    CommandNotSupported(Command),

    /// `grab_mouse` while another view holds the grab
    #[error("Mouse is already grabbed by {holder}; ungrab before grabbing {requested}")]
    MouseAlreadyGrabbed {
        /// View holding the grab
        holder: ViewId,
        /// View that asked for it
        requested: ViewId,
    },

    /// `KeyBindings::add` for a key that is already bound
    #[error("A key binding for {0} already exists")]
    DuplicateKeyBinding(String),

    /// Handle points at a view that was removed
    #[error("View {0} no longer exists")]
    StaleView(ViewId),

    /// `add_child` would make a view its own ancestor
    #[error("Cannot add {child} under {parent}: it would become its own ancestor")]
    InvalidParent {
        /// Requested parent
        parent: ViewId,
        /// View being attached
        child: ViewId,
    },

    /// Removing a view whose subtree holds a toplevel that is still on the stack
    #[error("Toplevel {0} is still on the stack; end it before removing it")]
    ToplevelOnStack(ViewId),

    /// View is not a toplevel
    #[error("View {0} is not a toplevel")]
    NotAToplevel(ViewId),

    /// Synchronous send from the main thread would wait on itself forever
    #[error("Synchronous send called from the main thread")]
    SendFromMainThread,

    /// The application went away before a cross-thread call completed
    #[error("Application main loop is gone")]
    Disconnected,

    /// No driver registered under the requested name
    #[error("Unknown console driver: {0}")]
    UnknownDriver(String),

    /// Driver could not acquire the console
    #[error("Failed to initialize driver {driver}: {source}")]
    DriverInit {
        /// Driver short name
        driver: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Driver I/O failure after initialization
    #[error("Driver I/O error: {0}")]
    Driver(#[from] std::io::Error),

    /// Key spec could not be parsed
    #[error("Invalid key spec: {0}")]
    InvalidKey(String),

    /// Command name could not be parsed
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Configuration failed to load or validate
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Log filter directives did not parse
    #[error("Invalid log filter {filter:?}: {source}")]
    LogFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// Log file could not be opened for appending
    #[error("Failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber is already installed
    #[error("Failed to install log subscriber: {0}")]
    LogSubscriber(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Specialized Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Create an invalid key error
    pub fn invalid_key(spec: impl Into<String>) -> Self {
        Self::InvalidKey(spec.into())
    }

    /// Whether the host violated the API contract
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInitialized
                | Self::NotInitialized
                | Self::UnbalancedEnd { .. }
                | Self::RunStateEnded
                | Self::DuplicateToplevelId(_)
                | Self::CommandNotSupported(_)
                | Self::MouseAlreadyGrabbed { .. }
                | Self::DuplicateKeyBinding(_)
                | Self::StaleView(_)
                | Self::InvalidParent { .. }
                | Self::ToplevelOnStack(_)
                | Self::NotAToplevel(_)
                | Self::SendFromMainThread
        )
    }

    /// Short category name for logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::DriverInit { .. } | Self::Driver(_) | Self::UnknownDriver(_) => "driver",
            Self::InvalidKey(_) | Self::UnknownCommand(_) | Self::Config(_) => "config",
            Self::Disconnected => "disconnected",
            Self::LogFilter { .. } | Self::LogFile { .. } | Self::LogSubscriber(_) => "logging",
            _ => "contract",
        }
    }
}
