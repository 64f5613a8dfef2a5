//! # Tessera
//!
//! Core of a terminal UI toolkit: the application context, its main loop,
//! input routing and the toplevel stack.
//!
//! A host builds an [`Application`], calls [`Application::init`] to acquire a
//! console driver, adds views, and runs a toplevel:
//!
//! ```rust,no_run
//! use tessera::{Application, Container, ToplevelOptions};
//! use tessera::tessera_config::ApplicationConfig;
//!
//! let mut app = Application::new(ApplicationConfig::default());
//! app.init(None, None)?;
//! let top = app.add_toplevel(Container, ToplevelOptions::new("main"));
//! app.run(top)?;
//! app.shutdown();
//! # Ok::<(), tessera::AppError>(())
//! ```

pub mod application;
pub mod driver;
pub mod error;
pub mod event;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod main_loop;
pub mod view;

pub use application::{Application, ApplicationEvents, CommandHandler, Invoker, RunState, StateSnapshot};
pub use driver::{ConsoleDriver, DriverEvent, DriverRegistry, FakeDriver, FakeHandle};
pub use error::{AppError, Result};
pub use event::{EventHandlers, SubscriptionId};
pub use geometry::{Point, Rect, Size};
pub use input::{Command, Key, KeyBinding, KeyBindingScope, KeyBindings, MouseEvent};
pub use main_loop::{IdleId, MainLoop, TimeoutId};
pub use view::{Container, EventContext, ToplevelOptions, View, ViewId};

pub use tessera_config;
