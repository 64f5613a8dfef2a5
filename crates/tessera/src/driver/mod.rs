//! Console drivers
//!
//! A driver owns the terminal: it writes text, places the cursor and turns
//! platform input into [`DriverEvent`]s delivered through the
//! [`MainLoopDriver`] it returns from [`ConsoleDriver::init`].

mod crossterm_driver;
mod fake;
mod registry;

pub use crossterm_driver::CrosstermDriver;
pub use fake::{FakeDriver, FakeHandle};
pub use registry::{DriverFactory, DriverRegistry};

use crate::geometry::{Point, Rect, Size};
use crate::input::{Key, MouseEvent};
use crate::main_loop::MainLoopDriver;
use std::io;

/// Input delivered by a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Resize(Size),
    KeyDown(Key),
    KeyUp(Key),
    Mouse(MouseEvent),
}

pub trait ConsoleDriver {
    /// Short registry name
    fn name(&self) -> &str;

    /// Acquire the console and start input
    fn init(&mut self) -> io::Result<Box<dyn MainLoopDriver>>;

    /// Release the console. Safe to call more than once.
    fn end(&mut self) -> io::Result<()>;

    /// Screen bounds, origin at the top-left cell
    fn screen(&self) -> Rect;

    /// Write `text` starting at `at`. Cells outside the screen are dropped.
    fn write_str(&mut self, at: Point, text: &str);

    fn clear(&mut self);

    /// Flush pending writes to the terminal
    fn update_screen(&mut self) -> io::Result<()>;

    /// Place the cursor, or hide it with `None`
    fn set_cursor_position(&mut self, position: Option<Point>);

    fn cursor_visible(&self) -> bool;

    fn set_cursor_visible(&mut self, visible: bool);

    /// Hand the terminal back to the shell until the process is resumed
    fn suspend(&mut self) -> io::Result<()>;
}
