//! Headless driver for tests
//!
//! Keeps the screen as rows of chars and records cursor state. Input is
//! scripted through a [`FakeHandle`], which stays usable after the driver
//! itself has been moved into an application.

use super::{ConsoleDriver, DriverEvent};
use crate::geometry::{Point, Rect, Size};
use crate::input::{Key, MouseEvent};
use crate::main_loop::{ChannelLoopDriver, LoopSignal, MainLoopDriver};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

#[derive(Debug)]
struct FakeScreen {
    size: Size,
    rows: Vec<Vec<char>>,
    cursor: Option<Point>,
    cursor_visible: bool,
    active: bool,
    fail_init: bool,
    updates: usize,
    suspends: usize,
}

impl FakeScreen {
    fn new(size: Size) -> Self {
        Self {
            size,
            rows: blank_rows(size),
            cursor: None,
            cursor_visible: true,
            active: false,
            fail_init: false,
            updates: 0,
            suspends: 0,
        }
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
        self.rows = blank_rows(size);
    }
}

fn blank_rows(size: Size) -> Vec<Vec<char>> {
    vec![vec![' '; usize::from(size.width)]; usize::from(size.height)]
}

pub struct FakeDriver {
    screen: Arc<Mutex<FakeScreen>>,
    tx: flume::Sender<LoopSignal>,
    rx: flume::Receiver<LoopSignal>,
}

impl FakeDriver {
    pub const DEFAULT_SIZE: Size = Size::new(80, 25);

    pub fn new() -> Self {
        Self::with_size(Self::DEFAULT_SIZE)
    }

    pub fn with_size(size: Size) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            screen: Arc::new(Mutex::new(FakeScreen::new(size))),
            tx,
            rx,
        }
    }

    /// Driver whose `init` fails, for exercising init error paths
    pub fn failing() -> Self {
        let driver = Self::new();
        driver.screen.lock().fail_init = true;
        driver
    }

    pub fn handle(&self) -> FakeHandle {
        FakeHandle {
            screen: self.screen.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleDriver for FakeDriver {
    fn name(&self) -> &str {
        "fake"
    }

    fn init(&mut self) -> io::Result<Box<dyn MainLoopDriver>> {
        let mut screen = self.screen.lock();
        if screen.fail_init {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no console attached"));
        }
        screen.active = true;
        Ok(Box::new(ChannelLoopDriver::with_channel(
            self.tx.clone(),
            self.rx.clone(),
        )))
    }

    fn end(&mut self) -> io::Result<()> {
        self.screen.lock().active = false;
        Ok(())
    }

    fn screen(&self) -> Rect {
        Rect::from_size(self.screen.lock().size)
    }

    fn write_str(&mut self, at: Point, text: &str) {
        let mut screen = self.screen.lock();
        let Some(row) = usize::try_from(at.y)
            .ok()
            .and_then(|y| screen.rows.get_mut(y))
        else {
            return;
        };
        let mut x = at.x;
        for ch in text.chars() {
            if let Some(cell) = usize::try_from(x).ok().and_then(|x| row.get_mut(x)) {
                *cell = ch;
            }
            x += 1;
        }
    }

    fn clear(&mut self) {
        let mut screen = self.screen.lock();
        let size = screen.size;
        screen.rows = blank_rows(size);
    }

    fn update_screen(&mut self) -> io::Result<()> {
        self.screen.lock().updates += 1;
        Ok(())
    }

    fn set_cursor_position(&mut self, position: Option<Point>) {
        let mut screen = self.screen.lock();
        screen.cursor = position;
        screen.cursor_visible = position.is_some();
    }

    fn cursor_visible(&self) -> bool {
        self.screen.lock().cursor_visible
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.screen.lock().cursor_visible = visible;
    }

    fn suspend(&mut self) -> io::Result<()> {
        self.screen.lock().suspends += 1;
        Ok(())
    }
}

/// Scripted input and screen inspection for a [`FakeDriver`]
#[derive(Clone)]
pub struct FakeHandle {
    screen: Arc<Mutex<FakeScreen>>,
    tx: flume::Sender<LoopSignal>,
}

impl FakeHandle {
    fn send(&self, event: DriverEvent) {
        // receiver lives as long as the driver; a dropped driver has no loop to feed
        let _ = self.tx.send(LoopSignal::Input(event));
    }

    pub fn key_down(&self, key: Key) {
        self.send(DriverEvent::KeyDown(key));
    }

    pub fn key_up(&self, key: Key) {
        self.send(DriverEvent::KeyUp(key));
    }

    /// Key down followed by key up
    pub fn press(&self, key: Key) {
        self.key_down(key);
        self.key_up(key);
    }

    pub fn mouse(&self, event: MouseEvent) {
        self.send(DriverEvent::Mouse(event));
    }

    /// Change the screen size and report it
    pub fn resize(&self, size: Size) {
        self.screen.lock().resize(size);
        self.send(DriverEvent::Resize(size));
    }

    /// Row `y` of the screen, trailing blanks trimmed
    pub fn line(&self, y: usize) -> String {
        self.screen
            .lock()
            .rows
            .get(y)
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .unwrap_or_default()
    }

    pub fn cursor(&self) -> Option<Point> {
        self.screen.lock().cursor
    }

    pub fn cursor_visible(&self) -> bool {
        self.screen.lock().cursor_visible
    }

    /// Whether the driver is between `init` and `end`
    pub fn is_active(&self) -> bool {
        self.screen.lock().active
    }

    pub fn update_count(&self) -> usize {
        self.screen.lock().updates
    }

    pub fn suspend_count(&self) -> usize {
        self.screen.lock().suspends
    }
}
