use super::{ConsoleDriver, DriverEvent};
use crate::geometry::{Point, Rect, Size};
use crate::input::{Key, MouseEvent};
use crate::main_loop::{ChannelLoopDriver, LoopSignal, MainLoopDriver};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CtEvent, KeyEventKind,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Driver for real terminals
pub struct CrosstermDriver {
    stdout: Stdout,
    size: Size,
    active: bool,
    keyboard_enhanced: bool,
    cursor_visible: bool,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl CrosstermDriver {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            size: Size::default(),
            active: false,
            keyboard_enhanced: false,
            cursor_visible: true,
            stop: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    fn enter(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false)
            && execute!(
                self.stdout,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )
            .is_ok()
        {
            self.keyboard_enhanced = true;
            tracing::debug!("keyboard enhancement enabled, key releases reported");
        }

        let entered = execute!(self.stdout, EnterAlternateScreen, EnableMouseCapture, Hide);
        undo_on_error(entered, || self.abandon_enter())
    }

    /// Best-effort restore after `enter` failed part way through
    fn abandon_enter(&mut self) {
        let _ = execute!(self.stdout, Show, DisableMouseCapture, LeaveAlternateScreen);
        if self.keyboard_enhanced {
            let _ = execute!(self.stdout, PopKeyboardEnhancementFlags);
            self.keyboard_enhanced = false;
        }
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!(error = %e, "failed to leave raw mode");
        }
    }

    fn leave(&mut self) -> io::Result<()> {
        execute!(self.stdout, Show, DisableMouseCapture, LeaveAlternateScreen)?;
        if self.keyboard_enhanced {
            let _ = execute!(self.stdout, PopKeyboardEnhancementFlags);
            self.keyboard_enhanced = false;
        }
        terminal::disable_raw_mode()?;
        self.stdout.flush()
    }

    fn stop_reader(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::warn!("input reader thread panicked");
            }
        }
    }
}

impl Default for CrosstermDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CrosstermDriver {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.end() {
                tracing::warn!(error = %e, "failed to restore terminal");
            }
        }
    }
}

/// Run `undo` when `result` is an error, then hand the result back
fn undo_on_error<T>(result: io::Result<T>, undo: impl FnOnce()) -> io::Result<T> {
    if result.is_err() {
        undo();
    }
    result
}

fn translate(event: CtEvent, keyboard_enhanced: bool) -> Vec<DriverEvent> {
    match event {
        CtEvent::Key(key) => {
            let k = Key::from(key);
            match key.kind {
                KeyEventKind::Release => vec![DriverEvent::KeyUp(k)],
                _ if keyboard_enhanced => vec![DriverEvent::KeyDown(k)],
                // no release reports; pair every press with an up
                _ => vec![DriverEvent::KeyDown(k), DriverEvent::KeyUp(k)],
            }
        }
        CtEvent::Mouse(mouse) => vec![DriverEvent::Mouse(MouseEvent::from(mouse))],
        CtEvent::Resize(width, height) => vec![DriverEvent::Resize(Size::new(width, height))],
        _ => Vec::new(),
    }
}

fn spawn_reader(
    tx: flume::Sender<LoopSignal>,
    stop: Arc<AtomicBool>,
    keyboard_enhanced: bool,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("tessera-input".into())
        .spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                match event::poll(POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "input poll failed");
                        break;
                    }
                }
                let event = match event::read() {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "input read failed");
                        break;
                    }
                };
                for event in translate(event, keyboard_enhanced) {
                    if tx.send(LoopSignal::Input(event)).is_err() {
                        return;
                    }
                }
            }
        })
}

impl ConsoleDriver for CrosstermDriver {
    fn name(&self) -> &str {
        "crossterm"
    }

    fn init(&mut self) -> io::Result<Box<dyn MainLoopDriver>> {
        let (width, height) = terminal::size()?;
        self.size = Size::new(width, height);
        self.enter()?;
        self.active = true;

        let loop_driver = ChannelLoopDriver::new();
        self.stop = Arc::new(AtomicBool::new(false));
        self.reader = Some(spawn_reader(
            loop_driver.sender(),
            self.stop.clone(),
            self.keyboard_enhanced,
        )?);
        tracing::debug!(width, height, "crossterm driver initialized");
        Ok(Box::new(loop_driver))
    }

    fn end(&mut self) -> io::Result<()> {
        self.stop_reader();
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.leave()
    }

    fn screen(&self) -> Rect {
        let size = terminal::size()
            .map(|(w, h)| Size::new(w, h))
            .unwrap_or(self.size);
        Rect::from_size(size)
    }

    fn write_str(&mut self, at: Point, text: &str) {
        let (Ok(x), Ok(y)) = (u16::try_from(at.x), u16::try_from(at.y)) else {
            return;
        };
        if let Err(e) = queue!(self.stdout, MoveTo(x, y), Print(text)) {
            tracing::warn!(error = %e, "write failed");
        }
    }

    fn clear(&mut self) {
        if let Err(e) = queue!(self.stdout, Clear(ClearType::All)) {
            tracing::warn!(error = %e, "clear failed");
        }
    }

    fn update_screen(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }

    fn set_cursor_position(&mut self, position: Option<Point>) {
        let target = position.and_then(|p| Some((u16::try_from(p.x).ok()?, u16::try_from(p.y).ok()?)));
        let result = match target {
            Some((x, y)) => {
                self.cursor_visible = true;
                queue!(self.stdout, MoveTo(x, y), Show)
            }
            None => {
                self.cursor_visible = false;
                queue!(self.stdout, Hide)
            }
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "cursor update failed");
        }
    }

    fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
        let result = if visible {
            queue!(self.stdout, Show)
        } else {
            queue!(self.stdout, Hide)
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "cursor update failed");
        }
    }

    #[cfg(unix)]
    fn suspend(&mut self) -> io::Result<()> {
        self.leave()?;
        // SAFETY: raising a signal on our own process; execution resumes on SIGCONT
        let rc = unsafe { libc::raise(libc::SIGTSTP) };
        if rc != 0 {
            tracing::warn!("SIGTSTP could not be raised");
        }
        self.enter()
    }

    #[cfg(not(unix))]
    fn suspend(&mut self) -> io::Result<()> {
        tracing::debug!("suspend is not supported on this platform");
        Ok(())
    }
}
