//! Platform side of the main loop
//!
//! A console driver hands the main loop a [`MainLoopDriver`] at init. The
//! loop asks it whether input is pending (blocking up to a deadline), pumps
//! it for events, and wakes it from other threads through a [`Waker`].

use crate::driver::DriverEvent;
use std::io;
use std::time::Duration;

pub trait MainLoopDriver {
    /// Wait up to `wait` (forever when `None`) for input or a wakeup.
    /// Returns `true` if either arrived.
    fn events_pending(&mut self, wait: Option<Duration>) -> io::Result<bool>;

    /// Take the input collected by the last `events_pending`
    fn iteration(&mut self) -> Vec<DriverEvent>;

    fn waker(&self) -> Waker;

    fn tear_down(&mut self);
}

/// What a driver's input source sends to the loop
#[derive(Debug, Clone)]
pub enum LoopSignal {
    Input(DriverEvent),
    Wake,
}

/// Breaks a blocking [`MainLoopDriver::events_pending`] wait. Safe from any thread.
#[derive(Debug, Clone)]
pub struct Waker {
    tx: flume::Sender<LoopSignal>,
}

impl Waker {
    pub fn wake(&self) {
        // the loop is gone if the receiver dropped; nothing to wake
        let _ = self.tx.send(LoopSignal::Wake);
    }
}

/// [`MainLoopDriver`] fed through a channel.
///
/// Used by both built-in drivers: the crossterm reader thread and the fake
/// driver's input handle push [`LoopSignal::Input`] into the sender.
#[derive(Debug)]
pub struct ChannelLoopDriver {
    tx: flume::Sender<LoopSignal>,
    rx: flume::Receiver<LoopSignal>,
    pending: Vec<DriverEvent>,
}

impl ChannelLoopDriver {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx,
            rx,
            pending: Vec::new(),
        }
    }

    /// Build over an existing channel
    pub fn with_channel(tx: flume::Sender<LoopSignal>, rx: flume::Receiver<LoopSignal>) -> Self {
        Self {
            tx,
            rx,
            pending: Vec::new(),
        }
    }

    /// Sender for an input source
    pub fn sender(&self) -> flume::Sender<LoopSignal> {
        self.tx.clone()
    }

    fn accept(&mut self, signal: LoopSignal) {
        if let LoopSignal::Input(event) = signal {
            self.pending.push(event);
        }
    }
}

impl Default for ChannelLoopDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MainLoopDriver for ChannelLoopDriver {
    fn events_pending(&mut self, wait: Option<Duration>) -> io::Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }

        let first = match wait {
            Some(wait) if wait.is_zero() => self.rx.try_recv().ok(),
            Some(wait) => self.rx.recv_timeout(wait).ok(),
            None => self.rx.recv().ok(),
        };
        let Some(first) = first else {
            return Ok(false);
        };

        self.accept(first);
        while let Ok(signal) = self.rx.try_recv() {
            self.accept(signal);
        }
        Ok(true)
    }

    fn iteration(&mut self) -> Vec<DriverEvent> {
        std::mem::take(&mut self.pending)
    }

    fn waker(&self) -> Waker {
        Waker {
            tx: self.tx.clone(),
        }
    }

    fn tear_down(&mut self) {
        self.pending.clear();
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use std::thread;

    #[test]
    fn zero_wait_does_not_block() {
        let mut driver = ChannelLoopDriver::new();
        assert!(!driver.events_pending(Some(Duration::ZERO)).unwrap());
    }

    #[test]
    fn input_is_collected_in_order() {
        let mut driver = ChannelLoopDriver::new();
        let tx = driver.sender();
        tx.send(LoopSignal::Input(DriverEvent::Resize(Size::new(10, 5))))
            .unwrap();
        tx.send(LoopSignal::Wake).unwrap();
        tx.send(LoopSignal::Input(DriverEvent::Resize(Size::new(20, 5))))
            .unwrap();

        assert!(driver.events_pending(Some(Duration::ZERO)).unwrap());
        let events = driver.iteration();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], DriverEvent::Resize(s) if s.width == 20));
        assert!(driver.iteration().is_empty());
    }

    #[test]
    fn wake_from_another_thread_unblocks_wait() {
        let mut driver = ChannelLoopDriver::new();
        let waker = driver.waker();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waker.wake();
        });

        assert!(driver.events_pending(None).unwrap());
        assert!(driver.iteration().is_empty());
        handle.join().unwrap();
    }
}
