//! Cooperative single-threaded main loop
//!
//! Each iteration, in order:
//! 1. fires every timeout whose deadline has passed, rescheduling the ones
//!    that return `true` at `now + span`;
//! 2. pumps the driver and dispatches its input events to the host one at a
//!    time, then moves cross-thread invocations onto the idle list;
//! 3. runs every idle handler that was queued before step 3 started.
//!
//! Callbacks get `&mut H`, the host that owns the loop. The loop is reached
//! through [`LoopHost::main_loop`] again after every callback because the
//! callback may have changed it.

pub mod clock;
pub mod driver;
pub mod scheduler;

use crate::driver::DriverEvent;
use crate::error::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use driver::{ChannelLoopDriver, LoopSignal, MainLoopDriver, Waker};
pub use scheduler::{IdleId, Scheduler, TimeoutId};

/// Work sent to the main thread from elsewhere
pub type Invocation<H> = Box<dyn FnOnce(&mut H) + Send>;

/// Owner of a [`MainLoop`]
pub trait LoopHost: Sized + 'static {
    fn main_loop(&mut self) -> Result<&mut MainLoop<Self>>;

    /// Handle one input event pumped from the driver
    fn dispatch(&mut self, event: DriverEvent) -> Result<()>;
}

pub struct MainLoop<H> {
    driver: Box<dyn MainLoopDriver>,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler<H>,
    input: VecDeque<DriverEvent>,
    invoke_tx: flume::Sender<Invocation<H>>,
    invoke_rx: flume::Receiver<Invocation<H>>,
    running: bool,
    max_wait: Option<Duration>,
}

impl<H> std::fmt::Debug for MainLoop<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoop")
            .field("scheduler", &self.scheduler)
            .field("input", &self.input.len())
            .field("running", &self.running)
            .field("max_wait", &self.max_wait)
            .finish()
    }
}

impl<H: LoopHost> MainLoop<H> {
    pub fn new(driver: Box<dyn MainLoopDriver>) -> Self {
        Self::with_clock(driver, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(driver: Box<dyn MainLoopDriver>, clock: Arc<dyn Clock>) -> Self {
        let (invoke_tx, invoke_rx) = flume::unbounded();
        Self {
            driver,
            clock,
            scheduler: Scheduler::new(),
            input: VecDeque::new(),
            invoke_tx,
            invoke_rx,
            running: false,
            max_wait: None,
        }
    }

    /// Cap every blocking wait at `max_wait`
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn add_timeout(
        &mut self,
        span: Duration,
        callback: impl FnMut(&mut H) -> bool + 'static,
    ) -> TimeoutId {
        let now = self.clock.now();
        let id = self.scheduler.add_timeout(now, span, callback);
        tracing::trace!(%id, ?span, "timeout added");
        self.waker().wake();
        id
    }

    pub fn remove_timeout(&mut self, id: TimeoutId) -> bool {
        self.scheduler.remove_timeout(id)
    }

    pub fn add_idle(&mut self, callback: impl FnMut(&mut H) -> bool + 'static) -> IdleId {
        let id = self.scheduler.add_idle(callback);
        self.waker().wake();
        id
    }

    pub fn remove_idle(&mut self, id: IdleId) -> bool {
        self.scheduler.remove_idle(id)
    }

    pub fn scheduler(&self) -> &Scheduler<H> {
        &self.scheduler
    }

    pub fn waker(&self) -> Waker {
        self.driver.waker()
    }

    /// Sender for [`Invocation`]s; pair it with [`waker`](Self::waker)
    pub fn invoke_sender(&self) -> flume::Sender<Invocation<H>> {
        self.invoke_tx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Stop [`run`](Self::run) at the next iteration boundary
    pub fn stop(&mut self) {
        self.running = false;
        self.waker().wake();
    }

    /// Break a blocking wait from the loop's own thread
    pub fn wakeup(&self) {
        self.waker().wake();
    }

    /// Whether there is work for an iteration, waiting for the earliest of a
    /// timer deadline, queued idle work or driver input.
    pub fn events_pending(&mut self) -> Result<bool> {
        if !self.input.is_empty() || self.scheduler.has_idle() || !self.invoke_rx.is_empty() {
            return Ok(true);
        }

        let now = self.clock.now();
        let wait = match self.scheduler.next_deadline() {
            Some(deadline) if deadline <= now => return Ok(true),
            Some(deadline) => Some(Duration::from_nanos(deadline - now)),
            None => None,
        };
        let wait = match (wait, self.max_wait) {
            (Some(wait), Some(cap)) => Some(wait.min(cap)),
            (wait, cap) => wait.or(cap),
        };

        let input = self.driver.events_pending(wait)?;
        Ok(input
            || self.scheduler.has_due_timeouts(self.clock.now())
            || !self.invoke_rx.is_empty())
    }

    /// Pull whatever the driver already has without waiting
    fn pump(&mut self) -> Result<()> {
        if self.driver.events_pending(Some(Duration::ZERO))? {
            self.input.extend(self.driver.iteration());
        }
        Ok(())
    }

    /// Run one iteration against `host`
    pub fn run_iteration(host: &mut H) -> Result<()> {
        Self::run_timers(host)?;

        host.main_loop()?.pump()?;
        while let Some(event) = host.main_loop()?.input.pop_front() {
            host.dispatch(event)?;
        }

        let main_loop = host.main_loop()?;
        let invocations: Vec<Invocation<H>> = main_loop.invoke_rx.try_iter().collect();
        for invocation in invocations {
            let mut invocation = Some(invocation);
            main_loop.scheduler.add_idle(move |host| {
                if let Some(f) = invocation.take() {
                    f(host);
                }
                false
            });
        }

        Self::run_idle(host)
    }

    fn run_timers(host: &mut H) -> Result<()> {
        let main_loop = host.main_loop()?;
        let now = main_loop.clock.now();
        if !main_loop.scheduler.has_due_timeouts(now) {
            return Ok(());
        }
        let due = main_loop.scheduler.take_due(now);
        tracing::trace!(count = due.len(), "firing timeouts");

        for mut timeout in due {
            let scheduler = &mut host.main_loop()?.scheduler;
            if !scheduler.is_live_timeout(timeout.id()) {
                scheduler.retire(timeout.id());
                continue;
            }
            let again = timeout.fire(host);
            let main_loop = host.main_loop()?;
            if again {
                let now = main_loop.clock.now();
                main_loop.scheduler.reschedule(now, timeout);
            } else {
                main_loop.scheduler.retire(timeout.id());
            }
        }
        Ok(())
    }

    fn run_idle(host: &mut H) -> Result<()> {
        let idle = host.main_loop()?.scheduler.take_idle();
        let mut survivors = Vec::with_capacity(idle.len());

        for mut handler in idle {
            let scheduler = &mut host.main_loop()?.scheduler;
            if !scheduler.is_live_idle(handler.id()) {
                scheduler.settle_idle(handler.id(), false);
                continue;
            }
            let keep = handler.fire(host);
            if host.main_loop()?.scheduler.settle_idle(handler.id(), keep) {
                survivors.push(handler);
            }
        }
        host.main_loop()?.scheduler.restore_idle(survivors);
        Ok(())
    }

    /// Loop until [`stop`](Self::stop)
    pub fn run(host: &mut H) -> Result<()> {
        host.main_loop()?.running = true;
        while host.main_loop()?.running {
            if host.main_loop()?.events_pending()? {
                Self::run_iteration(host)?;
            }
        }
        Ok(())
    }

    /// Drop queued input and timers and release the driver's loop side
    pub fn tear_down(&mut self) {
        self.running = false;
        self.input.clear();
        self.scheduler.clear();
        while self.invoke_rx.try_recv().is_ok() {}
        self.driver.tear_down();
    }
}
