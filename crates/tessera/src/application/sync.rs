//! Running work on the main thread from other threads

use super::Application;
use crate::error::{AppError, Result};
use crate::main_loop::{IdleId, Invocation, LoopHost, Waker};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Cloneable handle that queues closures onto the main loop.
///
/// Obtain one on the main thread with [`Application::invoker`] and move it
/// to a worker thread.
#[derive(Clone)]
pub struct Invoker {
    tx: flume::Sender<Invocation<Application>>,
    waker: Waker,
    main_thread: ThreadId,
    poll_interval: Duration,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("main_thread", &self.main_thread)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Invoker {
    /// Queue `f` to run once on the main thread and wake the loop
    pub fn invoke(&self, f: impl FnOnce(&mut Application) + Send + 'static) -> Result<()> {
        self.tx
            .send(Box::new(f))
            .map_err(|_| AppError::Disconnected)?;
        self.waker.wake();
        Ok(())
    }

    /// Run `f` on the main thread and wait for its result.
    ///
    /// Calling this on the main thread would wait forever and is an error.
    pub fn send<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut Application) -> R + Send + 'static,
    ) -> Result<R> {
        if thread::current().id() == self.main_thread {
            return Err(AppError::SendFromMainThread);
        }

        let (done_tx, done_rx) = flume::bounded(1);
        self.invoke(move |app| {
            // the sender may have given up already
            let _ = done_tx.send(f(app));
        })?;

        loop {
            match done_rx.recv_timeout(self.poll_interval) {
                Ok(result) => return Ok(result),
                Err(flume::RecvTimeoutError::Timeout) => {
                    if self.tx.is_disconnected() {
                        return Err(AppError::Disconnected);
                    }
                }
                Err(flume::RecvTimeoutError::Disconnected) => return Err(AppError::Disconnected),
            }
        }
    }

    /// Break a blocking wait of the main loop without queueing work
    pub fn wakeup(&self) {
        self.waker.wake();
    }

    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }
}

impl Application {
    /// Handle for queueing work from other threads. Valid until `shutdown`.
    pub fn invoker(&mut self) -> Result<Invoker> {
        let main_thread = self.main_thread_id.ok_or(AppError::NotInitialized)?;
        let poll_interval = Duration::from_millis(self.config.main_loop.send_poll_interval_ms.max(1));
        let main_loop = self.main_loop()?;
        Ok(Invoker {
            tx: main_loop.invoke_sender(),
            waker: main_loop.waker(),
            main_thread,
            poll_interval,
        })
    }

    /// Thread-safe handle that breaks a blocking wait of the main loop
    pub fn waker(&mut self) -> Result<Waker> {
        Ok(self.main_loop()?.waker())
    }

    /// Queue `f` to run once in the idle phase of an upcoming iteration.
    /// Works from the main thread only; see [`Invoker`] for other threads.
    pub fn invoke(&mut self, f: impl FnOnce(&mut Application) + 'static) -> Result<IdleId> {
        let mut f = Some(f);
        self.add_idle(move |app| {
            if let Some(f) = f.take() {
                f(app);
            }
            false
        })
    }

    /// Whether the caller is on the thread that called `init`
    pub fn is_main_thread(&self) -> bool {
        self.main_thread_id == Some(thread::current().id())
    }
}
