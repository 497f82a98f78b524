//! Cross-thread runnable queue.
//!
//! The [`Synchronizer`] lets any thread hand work to a display's UI thread:
//!
//! - [`Synchronizer::async_exec`] queues a runnable and returns at once.
//! - [`Synchronizer::sync_exec`] queues a runnable and blocks until the UI
//!   thread has run it, returning its result. Called on the UI thread
//!   itself, it runs the runnable inline.
//!
//! The UI thread drains the queue in [`Synchronizer::run_async_messages`],
//! which the display calls from `read_and_dispatch` when no native event is
//! pending. Runnables execute in submission order. A drain only runs the
//! runnables present when it started, so a runnable that queues another
//! cannot starve native input.
//!
//! After [`Synchronizer::release`] the queue is empty and every later
//! submission fails with [`Error::DeviceDisposed`]. Threads blocked in
//! `sync_exec` on a released runnable wake with the same error.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::thread::ThreadId;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::logging::targets;
use crate::native::Waker;

type Runnable = Box<dyn FnOnce() -> std::result::Result<(), String> + Send>;

struct QueuedRunnable {
    run: Runnable,
    /// The thread blocked in `sync_exec`, if any.
    requester: Option<ThreadId>,
}

struct QueueState {
    runnables: VecDeque<QueuedRunnable>,
    released: bool,
}

/// Marshals runnables from any thread onto a display's UI thread.
pub struct Synchronizer {
    queue: Mutex<QueueState>,
    ui_thread: ThreadId,
    sync_thread: Mutex<Option<ThreadId>>,
    waker: Waker,
}

impl Synchronizer {
    pub(crate) fn new(ui_thread: ThreadId, waker: Waker) -> Self {
        Self {
            queue: Mutex::new(QueueState {
                runnables: VecDeque::new(),
                released: false,
            }),
            ui_thread,
            sync_thread: Mutex::new(None),
            waker,
        }
    }

    /// Queue `task` to run on the UI thread and return immediately.
    pub fn async_exec<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(
            Box::new(move || {
                panic::catch_unwind(AssertUnwindSafe(task))
                    .map_err(|payload| panic_message(payload.as_ref()))
            }),
            None,
        )
    }

    /// Run `task` on the UI thread and wait for its result.
    ///
    /// On the UI thread the task runs inline. A panicking task surfaces as
    /// [`Error::FailedExec`] in the caller.
    pub fn sync_exec<F, R>(&self, task: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let current = std::thread::current().id();
        if current == self.ui_thread {
            if self.queue.lock().released {
                return Err(Error::DeviceDisposed);
            }
            let previous = self.sync_thread.lock().replace(current);
            let result = panic::catch_unwind(AssertUnwindSafe(task));
            *self.sync_thread.lock() = previous;
            return result.map_err(|payload| Error::FailedExec(panic_message(payload.as_ref())));
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        self.enqueue(
            Box::new(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(task))
                    .map_err(|payload| panic_message(payload.as_ref()));
                // Failures go to the waiting thread, not the UI loop.
                let _ = tx.send(result);
                Ok(())
            }),
            Some(current),
        )?;

        match rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(Error::FailedExec(message)),
            Err(_) => Err(Error::DeviceDisposed),
        }
    }

    fn enqueue(&self, run: Runnable, requester: Option<ThreadId>) -> Result<()> {
        {
            let mut queue = self.queue.lock();
            if queue.released {
                return Err(Error::DeviceDisposed);
            }
            queue.runnables.push_back(QueuedRunnable { run, requester });
            tracing::trace!(
                target: targets::SYNCHRONIZER,
                pending = queue.runnables.len(),
                synchronous = requester.is_some(),
                "queued runnable"
            );
        }
        self.waker.wake();
        Ok(())
    }

    /// Run the runnables queued when the call started.
    ///
    /// Returns `Ok(true)` if at least one runnable ran. If an async runnable
    /// panics, the drain stops and the panic is returned as
    /// [`Error::FailedExec`]; later runnables stay queued.
    pub fn run_async_messages(&self) -> Result<bool> {
        let snapshot = self.queue.lock().runnables.len();
        let mut ran = false;

        for _ in 0..snapshot {
            let Some(runnable) = self.queue.lock().runnables.pop_front() else {
                break;
            };
            ran = true;

            *self.sync_thread.lock() = runnable.requester;
            let result = (runnable.run)();
            *self.sync_thread.lock() = None;

            if let Err(message) = result {
                tracing::warn!(target: targets::SYNCHRONIZER, %message, "async runnable panicked");
                return Err(Error::FailedExec(message));
            }
        }

        Ok(ran)
    }

    /// Whether any runnable is queued.
    pub fn has_pending(&self) -> bool {
        !self.queue.lock().runnables.is_empty()
    }

    /// The number of queued runnables.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().runnables.len()
    }

    /// The thread whose `sync_exec` runnable is currently running, if any.
    pub fn sync_thread(&self) -> Option<ThreadId> {
        *self.sync_thread.lock()
    }

    /// Drop every queued runnable and refuse new ones.
    pub(crate) fn release(&self) {
        let dropped = {
            let mut queue = self.queue.lock();
            queue.released = true;
            std::mem::take(&mut queue.runnables)
        };
        if !dropped.is_empty() {
            tracing::debug!(
                target: targets::SYNCHRONIZER,
                count = dropped.len(),
                "dropping runnables on release"
            );
        }
        // Dropping the runnables drops their completion senders, waking
        // any thread blocked in `sync_exec`.
        drop(dropped);
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "runnable panicked".to_string()
    }
}
