//! The display: event loop, dispatch and teardown.
//!
//! A [`Display`] is the connection to one native toolkit. It is bound to the
//! thread that created it (its UI thread) and owns:
//!
//! - the native toolkit
//! - the [`HandleRegistry`] of live widgets
//! - the [`Synchronizer`] for cross-thread runnables
//! - the timer queue, the deferred event queue and the dispose list
//! - the display-level filter and listener tables
//!
//! `Display` is a cheap, cloneable handle that is `Send + Sync`, so it can be
//! given to worker threads for [`Display::async_exec`], [`Display::sync_exec`]
//! and [`Display::wake`]. Every other operation must run on the UI thread.
//!
//! # Event Loop
//!
//! ```ignore
//! let displays = DisplayRegistry::new();
//! let display = Display::new(&displays)?;
//! let shell = Shell::new(&display)?;
//! shell.open()?;
//!
//! while !shell.is_disposed() {
//!     if !display.read_and_dispatch()? {
//!         display.sleep()?;
//!     }
//! }
//! display.dispose()?;
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread::ThreadId;
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::config::DisplayConfig;
use crate::data::DataStore;
use crate::display_registry::DisplayRegistry;
use crate::error::{Error, Result};
use crate::event::{Event, EventType};
use crate::event_table::{EventTable, Listener, dispatch};
use crate::headless::HeadlessToolkit;
use crate::logging::{WidgetTreeDebug, targets};
use crate::native::{Handle, NativeEvent, NativeToolkit, Waker};
use crate::registry::{HandleRegistry, WidgetId};
use crate::synchronizer::{Synchronizer, panic_message};
use crate::thread_check::ThreadAffinity;
use crate::timer::{TimerId, TimerManager};
use crate::widget::{NativeWidget, SharedToolkit, dispose_widget};

static NEXT_DISPLAY_SERIAL: AtomicU64 = AtomicU64::new(1);

type DisposeTask = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct DisplayInner {
    serial: u64,
    affinity: ThreadAffinity,
    config: DisplayConfig,
    toolkit_name: String,
    disposed: AtomicBool,
    disposing: AtomicBool,
    toolkit: SharedToolkit,
    registry: Mutex<HandleRegistry>,
    synchronizer: Synchronizer,
    timers: Mutex<TimerManager>,
    waker: Waker,
    wake_rx: Receiver<()>,
    filters: Mutex<EventTable>,
    listeners: Mutex<EventTable>,
    deferred: Mutex<VecDeque<Event>>,
    dispose_list: Mutex<Vec<DisposeTask>>,
    data: Mutex<DataStore>,
    last_event_time: AtomicU32,
    displays: DisplayRegistry,
}

/// A connection to a native toolkit, bound to one UI thread.
#[derive(Clone)]
pub struct Display {
    inner: Arc<DisplayInner>,
}

/// Builds a [`Display`] with a chosen toolkit and configuration.
pub struct DisplayBuilder<'a> {
    registry: &'a DisplayRegistry,
    toolkit: Option<Box<dyn NativeToolkit>>,
    config: DisplayConfig,
}

impl<'a> DisplayBuilder<'a> {
    /// Use `toolkit` instead of the headless toolkit.
    pub fn toolkit(mut self, toolkit: impl NativeToolkit + 'static) -> Self {
        self.toolkit = Some(Box::new(toolkit));
        self
    }

    /// Use `config` instead of the default configuration.
    pub fn config(mut self, config: DisplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Create the display on the calling thread.
    ///
    /// Fails with [`Error::ThreadHasDisplay`] if the thread already owns a
    /// live display, or [`Error::TooManyDisplays`] if the registry is full.
    pub fn build(self) -> Result<Display> {
        self.config.validate()?;
        let mut toolkit = self
            .toolkit
            .unwrap_or_else(|| Box::new(HeadlessToolkit::new()));
        let (waker, wake_rx) = Waker::channel();
        toolkit.install_waker(waker.clone());
        let toolkit_name = toolkit.name().to_string();
        let affinity = ThreadAffinity::current();

        let display = Display {
            inner: Arc::new(DisplayInner {
                serial: NEXT_DISPLAY_SERIAL.fetch_add(1, Ordering::Relaxed),
                affinity,
                config: self.config,
                toolkit_name,
                disposed: AtomicBool::new(false),
                disposing: AtomicBool::new(false),
                toolkit: Arc::new(Mutex::new(toolkit)),
                registry: Mutex::new(HandleRegistry::new()),
                synchronizer: Synchronizer::new(affinity.thread_id(), waker.clone()),
                timers: Mutex::new(TimerManager::new()),
                waker,
                wake_rx,
                filters: Mutex::new(EventTable::new()),
                listeners: Mutex::new(EventTable::new()),
                deferred: Mutex::new(VecDeque::new()),
                dispose_list: Mutex::new(Vec::new()),
                data: Mutex::new(DataStore::new()),
                last_event_time: AtomicU32::new(0),
                displays: self.registry.clone(),
            }),
        };

        self.registry.register(&display)?;
        let inner = &display.inner;
        tracing::info!(
            target: targets::DISPLAY,
            serial = inner.serial,
            toolkit = %inner.toolkit_name,
            app_name = ?inner.config.app_name,
            "display created"
        );
        Ok(display)
    }
}

impl Display {
    /// Create a headless display with the default configuration.
    pub fn new(registry: &DisplayRegistry) -> Result<Display> {
        Self::builder(registry).build()
    }

    /// Start building a display.
    pub fn builder(registry: &DisplayRegistry) -> DisplayBuilder<'_> {
        DisplayBuilder {
            registry,
            toolkit: None,
            config: DisplayConfig::default(),
        }
    }

    pub(crate) fn from_inner(inner: Arc<DisplayInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<DisplayInner> {
        Arc::downgrade(&self.inner)
    }

    /// Whether both values refer to the same display.
    pub fn ptr_eq(&self, other: &Display) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Fail with [`Error::DeviceDisposed`] after disposal, and with
    /// [`Error::ThreadInvalidAccess`] off the UI thread.
    pub(crate) fn check_device(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::DeviceDisposed);
        }
        self.inner.affinity.check()
    }

    /// Whether the display has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Whether the calling thread is the UI thread.
    pub fn is_valid_thread(&self) -> bool {
        self.inner.affinity.is_same_thread()
    }

    /// The UI thread.
    pub fn thread(&self) -> Result<ThreadId> {
        if self.is_disposed() {
            return Err(Error::DeviceDisposed);
        }
        Ok(self.inner.affinity.thread_id())
    }

    /// The thread whose `sync_exec` runnable is running, if any.
    pub fn sync_thread(&self) -> Result<Option<ThreadId>> {
        if self.is_disposed() {
            return Err(Error::DeviceDisposed);
        }
        Ok(self.inner.synchronizer.sync_thread())
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Process one unit of work.
    ///
    /// If a native event is pending it is dispatched, followed by any
    /// deferred events, and `true` is returned. Otherwise expired timers and
    /// queued runnables run, and the result says whether anything ran.
    pub fn read_and_dispatch(&self) -> Result<bool> {
        self.check_device()?;

        let next = self.inner.toolkit.lock().next_event();
        if let Some(event) = next {
            let dispatched = self.dispatch_native(event);
            let deferred = self.run_deferred_events();
            dispatched.and(deferred)?;
            return Ok(true);
        }

        let ran_timers = self.run_timers()?;
        let ran_messages = self.inner.synchronizer.run_async_messages()?;
        self.run_deferred_events()?;
        Ok(ran_timers || ran_messages)
    }

    /// Block until there may be work to do.
    ///
    /// Returns immediately if work is already pending. Otherwise waits for a
    /// wake, the next timer deadline, or the configured sleep bound.
    pub fn sleep(&self) -> Result<bool> {
        self.check_device()?;
        if self.has_pending_work() {
            return Ok(true);
        }

        let timer_wait = self.inner.timers.lock().time_until_next();
        let wait = match (timer_wait, self.inner.config.sleep_timeout()) {
            (Some(timer), Some(bound)) => Some(timer.min(bound)),
            (timer, bound) => timer.or(bound),
        };
        tracing::trace!(target: targets::DISPLAY, ?wait, "sleeping");

        let woken = match wait {
            Some(timeout) => self.inner.wake_rx.recv_timeout(timeout).is_ok(),
            None => self.inner.wake_rx.recv().is_ok(),
        };
        Ok(woken || self.has_pending_work())
    }

    /// Wake the UI thread if it is sleeping. Callable from any thread.
    pub fn wake(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::DeviceDisposed);
        }
        self.inner.waker.wake();
        Ok(())
    }

    fn has_pending_work(&self) -> bool {
        self.inner.toolkit.lock().events_pending()
            || self.inner.synchronizer.has_pending()
            || !self.inner.deferred.lock().is_empty()
            || self.inner.timers.lock().has_expired()
    }

    fn dispatch_native(&self, event: NativeEvent) -> Result<()> {
        if self.inner.config.trace_native_events {
            tracing::trace!(
                target: targets::NATIVE,
                handle = %event.handle,
                signal = ?event.signal,
                time = event.time,
                "native event"
            );
        }

        let widget = self.inner.registry.lock().lookup(event.handle);
        let Some(widget) = widget else {
            tracing::trace!(
                target: targets::NATIVE,
                handle = %event.handle,
                signal = ?event.signal.kind(),
                "dropping event for unregistered handle"
            );
            return Ok(());
        };
        if widget.core().is_disposed() {
            return Ok(());
        }

        self.inner.last_event_time.store(event.time, Ordering::Relaxed);
        widget.handle_signal(event.handle, &event.signal)
    }

    fn run_deferred_events(&self) -> Result<()> {
        loop {
            let next = self.inner.deferred.lock().pop_front();
            let Some(mut event) = next else {
                return Ok(());
            };
            let Some(id) = event.widget else {
                continue;
            };

            let (widget, item_live) = {
                let registry = self.inner.registry.lock();
                let item_live = event.item.is_none_or(|item| registry.contains(item));
                (registry.get(id), item_live)
            };
            let Some(widget) = widget else {
                continue;
            };
            if widget.core().is_disposed() || !item_live {
                tracing::trace!(target: targets::DISPLAY, event = %event.event_type, "skipping deferred event for disposed widget");
                continue;
            }

            widget.core().deliver(self, &mut event)?;
        }
    }

    fn run_timers(&self) -> Result<bool> {
        let mut ran = false;
        loop {
            let next = self.inner.timers.lock().pop_expired();
            let Some((id, task)) = next else {
                return Ok(ran);
            };
            ran = true;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                let message = panic_message(payload.as_ref());
                tracing::warn!(target: targets::TIMER, ?id, %message, "timer task panicked");
                return Err(Error::FailedExec(message));
            }
        }
    }

    // =========================================================================
    // Cross-thread execution
    // =========================================================================

    /// Queue `task` to run on the UI thread. Callable from any thread.
    pub fn async_exec<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_disposed() {
            return Err(Error::DeviceDisposed);
        }
        self.inner.synchronizer.async_exec(task)
    }

    /// Run `task` on the UI thread and return its value. Callable from any
    /// thread; blocks the caller until the task has run.
    pub fn sync_exec<F, R>(&self, task: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_disposed() {
            return Err(Error::DeviceDisposed);
        }
        self.inner.synchronizer.sync_exec(task)
    }

    /// Run `task` once on the UI thread after `delay`.
    pub fn timer_exec<F>(&self, delay: Duration, task: F) -> Result<TimerId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.check_device()?;
        let id = self.inner.timers.lock().schedule(delay, Box::new(task));
        self.inner.waker.wake();
        Ok(id)
    }

    /// Cancel a timer. Returns `false` if it already ran or was cancelled.
    pub fn cancel_timer(&self, id: TimerId) -> Result<bool> {
        self.check_device()?;
        Ok(self.inner.timers.lock().cancel(id))
    }

    /// Run `task` on the UI thread while the display is being disposed.
    pub fn dispose_exec<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.check_device()?;
        self.inner.dispose_list.lock().push(Box::new(task));
        Ok(())
    }

    // =========================================================================
    // Filters, listeners and events
    // =========================================================================

    /// Register a filter that sees every widget event of `event_type` before
    /// the widget's own listeners. A filter that clears `doit` stops delivery.
    pub fn add_filter(&self, event_type: EventType, listener: Listener) -> Result<()> {
        self.check_device()?;
        self.inner.filters.lock().hook(event_type, listener);
        Ok(())
    }

    /// Remove a filter.
    pub fn remove_filter(&self, event_type: EventType, listener: &Listener) -> Result<()> {
        self.check_device()?;
        self.inner.filters.lock().unhook(event_type, listener);
        Ok(())
    }

    /// Register a display-level listener (`Close`, `Dispose`, `Settings`).
    pub fn add_listener(&self, event_type: EventType, listener: Listener) -> Result<()> {
        self.check_device()?;
        self.inner.listeners.lock().hook(event_type, listener);
        Ok(())
    }

    /// Remove a display-level listener.
    pub fn remove_listener(&self, event_type: EventType, listener: &Listener) -> Result<()> {
        self.check_device()?;
        self.inner.listeners.lock().unhook(event_type, listener);
        Ok(())
    }

    /// Whether any filter is registered for `event_type`.
    pub fn has_filter(&self, event_type: EventType) -> bool {
        self.inner.filters.lock().hooks(event_type)
    }

    pub(crate) fn filter_event(&self, event: &mut Event) -> Result<()> {
        let filters = self.inner.filters.lock().listeners(event.event_type);
        dispatch(&filters, event)?;
        Ok(())
    }

    fn send_display_event(&self, event: &mut Event) -> Result<()> {
        if event.time == 0 {
            event.time = self.last_event_time();
        }
        let listeners = self.inner.listeners.lock().listeners(event.event_type);
        dispatch(&listeners, event)?;
        Ok(())
    }

    /// Queue a widget event for delivery after the current native event.
    ///
    /// The event must name its target widget.
    pub fn post_event(&self, event: Event) -> Result<()> {
        self.check_device()?;
        if event.widget.is_none() {
            return Err(Error::InvalidArgument("posted event has no target widget"));
        }
        self.enqueue_deferred(event);
        Ok(())
    }

    pub(crate) fn enqueue_deferred(&self, event: Event) {
        let mut deferred = self.inner.deferred.lock();
        if deferred.len() >= self.inner.config.deferred_event_limit {
            tracing::warn!(
                target: targets::DISPLAY,
                event = %event.event_type,
                limit = self.inner.config.deferred_event_limit,
                "deferred event queue full, dropping event"
            );
            return;
        }
        deferred.push_back(event);
    }

    /// The timestamp of the last native event.
    pub fn last_event_time(&self) -> u32 {
        self.inner.last_event_time.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Widgets
    // =========================================================================

    /// Find the widget owning a native handle.
    pub fn find_widget(&self, handle: Handle) -> Result<Option<WidgetId>> {
        self.check_device()?;
        Ok(self.inner.registry.lock().lookup_id(handle))
    }

    /// The number of live widgets.
    pub fn widget_count(&self) -> Result<usize> {
        self.check_device()?;
        Ok(self.inner.registry.lock().len())
    }

    /// Render the live widget tree for debugging.
    pub fn dump_widget_tree(&self) -> Result<String> {
        self.check_device()?;
        let registry = self.inner.registry.lock();
        Ok(WidgetTreeDebug::new().format_all(&*registry))
    }

    pub(crate) fn widget(&self, id: WidgetId) -> Option<Arc<dyn NativeWidget>> {
        self.inner.registry.lock().get(id)
    }

    pub(crate) fn registry(&self) -> &Mutex<HandleRegistry> {
        &self.inner.registry
    }

    pub(crate) fn toolkit(&self) -> &SharedToolkit {
        &self.inner.toolkit
    }

    // =========================================================================
    // Data and miscellany
    // =========================================================================

    /// Replace the display's unnamed data slot.
    pub fn set_data<T: std::any::Any + Send + Sync>(&self, value: T) -> Result<()> {
        self.check_device()?;
        self.inner.data.lock().set(value);
        Ok(())
    }

    /// Read the display's unnamed data slot as `T`.
    pub fn data<T: std::any::Any + Send + Sync>(&self) -> Result<Option<Arc<T>>> {
        self.check_device()?;
        Ok(self.inner.data.lock().get::<T>())
    }

    /// Replace the display data slot named `key`.
    pub fn set_data_for<T: std::any::Any + Send + Sync>(&self, key: &str, value: T) -> Result<()> {
        self.check_device()?;
        self.inner.data.lock().set_keyed(key, value);
        Ok(())
    }

    /// Read the display data slot named `key` as `T`.
    pub fn data_for<T: std::any::Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>> {
        self.check_device()?;
        Ok(self.inner.data.lock().get_keyed::<T>(key))
    }

    /// Emit a short sound.
    pub fn beep(&self) -> Result<()> {
        self.check_device()?;
        self.inner.toolkit.lock().beep();
        Ok(())
    }

    /// The text on the system clipboard, if any.
    pub fn clipboard_text(&self) -> Result<Option<String>> {
        self.check_device()?;
        Ok(self.inner.toolkit.lock().clipboard_text())
    }

    /// Put `text` on the system clipboard.
    pub fn set_clipboard_text(&self, text: impl Into<String>) -> Result<()> {
        self.check_device()?;
        self.inner.toolkit.lock().set_clipboard_text(text.into());
        Ok(())
    }

    /// The display configuration.
    pub fn config(&self) -> &DisplayConfig {
        &self.inner.config
    }

    /// The native toolkit's name.
    pub fn toolkit_name(&self) -> &str {
        &self.inner.toolkit_name
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Request that the display close.
    ///
    /// Sends `Close` to the display listeners and disposes the display
    /// unless one of them cleared `doit`. Returns whether it was disposed.
    pub fn close(&self) -> Result<bool> {
        self.check_device()?;
        let mut event = Event::new(EventType::Close);
        self.send_display_event(&mut event)?;
        if event.doit {
            self.dispose()?;
        }
        Ok(event.doit)
    }

    /// Dispose the display, every widget on it, and its native connection.
    ///
    /// A no-op if already disposed. Failures raised along the way are
    /// captured and the first one is returned after teardown completes.
    pub fn dispose(&self) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        self.inner.affinity.check()?;
        if self.inner.disposing.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(target: targets::DISPLAY, serial = self.inner.serial, "disposing display");

        let mut first_error: Option<Error> = None;
        let mut capture = |result: Result<()>| {
            if let Err(err) = result {
                tracing::warn!(target: targets::DISPLAY, error = %err, "failure during display disposal");
                first_error.get_or_insert(err);
            }
        };

        capture(self.send_display_event(&mut Event::new(EventType::Dispose)));
        capture(self.dispose_widgets());

        loop {
            match self.read_and_dispatch() {
                Ok(true) => continue,
                Ok(false) => break,
                Err(err) => capture(Err(err)),
            }
        }
        capture(self.dispose_widgets());

        let tasks = std::mem::take(&mut *self.inner.dispose_list.lock());
        for task in tasks {
            capture(
                panic::catch_unwind(AssertUnwindSafe(task))
                    .map_err(|payload| Error::FailedExec(panic_message(payload.as_ref()))),
            );
        }

        self.inner.synchronizer.release();
        self.inner.timers.lock().clear();
        self.inner.deferred.lock().clear();
        self.inner.filters.lock().clear();
        self.inner.listeners.lock().clear();
        self.inner.data.lock().clear();
        self.inner.toolkit.lock().shutdown();
        self.inner.disposed.store(true, Ordering::Release);
        self.inner.displays.deregister(self);
        tracing::info!(target: targets::DISPLAY, serial = self.inner.serial, "display disposed");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn dispose_widgets(&self) -> Result<()> {
        let mut first_error = None;
        let roots = self.inner.registry.lock().roots();
        for id in roots {
            if let Some(widget) = self.widget(id)
                && let Err(err) = dispose_widget(self, widget)
            {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl PartialEq for Display {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Display {}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("serial", &self.inner.serial)
            .field("thread", &self.inner.affinity.thread_id())
            .field("toolkit", &self.inner.toolkit_name)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_table::ListenerError;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Instant;

    fn setup() -> (DisplayRegistry, Display) {
        let registry = DisplayRegistry::new();
        let display = Display::new(&registry).unwrap();
        (registry, display)
    }

    #[test]
    fn test_read_and_dispatch_idle() {
        let (_registry, display) = setup();
        assert!(!display.read_and_dispatch().unwrap());
        assert_eq!(display.toolkit_name(), "headless");
        display.dispose().unwrap();
    }

    #[test]
    fn test_async_exec_from_worker() {
        let (_registry, display) = setup();
        let count = Arc::new(AtomicUsize::new(0));
        let remote = display.clone();
        let worker_count = count.clone();
        thread::spawn(move || {
            remote
                .async_exec(move || {
                    worker_count.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        })
        .join()
        .unwrap();

        assert!(display.read_and_dispatch().unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        display.dispose().unwrap();
    }

    #[test]
    fn test_sync_exec_round_trip() {
        let (_registry, display) = setup();
        let remote = display.clone();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let worker = thread::spawn(move || {
            tx.send(remote.sync_exec(|| 21 * 2)).unwrap();
            let _ = remote.wake();
        });

        let result = loop {
            if let Ok(result) = rx.try_recv() {
                break result;
            }
            if !display.read_and_dispatch().unwrap() {
                display.sleep().unwrap();
            }
        };
        worker.join().unwrap();
        assert_eq!(result.unwrap(), 42);
        display.dispose().unwrap();
    }

    #[test]
    fn test_timer_exec_accepts_huge_delay() {
        let (_registry, display) = setup();
        let id = display
            .timer_exec(Duration::MAX, || panic!("never due"))
            .unwrap();
        assert!(!display.read_and_dispatch().unwrap());
        assert!(display.cancel_timer(id).unwrap());
        display.dispose().unwrap();
    }

    #[test]
    fn test_wrong_thread_rejected() {
        let (_registry, display) = setup();
        let remote = display.clone();
        let result = thread::spawn(move || {
            (
                remote.read_and_dispatch().err(),
                remote.timer_exec(Duration::ZERO, || {}).err(),
                remote.dispose().err(),
                remote.async_exec(|| {}).is_ok(),
            )
        })
        .join()
        .unwrap();
        assert!(matches!(result.0, Some(Error::ThreadInvalidAccess)));
        assert!(matches!(result.1, Some(Error::ThreadInvalidAccess)));
        assert!(matches!(result.2, Some(Error::ThreadInvalidAccess)));
        assert!(result.3);
        display.dispose().unwrap();
    }

    #[test]
    fn test_sleep_wakes_on_wake() {
        let (_registry, display) = setup();
        let remote = display.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.wake().unwrap();
        });
        assert!(display.sleep().unwrap());
        waker.join().unwrap();
        display.dispose().unwrap();
    }

    #[test]
    fn test_sleep_bounded_by_config() {
        let registry = DisplayRegistry::new();
        let display = Display::builder(&registry)
            .config(DisplayConfig::new().with_sleep_timeout(Duration::from_millis(10)))
            .build()
            .unwrap();
        let started = Instant::now();
        assert!(!display.sleep().unwrap());
        assert!(started.elapsed() >= Duration::from_millis(10));
        display.dispose().unwrap();
    }

    #[test]
    fn test_timer_exec_runs_after_delay() {
        let (_registry, display) = setup();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        display
            .timer_exec(Duration::from_millis(10), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert!(!display.read_and_dispatch().unwrap());
        display.sleep().unwrap();
        while !display.read_and_dispatch().unwrap() {
            display.sleep().unwrap();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        display.dispose().unwrap();
    }

    #[test]
    fn test_cancel_timer() {
        let (_registry, display) = setup();
        let id = display.timer_exec(Duration::ZERO, || panic!("cancelled")).unwrap();
        assert!(display.cancel_timer(id).unwrap());
        assert!(!display.read_and_dispatch().unwrap());
        display.dispose().unwrap();
    }

    #[test]
    fn test_close_vetoed() {
        let (_registry, display) = setup();
        display
            .add_listener(EventType::Close, Listener::from_fn(|e| e.doit = false))
            .unwrap();
        assert!(!display.close().unwrap());
        assert!(!display.is_disposed());
        display.dispose().unwrap();
    }

    #[test]
    fn test_close_disposes() {
        let (registry, display) = setup();
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = disposed.clone();
        display
            .add_listener(
                EventType::Dispose,
                Listener::from_fn(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert!(display.close().unwrap());
        assert!(display.is_disposed());
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_dispose_runs_pending_work_and_dispose_list() {
        let (_registry, display) = setup();
        let log = Arc::new(Mutex::new(Vec::new()));
        let async_log = log.clone();
        display.async_exec(move || async_log.lock().push("async")).unwrap();
        let dispose_log = log.clone();
        display
            .dispose_exec(move || dispose_log.lock().push("dispose"))
            .unwrap();

        display.dispose().unwrap();
        assert_eq!(*log.lock(), vec!["async", "dispose"]);
    }

    #[test]
    fn test_disposed_display_rejects_use() {
        let (_registry, display) = setup();
        display.dispose().unwrap();
        display.dispose().unwrap();

        assert!(matches!(display.read_and_dispatch(), Err(Error::DeviceDisposed)));
        assert!(matches!(display.async_exec(|| {}), Err(Error::DeviceDisposed)));
        assert!(matches!(display.sync_exec(|| ()), Err(Error::DeviceDisposed)));
        assert!(matches!(display.wake(), Err(Error::DeviceDisposed)));
        assert!(matches!(display.thread(), Err(Error::DeviceDisposed)));
    }

    #[test]
    fn test_dispose_failure_is_reported_after_teardown() {
        let (_registry, display) = setup();
        display
            .add_listener(
                EventType::Dispose,
                Listener::new(|_| Err(ListenerError::msg("teardown"))),
            )
            .unwrap();
        assert!(matches!(display.dispose(), Err(Error::Listener(_))));
        assert!(display.is_disposed());
    }

    #[test]
    fn test_async_panic_surfaces_once() {
        let (_registry, display) = setup();
        display.async_exec(|| panic!("worker bug")).unwrap();
        assert!(matches!(
            display.read_and_dispatch(),
            Err(Error::FailedExec(msg)) if msg == "worker bug"
        ));
        assert!(!display.read_and_dispatch().unwrap());
        display.dispose().unwrap();
    }

    #[test]
    fn test_post_event_requires_target() {
        let (_registry, display) = setup();
        assert!(matches!(
            display.post_event(Event::new(EventType::Selection)),
            Err(Error::InvalidArgument(_))
        ));
        display.dispose().unwrap();
    }

    #[test]
    fn test_display_data() {
        let (_registry, display) = setup();
        display.set_data(5u16).unwrap();
        display.set_data_for("theme", String::from("dark")).unwrap();
        assert_eq!(display.data::<u16>().unwrap().as_deref(), Some(&5));
        assert_eq!(
            display.data_for::<String>("theme").unwrap().as_deref().map(String::as_str),
            Some("dark")
        );
        display.dispose().unwrap();
    }

    #[test]
    fn test_dump_empty_tree() {
        let (_registry, display) = setup();
        assert!(display.dump_widget_tree().unwrap().contains("0 widgets"));
        display.dispose().unwrap();
    }

    #[test]
    fn test_beep() {
        let registry = DisplayRegistry::new();
        let toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let display = Display::builder(&registry).toolkit(toolkit).build().unwrap();
        display.beep().unwrap();
        assert_eq!(controller.beep_count(), 1);
        display.dispose().unwrap();
        assert!(controller.is_shut_down());
    }

    #[test]
    fn test_clipboard_round_trip() {
        let registry = DisplayRegistry::new();
        let toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let display = Display::builder(&registry).toolkit(toolkit).build().unwrap();
        assert_eq!(display.clipboard_text().unwrap(), None);
        display.set_clipboard_text("copied").unwrap();
        assert_eq!(controller.clipboard_text().as_deref(), Some("copied"));
        controller.set_clipboard_text("from elsewhere");
        assert_eq!(
            display.clipboard_text().unwrap().as_deref(),
            Some("from elsewhere")
        );
        display.dispose().unwrap();
    }
}
