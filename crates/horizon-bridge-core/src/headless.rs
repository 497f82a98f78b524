//! An in-process native toolkit.
//!
//! [`HeadlessToolkit`] implements [`NativeToolkit`] without any windowing
//! system. Handles are plain counters, commands are recorded, and events are
//! injected through a cloneable [`HeadlessController`] that may be used from
//! any thread.
//!
//! Tests use it to drive widgets exactly as a real backend would:
//!
//! ```ignore
//! let toolkit = HeadlessToolkit::new();
//! let controller = toolkit.controller();
//! let display = Display::builder(&displays).toolkit(toolkit).build()?;
//!
//! // ... create a combo, then simulate the user picking the second row
//! controller.emit(combo_handle, NativeSignal::Changed { text: "b".into(), selected: Some(1) });
//! display.read_and_dispatch()?;
//! ```
//!
//! Events emitted for handles that were already destroyed are still
//! delivered. That mirrors callbacks a real toolkit queues before teardown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::logging::targets;
use crate::native::{
    Handle, HandleClass, NativeCommand, NativeError, NativeEvent, NativeSignal, NativeToolkit,
    SignalKind, Waker,
};

/// Recorded state of one headless native object.
#[derive(Debug, Clone)]
struct HeadlessObject {
    class: HandleClass,
    parent: Option<Handle>,
    alive: bool,
    connected: Vec<SignalKind>,
    commands: Vec<NativeCommand>,
}

#[derive(Debug)]
struct HeadlessState {
    next_handle: u64,
    objects: HashMap<Handle, HeadlessObject>,
    fail_next_create: usize,
    fail_next_apply: usize,
    fail_after: Option<usize>,
    beeps: usize,
    clipboard: Option<String>,
    shut_down: bool,
    waker: Option<Waker>,
}

impl HeadlessState {
    fn new() -> Self {
        Self {
            next_handle: 1,
            objects: HashMap::new(),
            fail_next_create: 0,
            fail_next_apply: 0,
            fail_after: None,
            beeps: 0,
            clipboard: None,
            shut_down: false,
            waker: None,
        }
    }
}

/// A toolkit backend that keeps all native state in memory.
pub struct HeadlessToolkit {
    state: Arc<Mutex<HeadlessState>>,
    events_tx: Sender<NativeEvent>,
    events_rx: Receiver<NativeEvent>,
    started: Instant,
}

impl HeadlessToolkit {
    /// Create a new headless toolkit.
    pub fn new() -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(Mutex::new(HeadlessState::new())),
            events_tx,
            events_rx,
            started: Instant::now(),
        }
    }

    /// Get a controller for injecting events and inspecting native state.
    pub fn controller(&self) -> HeadlessController {
        HeadlessController {
            state: Arc::clone(&self.state),
            events_tx: self.events_tx.clone(),
            started: self.started,
        }
    }
}

impl Default for HeadlessToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeToolkit for HeadlessToolkit {
    fn name(&self) -> &str {
        "headless"
    }

    fn install_waker(&mut self, waker: Waker) {
        self.state.lock().waker = Some(waker);
    }

    fn create_handle(
        &mut self,
        class: HandleClass,
        parent: Option<Handle>,
    ) -> Result<Handle, NativeError> {
        let mut state = self.state.lock();
        if state.shut_down {
            return Err(NativeError::ShutDown);
        }
        let refuse = match state.fail_after {
            Some(0) => {
                state.fail_after = None;
                true
            }
            Some(remaining) => {
                state.fail_after = Some(remaining - 1);
                false
            }
            None if state.fail_next_create > 0 => {
                state.fail_next_create -= 1;
                true
            }
            None => false,
        };
        if refuse {
            tracing::debug!(target: targets::NATIVE, ?class, "headless allocation refused");
            return Err(NativeError::AllocationFailed(class));
        }

        let raw = state.next_handle;
        state.next_handle += 1;
        let handle = Handle::from_raw(raw).ok_or(NativeError::AllocationFailed(class))?;
        state.objects.insert(
            handle,
            HeadlessObject {
                class,
                parent,
                alive: true,
                connected: Vec::new(),
                commands: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn destroy_handle(&mut self, handle: Handle) {
        if let Some(object) = self.state.lock().objects.get_mut(&handle) {
            object.alive = false;
            object.connected.clear();
        }
    }

    fn connect(&mut self, handle: Handle, signals: &[SignalKind]) {
        if let Some(object) = self.state.lock().objects.get_mut(&handle)
            && object.alive
        {
            for signal in signals {
                if !object.connected.contains(signal) {
                    object.connected.push(*signal);
                }
            }
        }
    }

    fn disconnect(&mut self, handle: Handle) {
        if let Some(object) = self.state.lock().objects.get_mut(&handle) {
            object.connected.clear();
        }
    }

    fn apply(&mut self, handle: Handle, command: NativeCommand) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        if state.fail_next_apply > 0 {
            state.fail_next_apply -= 1;
            tracing::debug!(target: targets::NATIVE, %handle, ?command, "headless command refused");
            return Err(NativeError::CommandRejected(handle));
        }
        match state.objects.get_mut(&handle) {
            Some(object) if object.alive => {
                object.commands.push(command);
                Ok(())
            }
            _ => Err(NativeError::UnknownHandle(handle)),
        }
    }

    fn events_pending(&self) -> bool {
        !self.events_rx.is_empty()
    }

    fn next_event(&mut self) -> Option<NativeEvent> {
        self.events_rx.try_recv().ok()
    }

    fn beep(&mut self) {
        self.state.lock().beeps += 1;
    }

    fn clipboard_text(&self) -> Option<String> {
        self.state.lock().clipboard.clone()
    }

    fn set_clipboard_text(&mut self, text: String) {
        self.state.lock().clipboard = Some(text);
    }

    fn shutdown(&mut self) {
        let mut state = self.state.lock();
        state.shut_down = true;
        state.waker = None;
    }
}

/// A handle onto a [`HeadlessToolkit`] usable from any thread.
#[derive(Clone)]
pub struct HeadlessController {
    state: Arc<Mutex<HeadlessState>>,
    events_tx: Sender<NativeEvent>,
    started: Instant,
}

impl HeadlessController {
    /// Queue a native callback for `handle` and wake the display.
    pub fn emit(&self, handle: Handle, signal: NativeSignal) {
        let time = u32::try_from(self.started.elapsed().as_millis()).unwrap_or(u32::MAX);
        let _ = self.events_tx.send(NativeEvent {
            handle,
            signal,
            time,
        });
        let waker = self.state.lock().waker.clone();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Make the next `count` handle allocations fail.
    pub fn fail_next_create(&self, count: usize) {
        self.state.lock().fail_next_create = count;
    }

    /// Make the next `count` commands fail.
    pub fn fail_next_apply(&self, count: usize) {
        self.state.lock().fail_next_apply = count;
    }

    /// Let `successes` more allocations succeed, then refuse one.
    pub fn fail_after(&self, successes: usize) {
        self.state.lock().fail_after = Some(successes);
    }

    /// Whether `handle` exists and has not been destroyed.
    pub fn is_alive(&self, handle: Handle) -> bool {
        self.state
            .lock()
            .objects
            .get(&handle)
            .is_some_and(|object| object.alive)
    }

    /// The number of live handles.
    pub fn live_handle_count(&self) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|object| object.alive)
            .count()
    }

    /// Live handles of the given class, in allocation order.
    pub fn handles_of_class(&self, class: HandleClass) -> Vec<Handle> {
        let state = self.state.lock();
        let mut handles: Vec<Handle> = state
            .objects
            .iter()
            .filter(|(_, object)| object.alive && object.class == class)
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort();
        handles
    }

    /// The class a handle was allocated with.
    pub fn class_of(&self, handle: Handle) -> Option<HandleClass> {
        self.state.lock().objects.get(&handle).map(|object| object.class)
    }

    /// The native parent a handle was allocated under.
    pub fn parent_of(&self, handle: Handle) -> Option<Handle> {
        self.state
            .lock()
            .objects
            .get(&handle)
            .and_then(|object| object.parent)
    }

    /// The callbacks currently hooked on `handle`.
    pub fn connected(&self, handle: Handle) -> Vec<SignalKind> {
        self.state
            .lock()
            .objects
            .get(&handle)
            .map(|object| object.connected.clone())
            .unwrap_or_default()
    }

    /// Every command applied to `handle`, oldest first.
    pub fn commands(&self, handle: Handle) -> Vec<NativeCommand> {
        self.state
            .lock()
            .objects
            .get(&handle)
            .map(|object| object.commands.clone())
            .unwrap_or_default()
    }

    /// The most recent command applied to `handle`.
    pub fn last_command(&self, handle: Handle) -> Option<NativeCommand> {
        self.state
            .lock()
            .objects
            .get(&handle)
            .and_then(|object| object.commands.last().cloned())
    }

    /// How many times the toolkit was asked to beep.
    pub fn beep_count(&self) -> usize {
        self.state.lock().beeps
    }

    /// The clipboard contents.
    pub fn clipboard_text(&self) -> Option<String> {
        self.state.lock().clipboard.clone()
    }

    /// Replace the clipboard contents, as another application would.
    pub fn set_clipboard_text(&self, text: impl Into<String>) {
        self.state.lock().clipboard = Some(text.into());
    }

    /// Whether the toolkit has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_destroy() {
        let mut toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();

        let window = toolkit.create_handle(HandleClass::Window, None).unwrap();
        let entry = toolkit
            .create_handle(HandleClass::Entry, Some(window))
            .unwrap();
        assert_ne!(window, entry);
        assert_eq!(controller.parent_of(entry), Some(window));
        assert_eq!(controller.live_handle_count(), 2);

        toolkit.destroy_handle(entry);
        assert!(!controller.is_alive(entry));
        assert!(controller.is_alive(window));
        assert_eq!(
            toolkit.apply(entry, NativeCommand::SetText("x".into())),
            Err(NativeError::UnknownHandle(entry))
        );
    }

    #[test]
    fn test_fail_next_apply() {
        let mut toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let window = toolkit.create_handle(HandleClass::Window, None).unwrap();
        controller.fail_next_apply(1);

        assert_eq!(
            toolkit.apply(window, NativeCommand::SetVisible(true)),
            Err(NativeError::CommandRejected(window))
        );
        assert!(toolkit.apply(window, NativeCommand::SetVisible(true)).is_ok());
        assert_eq!(controller.commands(window), vec![NativeCommand::SetVisible(true)]);
    }

    #[test]
    fn test_fail_next_create() {
        let mut toolkit = HeadlessToolkit::new();
        toolkit.controller().fail_next_create(1);

        assert_eq!(
            toolkit.create_handle(HandleClass::Combo, None),
            Err(NativeError::AllocationFailed(HandleClass::Combo))
        );
        assert!(toolkit.create_handle(HandleClass::Combo, None).is_ok());
    }

    #[test]
    fn test_fail_after() {
        let mut toolkit = HeadlessToolkit::new();
        toolkit.controller().fail_after(1);

        assert!(toolkit.create_handle(HandleClass::Combo, None).is_ok());
        assert!(toolkit.create_handle(HandleClass::Entry, None).is_err());
        assert!(toolkit.create_handle(HandleClass::Entry, None).is_ok());
    }

    #[test]
    fn test_emit_wakes_and_queues() {
        let mut toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let (waker, wake_rx) = Waker::channel();
        toolkit.install_waker(waker);

        let handle = toolkit.create_handle(HandleClass::Button, None).unwrap();
        assert!(!toolkit.events_pending());

        std::thread::spawn(move || controller.emit(handle, NativeSignal::Clicked))
            .join()
            .unwrap();

        assert!(wake_rx.try_recv().is_ok());
        assert!(toolkit.events_pending());
        let event = toolkit.next_event().unwrap();
        assert_eq!(event.handle, handle);
        assert_eq!(event.signal, NativeSignal::Clicked);
        assert!(toolkit.next_event().is_none());
    }

    #[test]
    fn test_connect_records_signals() {
        let mut toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let handle = toolkit.create_handle(HandleClass::Entry, None).unwrap();

        toolkit.connect(handle, &[SignalKind::Changed, SignalKind::Activate]);
        toolkit.connect(handle, &[SignalKind::Changed]);
        assert_eq!(
            controller.connected(handle),
            vec![SignalKind::Changed, SignalKind::Activate]
        );

        toolkit.disconnect(handle);
        assert!(controller.connected(handle).is_empty());
    }
}
