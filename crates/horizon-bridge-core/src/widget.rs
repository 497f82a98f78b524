//! Widget lifecycle.
//!
//! Every widget wrapper composes a [`WidgetCore`], which carries the state
//! shared by all widgets: id, style, lifecycle state, owning display, native
//! handles, event table and application data.
//!
//! Two traits sit on top of it:
//!
//! - [`NativeWidget`] is the adapter seam. The display holds widgets as
//!   `Arc<dyn NativeWidget>` and routes native callbacks through
//!   [`NativeWidget::handle_signal`].
//! - [`Widget`] is implemented by public wrapper types. The capability traits
//!   [`Disposable`], [`EventSource`], [`NativeHandleOwner`] and
//!   [`WidgetData`] have blanket implementations for every `Widget`.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --WidgetBuilder::build--> Created --dispose--> Disposing --> Disposed
//! ```
//!
//! [`WidgetBuilder::build`] allocates every native handle first and releases
//! them all if one allocation fails, so a failed construction leaves nothing
//! behind. Disposal sends `Dispose`, disposes children, unhooks callbacks,
//! releases handles, deregisters, and clears listeners and data. Disposing
//! twice, or from a `Dispose` listener, is a no-op.
//!
//! # Related Modules
//!
//! - [`crate::Display`] - Owns the registry and the native toolkit
//! - [`crate::HandleRegistry`] - Routes native handles back to widgets
//! - [`crate::event_table`] - Listener storage

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::data::DataStore;
use crate::display::Display;
use crate::error::{Error, Result};
use crate::event::{Event, EventType};
use crate::event_table::{EventTable, Listener, dispatch};
use crate::logging::targets;
use crate::native::{Handle, HandleClass, NativeCommand, NativeSignal, NativeToolkit, SignalKind};
use crate::registry::WidgetId;
use crate::style::Style;

pub(crate) type SharedToolkit = Arc<Mutex<Box<dyn NativeToolkit>>>;

/// The lifecycle state of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    /// Being constructed.
    Uninitialized,
    /// Live and usable.
    Created,
    /// Disposal is in progress.
    Disposing,
    /// Disposed; every further use fails.
    Disposed,
}

/// An owned native handle.
///
/// Dropping the guard destroys the native handle.
pub struct NativeHandle {
    handle: Handle,
    class: HandleClass,
    toolkit: Weak<Mutex<Box<dyn NativeToolkit>>>,
}

impl NativeHandle {
    pub(crate) fn new(handle: Handle, class: HandleClass, toolkit: &SharedToolkit) -> Self {
        Self {
            handle,
            class,
            toolkit: Arc::downgrade(toolkit),
        }
    }

    /// The native handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The class it was allocated with.
    pub fn class(&self) -> HandleClass {
        self.class
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        if let Some(toolkit) = self.toolkit.upgrade() {
            toolkit.lock().destroy_handle(self.handle);
            tracing::trace!(target: targets::NATIVE, handle = %self.handle, class = ?self.class, "destroyed native handle");
        }
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("handle", &self.handle)
            .field("class", &self.class)
            .finish()
    }
}

/// State shared by every widget.
pub struct WidgetCore {
    id: WidgetId,
    type_name: &'static str,
    style: Style,
    state: Mutex<WidgetState>,
    display: RwLock<Option<Display>>,
    handles: Mutex<Vec<NativeHandle>>,
    event_table: Mutex<EventTable>,
    data: Mutex<DataStore>,
}

impl WidgetCore {
    fn new(
        id: WidgetId,
        type_name: &'static str,
        style: Style,
        display: Display,
        handles: Vec<NativeHandle>,
    ) -> Self {
        Self {
            id,
            type_name,
            style,
            state: Mutex::new(WidgetState::Uninitialized),
            display: RwLock::new(Some(display)),
            handles: Mutex::new(handles),
            event_table: Mutex::new(EventTable::new()),
            data: Mutex::new(DataStore::new()),
        }
    }

    /// The widget id.
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// The widget type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The construction style.
    pub fn style(&self) -> Style {
        self.style
    }

    /// The current lifecycle state.
    pub fn state(&self) -> WidgetState {
        *self.state.lock()
    }

    /// Whether the widget has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state() == WidgetState::Disposed
    }

    /// The owning display, without a thread check.
    pub fn display(&self) -> Result<Display> {
        self.display.read().clone().ok_or(Error::WidgetDisposed)
    }

    /// Validate that the widget may be used from the calling thread.
    ///
    /// Fails with [`Error::WidgetDisposed`] once the display link is gone,
    /// [`Error::ThreadInvalidAccess`] off the UI thread, and
    /// [`Error::WidgetDisposed`] for a disposed widget.
    pub fn check_widget(&self) -> Result<Display> {
        let display = self.display()?;
        if !display.is_valid_thread() {
            return Err(Error::ThreadInvalidAccess);
        }
        if self.is_disposed() {
            return Err(Error::WidgetDisposed);
        }
        Ok(display)
    }

    /// The primary native handle, if the widget owns one.
    pub fn handle(&self) -> Option<Handle> {
        self.handles.lock().first().map(NativeHandle::handle)
    }

    /// Every native handle, primary first.
    pub fn handles(&self) -> Vec<Handle> {
        self.handles.lock().iter().map(NativeHandle::handle).collect()
    }

    /// The native handle allocated with `class`, if any.
    pub fn handle_of(&self, class: HandleClass) -> Option<Handle> {
        self.handles
            .lock()
            .iter()
            .find(|h| h.class() == class)
            .map(NativeHandle::handle)
    }

    /// Apply a command to the primary handle.
    pub fn apply(&self, command: NativeCommand) -> Result<()> {
        let handle = self
            .handle()
            .ok_or(Error::InvalidArgument("widget has no native handle"))?;
        self.apply_to(handle, command)
    }

    /// Apply a command to one of the widget's handles, or to any handle the
    /// adapter knows belongs to a related widget.
    pub fn apply_to(&self, handle: Handle, command: NativeCommand) -> Result<()> {
        let display = self.display()?;
        tracing::trace!(target: targets::NATIVE, %handle, ?command, "apply");
        display.toolkit().lock().apply(handle, command)?;
        Ok(())
    }

    /// Deliver `event` synchronously to the display filters and then to
    /// this widget's listeners.
    ///
    /// Fills in the widget and, if unset, the time. Returns the event as the
    /// listeners left it.
    pub fn send_event(&self, mut event: Event) -> Result<Event> {
        let display = self.display()?;
        event.widget = Some(self.id);
        if event.time == 0 {
            event.time = display.last_event_time();
        }
        self.deliver(&display, &mut event)?;
        Ok(event)
    }

    /// Queue `event` for delivery after the current native event finishes.
    pub fn post_event(&self, mut event: Event) -> Result<()> {
        let display = self.display()?;
        event.widget = Some(self.id);
        if event.time == 0 {
            event.time = display.last_event_time();
        }
        display.enqueue_deferred(event);
        Ok(())
    }

    pub(crate) fn deliver(&self, display: &Display, event: &mut Event) -> Result<()> {
        let allowed = event.doit;
        display.filter_event(event)?;
        if allowed && !event.doit {
            tracing::trace!(target: targets::WIDGET, id = ?self.id, event = %event.event_type, "event filtered");
            return Ok(());
        }

        let listeners = self.event_table.lock().listeners(event.event_type);
        if listeners.is_empty() {
            return Ok(());
        }
        tracing::trace!(target: targets::WIDGET, id = ?self.id, event = %event.event_type, count = listeners.len(), "dispatching");
        dispatch(&listeners, event)?;
        Ok(())
    }

    /// Whether any listener is registered for `event_type`.
    pub fn hooks(&self, event_type: EventType) -> bool {
        self.event_table.lock().hooks(event_type)
    }

    fn hook(&self, event_type: EventType, listener: Listener) {
        self.event_table.lock().hook(event_type, listener);
    }

    fn unhook(&self, event_type: EventType, listener: &Listener) {
        self.event_table.lock().unhook(event_type, listener);
    }

    /// Run `f` with the widget's data store.
    pub fn with_data<R>(&self, f: impl FnOnce(&mut DataStore) -> R) -> R {
        f(&mut self.data.lock())
    }

    /// Dispose the widget and its children.
    pub fn dispose(&self) -> Result<()> {
        let Ok(display) = self.display() else {
            return Ok(());
        };
        if matches!(self.state(), WidgetState::Disposing | WidgetState::Disposed) {
            return Ok(());
        }
        let Some(widget) = display.widget(self.id) else {
            return Ok(());
        };
        dispose_widget(&display, widget)
    }

    fn set_state(&self, state: WidgetState) {
        *self.state.lock() = state;
    }

    /// Move to `Disposing` unless disposal already started.
    fn begin_dispose(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            WidgetState::Disposing | WidgetState::Disposed => false,
            _ => {
                *state = WidgetState::Disposing;
                true
            }
        }
    }

    fn release_handles(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        drop(handles);
    }

    fn finish_dispose(&self) {
        self.event_table.lock().clear();
        self.data.lock().clear();
        self.set_state(WidgetState::Disposed);
        self.display.write().take();
    }
}

impl fmt::Debug for WidgetCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetCore")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("style", &self.style)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// The adapter seam between a widget and its native peer.
pub trait NativeWidget: Send + Sync + 'static {
    /// The shared widget state.
    fn core(&self) -> &WidgetCore;

    /// The native callbacks to hook on a handle of `class`.
    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        let _ = class;
        &[]
    }

    /// Translate a native callback into widget events.
    fn handle_signal(&self, handle: Handle, signal: &NativeSignal) -> Result<()> {
        let _ = (handle, signal);
        Ok(())
    }

    /// Release widget-specific state. Runs after children are disposed and
    /// before native handles are released.
    fn release_widget(&self) {}

    /// The order in which children are disposed.
    fn child_release_order(&self, children: Vec<WidgetId>) -> Vec<WidgetId> {
        children
    }
}

/// Dispose `widget`, following the lifecycle order.
///
/// Failures raised while notifying or disposing children are captured; the
/// rest of the disposal still runs and the first failure is returned.
pub(crate) fn dispose_widget(display: &Display, widget: Arc<dyn NativeWidget>) -> Result<()> {
    let core = widget.core();
    if !display.is_valid_thread() {
        return Err(Error::ThreadInvalidAccess);
    }
    if !core.begin_dispose() {
        return Ok(());
    }
    let id = core.id();
    tracing::debug!(target: targets::WIDGET, ?id, type_name = core.type_name(), "disposing widget");

    let mut first_error: Option<Error> = None;

    if let Err(err) = core.send_event(Event::new(EventType::Dispose)) {
        tracing::warn!(target: targets::WIDGET, ?id, error = %err, "dispose listener failed");
        first_error.get_or_insert(err);
    }

    let children = display.registry().lock().children(id);
    for child_id in widget.child_release_order(children) {
        let child = display.widget(child_id);
        if let Some(child) = child
            && let Err(err) = dispose_widget(display, child)
        {
            tracing::warn!(target: targets::WIDGET, ?child_id, error = %err, "child disposal failed");
            first_error.get_or_insert(err);
        }
    }

    widget.release_widget();

    let handles = core.handles();
    {
        let mut toolkit = display.toolkit().lock();
        for handle in &handles {
            toolkit.disconnect(*handle);
        }
    }
    core.release_handles();

    let removed = display.registry().lock().remove(id);
    drop(removed);

    core.finish_dispose();
    tracing::debug!(target: targets::WIDGET, ?id, "widget disposed");

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Constructs a widget: allocates handles, registers and hooks them.
pub struct WidgetBuilder<'a> {
    display: &'a Display,
    type_name: &'static str,
    style: Style,
    parent: Option<&'a WidgetCore>,
    native_parent: Option<Handle>,
    classes: Vec<HandleClass>,
}

impl<'a> WidgetBuilder<'a> {
    /// Start building a widget of `type_name` on `display`.
    pub fn new(display: &'a Display, type_name: &'static str, style: Style) -> Self {
        Self {
            display,
            type_name,
            style,
            parent: None,
            native_parent: None,
            classes: Vec::new(),
        }
    }

    /// Set the parent widget. Its primary handle becomes the native parent.
    pub fn parent(mut self, parent: &'a WidgetCore) -> Self {
        self.parent = Some(parent);
        if self.native_parent.is_none() {
            self.native_parent = parent.handle();
        }
        self
    }

    /// Override the native parent of the primary handle.
    pub fn native_parent(mut self, handle: Handle) -> Self {
        self.native_parent = Some(handle);
        self
    }

    /// Request a native handle. The first requested handle is the primary
    /// one; later handles are allocated as its native children.
    pub fn handle(mut self, class: HandleClass) -> Self {
        self.classes.push(class);
        self
    }

    /// Allocate, register and hook the widget built by `make`.
    pub fn build<W, F>(self, make: F) -> Result<Arc<W>>
    where
        W: NativeWidget,
        F: FnOnce(WidgetCore) -> W,
    {
        let display = self.display;
        display.check_device()?;
        if let Some(parent) = self.parent {
            if !parent.display()?.ptr_eq(display) {
                return Err(Error::InvalidArgument("parent belongs to another display"));
            }
            if parent.is_disposed() {
                return Err(Error::InvalidArgument("parent widget is disposed"));
            }
        }

        let guards = self.allocate_handles()?;
        let handles: Vec<(Handle, HandleClass)> =
            guards.iter().map(|g| (g.handle(), g.class())).collect();

        let parent_id = self.parent.map(WidgetCore::id);
        let id = display.registry().lock().reserve(self.type_name, parent_id)?;
        let widget = Arc::new(make(WidgetCore::new(
            id,
            self.type_name,
            self.style,
            display.clone(),
            guards,
        )));

        {
            let mut registry = display.registry().lock();
            registry.attach(id, widget.clone() as Arc<dyn NativeWidget>);
            for (handle, _) in &handles {
                if let Err(err) = registry.register(*handle, id) {
                    let removed = registry.remove(id);
                    drop(registry);
                    drop(removed);
                    widget.core().release_handles();
                    widget.core().finish_dispose();
                    return Err(err);
                }
            }
        }

        {
            let mut toolkit = display.toolkit().lock();
            for (handle, class) in &handles {
                let signals = widget.signals(*class);
                if !signals.is_empty() {
                    toolkit.connect(*handle, signals);
                }
            }
        }

        widget.core().set_state(WidgetState::Created);
        tracing::debug!(
            target: targets::WIDGET,
            ?id,
            type_name = self.type_name,
            handles = handles.len(),
            "widget created"
        );
        Ok(widget)
    }

    fn allocate_handles(&self) -> Result<Vec<NativeHandle>> {
        let toolkit = self.display.toolkit();
        let mut guards: Vec<NativeHandle> = Vec::with_capacity(self.classes.len());
        for class in &self.classes {
            let parent = match guards.first() {
                Some(primary) => Some(primary.handle()),
                None => self.native_parent,
            };
            let created = toolkit.lock().create_handle(*class, parent);
            match created {
                Ok(handle) => guards.push(NativeHandle::new(handle, *class, toolkit)),
                Err(err) => {
                    tracing::warn!(
                        target: targets::WIDGET,
                        type_name = self.type_name,
                        class = ?class,
                        error = %err,
                        "native allocation failed"
                    );
                    // Dropping the guards releases what was already allocated.
                    drop(guards);
                    return Err(Error::NoHandles(err));
                }
            }
        }
        Ok(guards)
    }
}

/// Implemented by public widget types.
pub trait Widget {
    /// The shared widget state.
    fn core(&self) -> &WidgetCore;

    /// The widget id.
    fn id(&self) -> WidgetId {
        self.core().id()
    }

    /// The owning display. Fails once the widget is disposed.
    fn display(&self) -> Result<Display> {
        self.core().display()
    }

    /// The construction style.
    fn style(&self) -> Result<Style> {
        self.core().check_widget()?;
        Ok(self.core().style())
    }
}

/// Widgets that can be disposed.
pub trait Disposable {
    /// Dispose the widget and its children. A no-op if already disposed.
    fn dispose(&self) -> Result<()>;

    /// Whether the widget has been disposed.
    fn is_disposed(&self) -> bool;
}

impl<T: Widget + ?Sized> Disposable for T {
    fn dispose(&self) -> Result<()> {
        self.core().dispose()
    }

    fn is_disposed(&self) -> bool {
        self.core().is_disposed()
    }
}

/// Widgets that deliver events to listeners.
pub trait EventSource {
    /// Register `listener` for `event_type`.
    fn add_listener(&self, event_type: EventType, listener: Listener) -> Result<()>;

    /// Remove the first registration of `listener` for `event_type`.
    fn remove_listener(&self, event_type: EventType, listener: &Listener) -> Result<()>;

    /// Deliver `event` to the listeners for `event_type` and return it.
    fn notify_listeners(&self, event_type: EventType, event: Event) -> Result<Event>;

    /// Whether any listener is registered for `event_type`.
    fn is_listening(&self, event_type: EventType) -> Result<bool>;

    /// Register a closure for `event_type` and return its listener.
    fn on<F>(&self, event_type: EventType, callback: F) -> Result<Listener>
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        let listener = Listener::from_fn(callback);
        self.add_listener(event_type, listener.clone())?;
        Ok(listener)
    }
}

impl<T: Widget + ?Sized> EventSource for T {
    fn add_listener(&self, event_type: EventType, listener: Listener) -> Result<()> {
        self.core().check_widget()?;
        self.core().hook(event_type, listener);
        Ok(())
    }

    fn remove_listener(&self, event_type: EventType, listener: &Listener) -> Result<()> {
        self.core().check_widget()?;
        self.core().unhook(event_type, listener);
        Ok(())
    }

    fn notify_listeners(&self, event_type: EventType, mut event: Event) -> Result<Event> {
        self.core().check_widget()?;
        event.event_type = event_type;
        self.core().send_event(event)
    }

    fn is_listening(&self, event_type: EventType) -> Result<bool> {
        self.core().check_widget()?;
        Ok(self.core().hooks(event_type))
    }
}

/// Widgets backed by native handles.
pub trait NativeHandleOwner {
    /// The primary native handle, or `None` for handle-less widgets.
    fn handle(&self) -> Result<Option<Handle>>;

    /// Every native handle, primary first.
    fn handles(&self) -> Result<Vec<Handle>>;
}

impl<T: Widget + ?Sized> NativeHandleOwner for T {
    fn handle(&self) -> Result<Option<Handle>> {
        self.core().check_widget()?;
        Ok(self.core().handle())
    }

    fn handles(&self) -> Result<Vec<Handle>> {
        self.core().check_widget()?;
        Ok(self.core().handles())
    }
}

/// Widgets carrying application data.
pub trait WidgetData {
    /// Replace the unnamed data slot.
    fn set_data<T: Any + Send + Sync>(&self, value: T) -> Result<()>;

    /// Read the unnamed data slot as `T`.
    fn data<T: Any + Send + Sync>(&self) -> Result<Option<Arc<T>>>;

    /// Empty the unnamed data slot.
    fn clear_data(&self) -> Result<()>;

    /// Replace the data slot named `key`.
    fn set_data_for<T: Any + Send + Sync>(&self, key: &str, value: T) -> Result<()>;

    /// Read the data slot named `key` as `T`.
    fn data_for<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>>;

    /// Empty the data slot named `key`.
    fn remove_data_for(&self, key: &str) -> Result<bool>;
}

impl<W: Widget + ?Sized> WidgetData for W {
    fn set_data<T: Any + Send + Sync>(&self, value: T) -> Result<()> {
        self.core().check_widget()?;
        self.core().with_data(|data| data.set(value));
        Ok(())
    }

    fn data<T: Any + Send + Sync>(&self) -> Result<Option<Arc<T>>> {
        self.core().check_widget()?;
        Ok(self.core().with_data(|data| data.get::<T>()))
    }

    fn clear_data(&self) -> Result<()> {
        self.core().check_widget()?;
        self.core().with_data(DataStore::clear_value);
        Ok(())
    }

    fn set_data_for<T: Any + Send + Sync>(&self, key: &str, value: T) -> Result<()> {
        self.core().check_widget()?;
        self.core().with_data(|data| data.set_keyed(key, value));
        Ok(())
    }

    fn data_for<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>> {
        self.core().check_widget()?;
        Ok(self.core().with_data(|data| data.get_keyed::<T>(key)))
    }

    fn remove_data_for(&self, key: &str) -> Result<bool> {
        self.core().check_widget()?;
        Ok(self.core().with_data(|data| data.remove_keyed(key)))
    }
}
