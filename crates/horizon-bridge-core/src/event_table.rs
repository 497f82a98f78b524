//! Listener storage and dispatch.
//!
//! An [`EventTable`] is an ordered list of `(EventType, Listener)` pairs.
//! Listeners for one type run in registration order. The same listener may
//! be hooked more than once and then runs once per registration.
//!
//! Dispatch never holds the table while listeners run: callers snapshot the
//! listeners with [`EventTable::listeners`] and hand them to [`dispatch`].
//! A listener that adds or removes listeners during dispatch therefore
//! affects the next event, not the current one.
//!
//! # Example
//!
//! ```
//! use horizon_bridge_core::{Event, EventTable, EventType, Listener};
//!
//! let mut table = EventTable::new();
//! let listener = Listener::from_fn(|event| event.doit = false);
//! table.hook(EventType::Verify, listener.clone());
//!
//! let mut event = Event::new(EventType::Verify);
//! table.send_event(&mut event).unwrap();
//! assert!(!event.doit);
//!
//! assert!(table.unhook(EventType::Verify, &listener));
//! assert!(!table.hooks(EventType::Verify));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::event::{Event, EventType};

/// An error returned by a listener.
///
/// Dispatch stops at the first listener that returns an error; the error
/// surfaces to whoever sent the event.
#[derive(Clone)]
pub struct ListenerError {
    inner: Arc<dyn std::error::Error + Send + Sync>,
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MessageError {}

impl ListenerError {
    /// Wrap an error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Create an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }
}

impl fmt::Debug for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerError").field(&self.inner).finish()
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// The result of running a listener.
pub type ListenerResult = std::result::Result<(), ListenerError>;

type Callback = dyn Fn(&mut Event) -> ListenerResult + Send + Sync;

/// A callback registered for one or more event types.
///
/// Listeners compare by identity: a clone is the same listener, two
/// listeners built from identical closures are not.
#[derive(Clone)]
pub struct Listener {
    callback: Arc<Callback>,
}

impl Listener {
    /// Create a listener from a fallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut Event) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Create a listener from a callback that cannot fail.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        Self::new(move |event| {
            callback(event);
            Ok(())
        })
    }

    /// Run the listener.
    pub fn handle_event(&self, event: &mut Event) -> ListenerResult {
        (self.callback)(event)
    }

    /// Whether both values are the same listener.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(&other.callback))
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("callback", &Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Run `listeners` against `event` in order, stopping at the first error.
pub fn dispatch(listeners: &[Listener], event: &mut Event) -> ListenerResult {
    for listener in listeners {
        listener.handle_event(event)?;
    }
    Ok(())
}

/// Ordered storage of listeners keyed by event type.
#[derive(Clone, Default, Debug)]
pub struct EventTable {
    entries: Vec<(EventType, Listener)>,
}

impl EventTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for `event_type`.
    pub fn hook(&mut self, event_type: EventType, listener: Listener) {
        self.entries.push((event_type, listener));
    }

    /// Remove the first registration of `listener` for `event_type`.
    ///
    /// Returns `false` if the listener was not registered for that type.
    pub fn unhook(&mut self, event_type: EventType, listener: &Listener) -> bool {
        let position = self
            .entries
            .iter()
            .position(|(ty, registered)| *ty == event_type && registered.ptr_eq(listener));
        match position {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether any listener is registered for `event_type`.
    pub fn hooks(&self, event_type: EventType) -> bool {
        self.entries.iter().any(|(ty, _)| *ty == event_type)
    }

    /// Snapshot the listeners for `event_type`, in registration order.
    pub fn listeners(&self, event_type: EventType) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(ty, _)| *ty == event_type)
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    /// Deliver `event` to the listeners registered for its type.
    pub fn send_event(&self, event: &mut Event) -> ListenerResult {
        let listeners = self.listeners(event.event_type);
        dispatch(&listeners, event)
    }

    /// The total number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no registrations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
