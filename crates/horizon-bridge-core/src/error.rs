//! Error types for Horizon Bridge.
//!
//! Every public operation reports misuse synchronously through [`Error`].
//! The variants map onto the failure kinds a widget binding can hit:
//! touching a disposed widget or display, calling from the wrong thread,
//! passing an invalid argument, running out of native handles, and
//! listener or runnable failures.

use crate::event_table::ListenerError;
use crate::native::{Handle, NativeError};

/// The main error type for Horizon Bridge operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The widget has been disposed.
    #[error("Widget is disposed")]
    WidgetDisposed,

    /// The display has been disposed.
    #[error("Device is disposed")]
    DeviceDisposed,

    /// The operation was invoked from a thread other than the display's UI thread.
    #[error("Invalid thread access")]
    ThreadInvalidAccess,

    /// An argument was rejected before any native call was made.
    #[error("Argument not valid: {0}")]
    InvalidArgument(&'static str),

    /// An index was outside the valid range.
    #[error("Index {index} out of range (length {len})")]
    InvalidRange {
        /// The index that was passed.
        index: i64,
        /// The number of elements at the time of the call.
        len: usize,
    },

    /// An argument that must be non-zero was zero.
    #[error("Argument cannot be zero")]
    CannotBeZero,

    /// The native toolkit refused to allocate a handle.
    #[error("No more handles: {0}")]
    NoHandles(#[source] NativeError),

    /// The handle is already registered to a different live widget.
    #[error("Handle {0} is already registered to another widget")]
    HandleInUse(Handle),

    /// The calling thread already owns a display.
    #[error("The current thread already owns a display")]
    ThreadHasDisplay,

    /// The display registry refused another display.
    #[error("Too many displays (limit {limit})")]
    TooManyDisplays {
        /// The configured limit.
        limit: usize,
    },

    /// A runnable submitted to the synchronizer failed.
    #[error("Failed to execute runnable: {0}")]
    FailedExec(String),

    /// A listener reported a failure during dispatch.
    #[error("Listener failed: {0}")]
    Listener(#[from] ListenerError),

    /// A native command was rejected by the toolkit.
    #[error("Native toolkit error: {0}")]
    Native(#[from] NativeError),

    /// The configuration could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create an index range error.
    pub fn range(index: impl Into<i64>, len: usize) -> Self {
        Self::InvalidRange {
            index: index.into(),
            len,
        }
    }

    /// Returns `true` for the two disposal errors.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::WidgetDisposed | Self::DeviceDisposed)
    }
}

/// A specialized Result type for Horizon Bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
