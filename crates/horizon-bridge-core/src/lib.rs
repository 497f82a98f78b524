//! Core systems for Horizon Bridge.
//!
//! This crate provides the machinery every Horizon Bridge widget is built on:
//!
//! - **Display**: The per-thread event loop, deferred events, timers and teardown
//! - **Handle Registry**: Maps native handles back to the widgets that own them
//! - **Event Tables**: Ordered listener storage with veto-capable events
//! - **Synchronizer**: `async_exec` / `sync_exec` marshalling onto the UI thread
//! - **Widget Lifecycle**: Construction, native handle ownership and disposal
//! - **Native Seam**: The [`NativeToolkit`] trait and an in-process [`HeadlessToolkit`]
//!
//! # Event Loop Example
//!
//! ```
//! use horizon_bridge_core::{Display, DisplayRegistry};
//!
//! let displays = DisplayRegistry::new();
//! let display = Display::new(&displays)?;
//!
//! let worker = display.clone();
//! std::thread::spawn(move || {
//!     worker.async_exec(|| println!("on the UI thread")).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! while display.read_and_dispatch()? {}
//! display.dispose()?;
//! # Ok::<(), horizon_bridge_core::Error>(())
//! ```
//!
//! # Listener Example
//!
//! ```
//! use horizon_bridge_core::{Event, EventTable, EventType, Listener};
//!
//! let mut table = EventTable::new();
//! table.hook(EventType::Verify, Listener::from_fn(|event| {
//!     event.text = event.text.to_uppercase();
//! }));
//!
//! let mut event = Event::new(EventType::Verify).with_text("abc");
//! table.send_event(&mut event).unwrap();
//! assert_eq!(event.text, "ABC");
//! ```

pub mod config;
mod data;
mod display;
mod display_registry;
mod error;
mod event;
pub mod event_table;
pub mod headless;
pub mod logging;
pub mod native;
mod registry;
mod style;
mod synchronizer;
pub mod thread_check;
mod timer;
pub mod widget;

pub use config::DisplayConfig;
pub use data::DataStore;
pub use display::{Display, DisplayBuilder};
pub use display_registry::DisplayRegistry;
pub use error::{Error, Result};
pub use event::{Event, EventDetail, EventType, StateMask};
pub use event_table::{EventTable, Listener, ListenerError, ListenerResult};
pub use headless::{HeadlessController, HeadlessToolkit};
pub use logging::{TreeFormatOptions, TreeStyle, WidgetTreeDebug};
pub use native::{
    Alignment, Handle, HandleClass, NativeCommand, NativeError, NativeEvent, NativeSignal,
    NativeToolkit, SignalKind, SortDirection, TextDirection, Waker,
};
pub use registry::{HandleRegistry, WidgetId};
pub use style::Style;
pub use synchronizer::Synchronizer;
pub use thread_check::ThreadAffinity;
pub use timer::{TimerId, TimerManager};
pub use widget::{
    Disposable, EventSource, NativeHandle, NativeHandleOwner, NativeWidget, Widget, WidgetBuilder,
    WidgetCore, WidgetData, WidgetState,
};

static_assertions::assert_impl_all!(Display: Send, Sync, Clone);
static_assertions::assert_impl_all!(DisplayRegistry: Send, Sync, Clone);
static_assertions::assert_impl_all!(Listener: Send, Sync, Clone);
static_assertions::assert_impl_all!(Error: Send, Sync, std::error::Error);
static_assertions::assert_impl_all!(WidgetCore: Send, Sync);
static_assertions::assert_impl_all!(HeadlessController: Send, Sync, Clone);
