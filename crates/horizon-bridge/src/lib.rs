//! Horizon Bridge - portable widgets over native windowing toolkits.
//!
//! This is the main umbrella crate. It re-exports the core (display loop,
//! handle registry, event tables, synchronizer) and adds the concrete
//! widget adapters in [`widgets`].
//!
//! # Example
//!
//! ```no_run
//! use horizon_bridge::prelude::*;
//!
//! fn main() -> horizon_bridge::Result<()> {
//!     let registry = DisplayRegistry::new();
//!     let display = Display::new(&registry)?;
//!     let shell = Shell::new(&display, Style::NONE)?;
//!
//!     let combo = Combo::new(&shell, Style::DROP_DOWN | Style::READ_ONLY)?;
//!     combo.set_items(["small", "medium", "large"])?;
//!     combo.on(EventType::Selection, |event| {
//!         tracing::info!(index = event.index, "size picked");
//!     })?;
//!
//!     shell.open()?;
//!     while !shell.is_disposed() {
//!         if !display.read_and_dispatch()? {
//!             display.sleep()?;
//!         }
//!     }
//!     display.dispose()
//! }
//! ```

pub use horizon_bridge_core::*;

pub mod prelude;
pub mod widgets;

pub use widgets::{
    Combo, DateTime, Menu, MenuItem, Shell, Spinner, Table, TableColumn, TableItem, ToolTip, Tray,
    TrayItem,
};

static_assertions::assert_impl_all!(Shell: Send, Sync, Clone);
static_assertions::assert_impl_all!(Combo: Send, Sync, Clone);
static_assertions::assert_impl_all!(Spinner: Send, Sync, Clone);
static_assertions::assert_impl_all!(DateTime: Send, Sync, Clone);
static_assertions::assert_impl_all!(Menu: Send, Sync, Clone);
static_assertions::assert_impl_all!(MenuItem: Send, Sync, Clone);
static_assertions::assert_impl_all!(Table: Send, Sync, Clone);
static_assertions::assert_impl_all!(TableItem: Send, Sync, Clone);
static_assertions::assert_impl_all!(TableColumn: Send, Sync, Clone);
static_assertions::assert_impl_all!(ToolTip: Send, Sync, Clone);
static_assertions::assert_impl_all!(Tray: Send, Sync, Clone);
static_assertions::assert_impl_all!(TrayItem: Send, Sync, Clone);
