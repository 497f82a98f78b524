//! Prelude module for Horizon Bridge.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use horizon_bridge::prelude::*;
//! ```
//!
//! This provides access to:
//! - Display lifecycle (`Display`, `DisplayRegistry`, `DisplayConfig`)
//! - Events and listeners (`Event`, `EventType`, `Listener`)
//! - Widget capabilities (`Disposable`, `EventSource`, `NativeHandleOwner`)
//! - Every widget adapter

// ============================================================================
// Display
// ============================================================================

pub use crate::{Display, DisplayConfig, DisplayRegistry, TimerId};

// ============================================================================
// Events
// ============================================================================

pub use crate::{Event, EventDetail, EventType, Listener, ListenerError, StateMask};

// ============================================================================
// Widget Foundation
// ============================================================================

pub use crate::{
    Disposable, EventSource, NativeHandleOwner, Style, Widget, WidgetData, WidgetId,
};

// ============================================================================
// Errors
// ============================================================================

pub use crate::{Error, Result};

// ============================================================================
// Widgets
// ============================================================================

pub use crate::widgets::{
    Combo, DateTime, Menu, MenuItem, Shell, Spinner, Table, TableColumn, TableItem, ToolTip, Tray,
    TrayItem,
};

// ============================================================================
// Native Backend
// ============================================================================

pub use crate::{Alignment, HeadlessController, HeadlessToolkit, SortDirection, TextDirection};
