//! Concrete widget adapters.
//!
//! Each widget is a cheap, cloneable handle around an `Arc` of its adapter.
//! The adapter composes a [`WidgetCore`] and implements [`NativeWidget`]:
//! it names the native callbacks it hooks and translates them into portable
//! [`Event`]s.
//!
//! # Available Widgets
//!
//! - [`Shell`] - Top-level window and parent for other widgets
//! - [`Combo`] - Editable or read-only drop-down list
//! - [`Spinner`] - Numeric entry with increments and fixed decimal digits
//! - [`DateTime`] - Date, time or calendar picker
//! - [`Menu`] / [`MenuItem`] - Menu bars, pop-up and drop-down menus
//! - [`Table`] / [`TableItem`] / [`TableColumn`] - Multi-column list
//! - [`ToolTip`] - Balloon or plain tooltip
//! - [`Tray`] / [`TrayItem`] - System tray icons
//!
//! # Indices
//!
//! Index arguments and results are `i32`, with `-1` meaning "no item", the
//! same convention the framework's list widgets use. Accessors that take an
//! index fail with [`Error::InvalidRange`] outside `0..count`.

mod combo;
mod date_time;
mod menu;
mod menu_item;
mod shell;
mod spinner;
mod table;
mod table_column;
mod table_item;
mod tool_tip;
mod tray;

pub use combo::Combo;
pub use date_time::DateTime;
pub use menu::Menu;
pub use menu_item::MenuItem;
pub use shell::Shell;
pub use spinner::Spinner;
pub use table::Table;
pub use table_column::TableColumn;
pub use table_item::TableItem;
pub use tool_tip::ToolTip;
pub use tray::{Tray, TrayItem};

use horizon_bridge_core::logging::targets;
use horizon_bridge_core::{
    Error, Event, EventType, NativeSignal, Result, StateMask, Style, TextDirection, Widget,
    WidgetCore,
};

/// The default text limit of editable widgets.
pub const TEXT_LIMIT: usize = i32::MAX as usize;

// ============================================================================
// Index helpers
// ============================================================================

/// Validate `index` against `len` and convert it.
pub(crate) fn check_index(index: i32, len: usize) -> Result<usize> {
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(Error::range(index, len)),
    }
}

/// Validate an insertion position, which may equal `len`.
pub(crate) fn check_insert_index(index: i32, len: usize) -> Result<usize> {
    match usize::try_from(index) {
        Ok(i) if i <= len => Ok(i),
        _ => Err(Error::range(index, len)),
    }
}

/// Validate an inclusive range `start..=end` against `len`.
pub(crate) fn check_range(start: i32, end: i32, len: usize) -> Result<(usize, usize)> {
    let start_index = check_index(start, len)?;
    let end_index = check_index(end, len)?;
    if start_index > end_index {
        return Err(Error::range(start, len));
    }
    Ok((start_index, end_index))
}

/// Convert a position to the `i32` index convention.
pub(crate) fn to_index(position: Option<usize>) -> i32 {
    position
        .and_then(|p| i32::try_from(p).ok())
        .unwrap_or(-1)
}

/// Convert a count to `i32`, saturating.
pub(crate) fn to_count(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

// ============================================================================
// Text helpers
// ============================================================================

/// The number of characters in `text`.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Keep at most `limit` characters.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Replace the characters `start..end` of `text` with `insert`.
pub(crate) fn splice_chars(text: &str, start: usize, end: usize, insert: &str) -> String {
    let len = char_len(text);
    let start = start.min(len);
    let end = end.clamp(start, len);
    let mut result: String = text.chars().take(start).collect();
    result.push_str(insert);
    result.extend(text.chars().skip(end));
    result
}

// ============================================================================
// Creation
// ============================================================================

/// Run the native setup of a freshly built widget.
///
/// If `setup` fails the widget is disposed before the error is returned, so
/// a failed constructor leaves nothing registered.
pub(crate) fn finish_create<W: Widget>(widget: W, setup: impl FnOnce(&W) -> Result<()>) -> Result<W> {
    if let Err(err) = setup(&widget) {
        if let Err(dispose_err) = widget.core().dispose() {
            tracing::warn!(
                target: targets::WIDGET,
                id = ?widget.core().id(),
                error = %dispose_err,
                "failed to dispose partially created widget"
            );
        }
        return Err(err);
    }
    Ok(widget)
}

// ============================================================================
// Orientation
// ============================================================================

/// Keep one orientation bit, defaulting to left-to-right.
pub(crate) fn check_orientation(style: Style) -> Style {
    style.check_bits(&[Style::LEFT_TO_RIGHT, Style::RIGHT_TO_LEFT])
}

/// The text direction for an orientation style.
pub(crate) fn direction_of(orientation: Style) -> TextDirection {
    if orientation.has(Style::RIGHT_TO_LEFT) {
        TextDirection::RightToLeft
    } else {
        TextDirection::LeftToRight
    }
}

/// The orientation bits of `style`.
pub(crate) fn orientation_of(style: Style) -> Style {
    style & (Style::LEFT_TO_RIGHT | Style::RIGHT_TO_LEFT)
}

// ============================================================================
// Shared signal translation
// ============================================================================

/// Translate input and focus callbacks shared by every control.
///
/// Returns `Ok(false)` if `signal` is not one of them.
pub(crate) fn send_input_event(core: &WidgetCore, signal: &NativeSignal) -> Result<bool> {
    match signal {
        NativeSignal::KeyPress {
            key_code,
            character,
            state,
        } => {
            let mut event = Event::new(EventType::KeyDown);
            event.key_code = *key_code;
            event.character = *character;
            event.state_mask = StateMask::from_bits(*state);
            core.send_event(event)?;
        }
        NativeSignal::ButtonPress {
            x,
            y,
            button,
            count,
            state,
        } => {
            let mut event = Event::new(EventType::MouseDown).with_location(*x, *y);
            event.button = *button;
            event.count = *count;
            event.state_mask = StateMask::from_bits(*state);
            core.send_event(event.clone())?;
            if *count == 2 {
                event.event_type = EventType::MouseDoubleClick;
                core.send_event(event)?;
            }
        }
        NativeSignal::FocusIn => {
            core.send_event(Event::new(EventType::FocusIn))?;
        }
        NativeSignal::FocusOut => {
            core.send_event(Event::new(EventType::FocusOut))?;
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Send `Verify` for a proposed text edit.
///
/// Returns the text to insert, or `None` if a listener denied the edit.
pub(crate) fn verify_text(
    core: &WidgetCore,
    text: &str,
    start: usize,
    end: usize,
) -> Result<Option<String>> {
    if !core.hooks(EventType::Verify) && !has_verify_filter(core) {
        return Ok(Some(text.to_string()));
    }
    let event = core.send_event(Event::new(EventType::Verify).with_text(text).with_range(start, end))?;
    Ok(event.doit.then_some(event.text))
}

fn has_verify_filter(core: &WidgetCore) -> bool {
    core.display()
        .map(|display| display.has_filter(EventType::Verify))
        .unwrap_or(false)
}
