//! The native toolkit seam.
//!
//! Horizon Bridge never talks to a windowing system directly. Everything it
//! needs from one goes through [`NativeToolkit`]:
//!
//! - handle allocation and release ([`NativeToolkit::create_handle`],
//!   [`NativeToolkit::destroy_handle`])
//! - callback hook-up ([`NativeToolkit::connect`] / [`NativeToolkit::disconnect`])
//! - state writes ([`NativeToolkit::apply`] with a [`NativeCommand`])
//! - the event source ([`NativeToolkit::events_pending`] / [`NativeToolkit::next_event`])
//!
//! Native callbacks arrive as [`NativeEvent`]s carrying a [`NativeSignal`].
//! Each signal carries the native state the adapter needs (entry text, row
//! index, spin value), so adapters never read native state back.
//!
//! # Related Modules
//!
//! - [`crate::headless`] - An in-process toolkit used by tests and headless hosts
//! - [`crate::Display`] - Owns the toolkit and pumps its events
//! - [`crate::HandleRegistry`] - Maps handles back to their wrapper widgets

use std::fmt;
use std::num::NonZeroU64;

use crossbeam_channel::{Receiver, Sender};

/// An opaque native resource identifier.
///
/// Handles are owned by the native toolkit. A handle is never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroU64);

impl Handle {
    /// Create a handle from its raw value.
    ///
    /// Returns `None` for zero, which no toolkit hands out.
    #[inline]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Get the raw value of this handle.
    #[inline]
    pub fn as_raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// The native class requested when allocating a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleClass {
    /// A top-level window.
    Window,
    /// The outer box of a combo box.
    Combo,
    /// A single-line text entry.
    Entry,
    /// A popup list (combo drop-down).
    PopupList,
    /// A push button (combo arrow).
    Button,
    /// A spin button.
    SpinButton,
    /// A calendar / date-time editor.
    Calendar,
    /// A menu shell (bar, popup or drop-down).
    Menu,
    /// A menu item.
    MenuItem,
    /// A tree view used for tables.
    TreeView,
    /// A tree view column.
    TreeColumn,
    /// A tooltip window.
    TooltipWindow,
    /// A status (tray) icon.
    StatusIcon,
}

/// Horizontal alignment for column content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Align to the leading edge.
    #[default]
    Left,
    /// Center the content.
    Center,
    /// Align to the trailing edge.
    Right,
}

/// Sort indicator shown in a column header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// No indicator.
    #[default]
    None,
    /// Ascending.
    Up,
    /// Descending.
    Down,
}

/// Text direction of a widget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextDirection {
    /// Left-to-right layout.
    #[default]
    LeftToRight,
    /// Right-to-left (mirrored) layout.
    RightToLeft,
}

/// Identifies a native callback without its payload.
///
/// Widgets declare the kinds they hook at creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Text or list value changed.
    Changed,
    /// Activation (Enter in an entry, menu item activation, tray click).
    Activate,
    /// Text is about to be inserted.
    Insert,
    /// Text is about to be deleted.
    Delete,
    /// A numeric value changed.
    ValueChanged,
    /// A toggle changed state.
    Toggled,
    /// A mouse button was pressed.
    ButtonPress,
    /// A key was pressed.
    KeyPress,
    /// Keyboard focus entered.
    FocusIn,
    /// Keyboard focus left.
    FocusOut,
    /// The widget was shown.
    Show,
    /// The widget was hidden.
    Hide,
    /// The widget was clicked.
    Clicked,
    /// The window manager asked to close the window.
    DeleteRequest,
    /// A row was activated (double click / Enter).
    RowActivated,
    /// The selected rows changed.
    SelectionChanged,
    /// A row check box was toggled.
    RowToggled,
    /// A column header was clicked.
    ColumnClicked,
    /// A column was resized.
    ColumnResized,
    /// The user dragged columns into a new order.
    ColumnsReordered,
    /// The date changed.
    DateChanged,
    /// The time changed.
    TimeChanged,
    /// A context menu was requested.
    PopupMenu,
    /// The input method pre-edit (composition) string changed.
    PreeditChanged,
    /// A menu item was highlighted.
    Select,
    /// The native object is being destroyed.
    Destroy,
}

/// A native callback with its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeSignal {
    /// Text or list value changed.
    Changed {
        /// The current entry text.
        text: String,
        /// The selected list row, if the change came from the list.
        selected: Option<usize>,
    },
    /// Activation.
    Activate,
    /// Text is about to be inserted at `position`.
    Insert {
        /// The text being inserted.
        text: String,
        /// The insertion position in characters.
        position: usize,
    },
    /// Text in `start..end` is about to be deleted.
    Delete {
        /// Start of the deleted range.
        start: usize,
        /// End of the deleted range.
        end: usize,
    },
    /// A numeric value changed.
    ValueChanged {
        /// The new value.
        value: i32,
    },
    /// A toggle changed state.
    Toggled {
        /// The new toggle state.
        active: bool,
    },
    /// A mouse button was pressed.
    ButtonPress {
        /// X coordinate relative to the widget.
        x: i32,
        /// Y coordinate relative to the widget.
        y: i32,
        /// The button number (1 = primary).
        button: u32,
        /// Click count (2 for a double click).
        count: u32,
        /// Native modifier state.
        state: u32,
    },
    /// A key was pressed.
    KeyPress {
        /// The key code.
        key_code: u32,
        /// The character produced, if any.
        character: Option<char>,
        /// Native modifier state.
        state: u32,
    },
    /// Keyboard focus entered.
    FocusIn,
    /// Keyboard focus left.
    FocusOut,
    /// The widget was shown.
    Show,
    /// The widget was hidden.
    Hide,
    /// The widget was clicked.
    Clicked,
    /// The window manager asked to close the window.
    DeleteRequest,
    /// A row was activated.
    RowActivated {
        /// The activated row.
        row: usize,
    },
    /// The selected rows changed.
    SelectionChanged {
        /// All selected rows.
        rows: Vec<usize>,
        /// The row with keyboard focus, if any.
        focus: Option<usize>,
    },
    /// A row check box was toggled.
    RowToggled {
        /// The toggled row.
        row: usize,
        /// The new check state.
        checked: bool,
    },
    /// A column header was clicked.
    ColumnClicked,
    /// A column was resized.
    ColumnResized {
        /// The new width.
        width: i32,
    },
    /// The user dragged columns into a new order.
    ColumnsReordered {
        /// Column indices in display order.
        order: Vec<usize>,
    },
    /// The date changed.
    DateChanged {
        /// Year.
        year: i32,
        /// Month, 1-based.
        month: u32,
        /// Day of month, 1-based.
        day: u32,
    },
    /// The time changed.
    TimeChanged {
        /// Hours, 0-23.
        hour: u32,
        /// Minutes, 0-59.
        minute: u32,
        /// Seconds, 0-59.
        second: u32,
    },
    /// A context menu was requested.
    PopupMenu {
        /// X coordinate in screen space.
        x: i32,
        /// Y coordinate in screen space.
        y: i32,
    },
    /// The input method pre-edit string changed.
    PreeditChanged {
        /// The composition text.
        text: String,
        /// Cursor offset inside the composition text.
        cursor: usize,
    },
    /// A menu item was highlighted.
    Select,
    /// The native object is being destroyed.
    Destroy,
}

impl NativeSignal {
    /// Get the kind of this signal.
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Changed { .. } => SignalKind::Changed,
            Self::Activate => SignalKind::Activate,
            Self::Insert { .. } => SignalKind::Insert,
            Self::Delete { .. } => SignalKind::Delete,
            Self::ValueChanged { .. } => SignalKind::ValueChanged,
            Self::Toggled { .. } => SignalKind::Toggled,
            Self::ButtonPress { .. } => SignalKind::ButtonPress,
            Self::KeyPress { .. } => SignalKind::KeyPress,
            Self::FocusIn => SignalKind::FocusIn,
            Self::FocusOut => SignalKind::FocusOut,
            Self::Show => SignalKind::Show,
            Self::Hide => SignalKind::Hide,
            Self::Clicked => SignalKind::Clicked,
            Self::DeleteRequest => SignalKind::DeleteRequest,
            Self::RowActivated { .. } => SignalKind::RowActivated,
            Self::SelectionChanged { .. } => SignalKind::SelectionChanged,
            Self::RowToggled { .. } => SignalKind::RowToggled,
            Self::ColumnClicked => SignalKind::ColumnClicked,
            Self::ColumnResized { .. } => SignalKind::ColumnResized,
            Self::ColumnsReordered { .. } => SignalKind::ColumnsReordered,
            Self::DateChanged { .. } => SignalKind::DateChanged,
            Self::TimeChanged { .. } => SignalKind::TimeChanged,
            Self::PopupMenu { .. } => SignalKind::PopupMenu,
            Self::PreeditChanged { .. } => SignalKind::PreeditChanged,
            Self::Select => SignalKind::Select,
            Self::Destroy => SignalKind::Destroy,
        }
    }
}

/// One native callback invocation, as delivered by the toolkit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeEvent {
    /// The handle the callback was raised on.
    pub handle: Handle,
    /// The callback and its payload.
    pub signal: NativeSignal,
    /// Toolkit timestamp in milliseconds.
    pub time: u32,
}

/// A write to native state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeCommand {
    /// Set the text (entry text, window title, item label, tooltip text).
    SetText(String),
    /// Replace the list of items.
    SetItems(Vec<String>),
    /// Select a list row, or clear the list selection.
    SetSelectedIndex(Option<usize>),
    /// Select a character range in an entry.
    SetTextSelection {
        /// Start of the range.
        start: usize,
        /// End of the range.
        end: usize,
    },
    /// Limit the entry length.
    SetTextLimit(usize),
    /// Set a numeric range.
    SetRange {
        /// Minimum value.
        min: i32,
        /// Maximum value.
        max: i32,
    },
    /// Set a numeric value.
    SetValue(i32),
    /// Set step and page increments.
    SetIncrements {
        /// Step increment.
        step: i32,
        /// Page increment.
        page: i32,
    },
    /// Set the number of decimal digits.
    SetDigits(u32),
    /// Set a date.
    SetDate {
        /// Year.
        year: i32,
        /// Month, 1-based.
        month: u32,
        /// Day, 1-based.
        day: u32,
    },
    /// Set a time of day.
    SetTime {
        /// Hours.
        hour: u32,
        /// Minutes.
        minute: u32,
        /// Seconds.
        second: u32,
    },
    /// Show or hide.
    SetVisible(bool),
    /// Enable or disable.
    SetEnabled(bool),
    /// Set a toggle state.
    SetChecked(bool),
    /// Set a keyboard accelerator.
    SetAccelerator(u32),
    /// Move to a location.
    SetLocation {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },
    /// Set the text direction.
    SetDirection(TextDirection),
    /// Set a secondary message (tooltip body).
    SetMessage(String),
    /// Hide automatically after a timeout.
    SetAutoHide(bool),
    /// Attach (or detach) a sub-menu.
    AttachSubmenu(Option<Handle>),
    /// Attach (or detach) a tooltip.
    AttachToolTip(Option<Handle>),
    /// Attach (or detach) a menu bar.
    SetMenuBar(Option<Handle>),
    /// Mark a menu item as the default item.
    SetDefaultItem(Option<Handle>),
    /// Insert a child handle at `index` (menu items, columns).
    InsertChild {
        /// The child handle.
        child: Handle,
        /// Position among the children.
        index: usize,
    },
    /// Insert an empty row at `index`.
    InsertRow(usize),
    /// Remove rows in `start..end`.
    RemoveRows {
        /// First removed row.
        start: usize,
        /// One past the last removed row.
        end: usize,
    },
    /// Set the text of one cell.
    SetCellText {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
        /// Cell text.
        text: String,
    },
    /// Set the check state of a row.
    SetRowChecked {
        /// Row index.
        row: usize,
        /// Check state.
        checked: bool,
    },
    /// Set the grayed state of a row check box.
    SetRowGrayed {
        /// Row index.
        row: usize,
        /// Grayed state.
        grayed: bool,
    },
    /// Select exactly these rows.
    SelectRows(Vec<usize>),
    /// Set a column width.
    SetWidth(i32),
    /// Set a column alignment.
    SetAlignment(Alignment),
    /// Allow or forbid column resizing.
    SetResizable(bool),
    /// Allow or forbid column reordering.
    SetMoveable(bool),
    /// Show or hide column headers.
    SetHeaderVisible(bool),
    /// Show or hide grid lines.
    SetLinesVisible(bool),
    /// Scroll so `row` is the first visible row.
    SetTopIndex(usize),
    /// Scroll the least amount needed to make `row` visible.
    ShowRow(usize),
    /// Scroll the least amount needed to make a column visible.
    ShowColumn(usize),
    /// Reset the cells and check state of `row`.
    ClearRow(usize),
    /// Show columns in this order (column indices in display order).
    SetColumnOrder(Vec<usize>),
    /// Mark a column as the sort column, or clear the mark.
    SetSortColumn(Option<Handle>),
    /// Set the sort indicator of the sort column.
    SetSortDirection(SortDirection),
}

/// Errors raised by a native toolkit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// The toolkit refused to allocate a handle.
    #[error("native toolkit refused to allocate a {0:?} handle")]
    AllocationFailed(HandleClass),
    /// The handle is unknown or already destroyed.
    #[error("unknown native handle {0}")]
    UnknownHandle(Handle),
    /// The toolkit refused a state write.
    #[error("native toolkit rejected a command for handle {0}")]
    CommandRejected(Handle),
    /// The toolkit has been shut down.
    #[error("native toolkit has shut down")]
    ShutDown,
}

/// Wakes a display blocked in [`crate::Display::sleep`].
///
/// Cloneable and usable from any thread. Toolkits receive one through
/// [`NativeToolkit::install_waker`] and call [`Waker::wake`] whenever a
/// native event becomes pending.
#[derive(Clone, Debug)]
pub struct Waker {
    tx: Sender<()>,
}

impl Waker {
    /// Create a waker and the receiving end the display sleeps on.
    pub(crate) fn channel() -> (Self, Receiver<()>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (Self { tx }, rx)
    }

    /// Wake the display.
    ///
    /// Wakes coalesce: waking an already-woken display is a no-op.
    pub fn wake(&self) {
        let _ = self.tx.try_send(());
    }
}

/// The interface every native windowing toolkit backend implements.
///
/// All methods except [`install_waker`](Self::install_waker) are called on
/// the display's UI thread only, under the display's toolkit lock.
pub trait NativeToolkit: Send {
    /// A short name for diagnostics.
    fn name(&self) -> &str;

    /// Receive the waker to call when native events become pending.
    fn install_waker(&mut self, waker: Waker);

    /// Allocate a native handle of the given class.
    fn create_handle(
        &mut self,
        class: HandleClass,
        parent: Option<Handle>,
    ) -> Result<Handle, NativeError>;

    /// Release a native handle. Unknown handles are ignored.
    fn destroy_handle(&mut self, handle: Handle);

    /// Hook the given native callbacks on `handle`.
    fn connect(&mut self, handle: Handle, signals: &[SignalKind]);

    /// Unhook every native callback on `handle`.
    fn disconnect(&mut self, handle: Handle);

    /// Write native state.
    fn apply(&mut self, handle: Handle, command: NativeCommand) -> Result<(), NativeError>;

    /// Whether a native event is ready to be read.
    fn events_pending(&self) -> bool;

    /// Read the next native event, if any.
    fn next_event(&mut self) -> Option<NativeEvent>;

    /// Emit a short sound.
    fn beep(&mut self) {}

    /// The text on the system clipboard, if any.
    fn clipboard_text(&self) -> Option<String> {
        None
    }

    /// Put `text` on the system clipboard.
    fn set_clipboard_text(&mut self, text: String) {
        let _ = text;
    }

    /// Release loop-owned native resources.
    fn shutdown(&mut self) {}
}
