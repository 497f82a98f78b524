//! Widget event types.
//!
//! An [`Event`] is a plain record handed to listeners by `&mut` reference.
//! Listeners may write back into it: clearing [`Event::doit`] cancels a
//! vetoable action (Verify, Close, a filtered event), and a Verify listener
//! may replace [`Event::text`].

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::registry::WidgetId;

/// The kind of a widget or display event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A key was pressed.
    KeyDown,
    /// A key was released.
    KeyUp,
    /// A mouse button was pressed.
    MouseDown,
    /// A mouse button was released.
    MouseUp,
    /// A mouse button was double clicked.
    MouseDoubleClick,
    /// The selection changed.
    Selection,
    /// The default action was triggered (Enter, double click).
    DefaultSelection,
    /// Text or value changed.
    Modify,
    /// Text is about to change; listeners may veto or rewrite it.
    Verify,
    /// The widget or display is being disposed.
    Dispose,
    /// A close was requested; listeners may veto it.
    Close,
    /// The widget became visible.
    Show,
    /// The widget was hidden.
    Hide,
    /// Keyboard focus entered.
    FocusIn,
    /// Keyboard focus left.
    FocusOut,
    /// A menu item is about to be shown as highlighted.
    Arm,
    /// A context menu was requested.
    MenuDetect,
    /// The widget was resized.
    Resize,
    /// The widget moved (a column changed its display position).
    Move,
    /// The input method composition changed.
    ImeComposition,
    /// System settings changed.
    Settings,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Extra detail carried by some events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EventDetail {
    /// No detail.
    #[default]
    None,
    /// A check box was toggled (table rows, check menu items).
    Check,
    /// The drop-down arrow was activated.
    Arrow,
}

/// Keyboard and mouse modifier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StateMask(u32);

impl StateMask {
    /// No modifiers.
    pub const NONE: Self = Self(0);
    /// Shift key.
    pub const SHIFT: Self = Self(1 << 17);
    /// Control key.
    pub const CTRL: Self = Self(1 << 18);
    /// Alt key.
    pub const ALT: Self = Self(1 << 16);
    /// Command / super key.
    pub const COMMAND: Self = Self(1 << 22);
    /// Primary mouse button.
    pub const BUTTON1: Self = Self(1 << 19);
    /// Middle mouse button.
    pub const BUTTON2: Self = Self(1 << 20);
    /// Secondary mouse button.
    pub const BUTTON3: Self = Self(1 << 21);

    /// Create a mask from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no modifier is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for StateMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StateMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for StateMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// A widget or display event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The event kind.
    pub event_type: EventType,
    /// The widget the event is delivered to.
    pub widget: Option<WidgetId>,
    /// The item (menu item, table item, tray item) the event refers to.
    pub item: Option<WidgetId>,
    /// Toolkit timestamp in milliseconds.
    pub time: u32,
    /// An item index, or -1.
    pub index: i32,
    /// Extra detail.
    pub detail: EventDetail,
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
    /// Mouse button number.
    pub button: u32,
    /// Click count.
    pub count: u32,
    /// Modifier state.
    pub state_mask: StateMask,
    /// Key code.
    pub key_code: u32,
    /// Typed character.
    pub character: Option<char>,
    /// Text being inserted (Verify) or composed (ImeComposition).
    pub text: String,
    /// Start of the affected text range.
    pub start: usize,
    /// End of the affected text range.
    pub end: usize,
    /// Whether the action should proceed. Listeners clear this to veto.
    pub doit: bool,
}

impl Event {
    /// Create an event of the given kind with default fields.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            widget: None,
            item: None,
            time: 0,
            index: -1,
            detail: EventDetail::None,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            button: 0,
            count: 0,
            state_mask: StateMask::NONE,
            key_code: 0,
            character: None,
            text: String::new(),
            start: 0,
            end: 0,
            doit: true,
        }
    }

    /// Set the item.
    pub fn with_item(mut self, item: WidgetId) -> Self {
        self.item = Some(item);
        self
    }

    /// Set the index.
    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }

    /// Set the detail.
    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Set the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the affected text range.
    pub fn with_range(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Set the location.
    pub fn with_location(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the timestamp.
    pub fn with_time(mut self, time: u32) -> Self {
        self.time = time;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_defaults() {
        let event = Event::new(EventType::Verify);
        assert!(event.doit);
        assert_eq!(event.index, -1);
        assert!(event.widget.is_none());
        assert!(event.text.is_empty());
    }

    #[test]
    fn test_event_builders() {
        let event = Event::new(EventType::Verify)
            .with_text("abc")
            .with_range(2, 2)
            .with_index(4);
        assert_eq!(event.text, "abc");
        assert_eq!((event.start, event.end), (2, 2));
        assert_eq!(event.index, 4);
    }

    #[test]
    fn test_state_mask() {
        let mask = StateMask::SHIFT | StateMask::CTRL;
        assert!(mask.contains(StateMask::SHIFT));
        assert!(!mask.contains(StateMask::ALT));
        assert!((mask & StateMask::ALT).is_empty());
    }
}
