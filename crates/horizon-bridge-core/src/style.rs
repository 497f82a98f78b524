//! Widget style bits.
//!
//! A [`Style`] is fixed at construction. Widgets normalize it with
//! [`Style::check_bits`] so that mutually exclusive bits (for example
//! `SINGLE` and `MULTI`) never appear together.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Construction-time style flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Style(u32);

impl Style {
    /// No style bits.
    pub const NONE: Style = Style(0);

    /// Single selection.
    pub const SINGLE: Style = Style(1);
    /// Multiple selection.
    pub const MULTI: Style = Style(1 << 1);
    /// Check boxes (table rows, menu items).
    pub const CHECK: Style = Style(1 << 2);
    /// Select the whole row.
    pub const FULL_SELECTION: Style = Style(1 << 3);
    /// Text cannot be edited.
    pub const READ_ONLY: Style = Style(1 << 4);
    /// Drop-down list or menu.
    pub const DROP_DOWN: Style = Style(1 << 5);
    /// List always visible.
    pub const SIMPLE: Style = Style(1 << 6);
    /// Date editor.
    pub const DATE: Style = Style(1 << 7);
    /// Time editor.
    pub const TIME: Style = Style(1 << 8);
    /// Calendar.
    pub const CALENDAR: Style = Style(1 << 9);
    /// Short date or time format.
    pub const SHORT: Style = Style(1 << 10);
    /// Medium date or time format.
    pub const MEDIUM: Style = Style(1 << 11);
    /// Long date or time format.
    pub const LONG: Style = Style(1 << 12);
    /// Menu bar.
    pub const BAR: Style = Style(1 << 13);
    /// Popup menu.
    pub const POP_UP: Style = Style(1 << 14);
    /// Item with a sub-menu.
    pub const CASCADE: Style = Style(1 << 15);
    /// Plain item.
    pub const PUSH: Style = Style(1 << 16);
    /// Radio item.
    pub const RADIO: Style = Style(1 << 17);
    /// Separator item.
    pub const SEPARATOR: Style = Style(1 << 18);
    /// Balloon tooltip.
    pub const BALLOON: Style = Style(1 << 19);
    /// Information icon.
    pub const ICON_INFORMATION: Style = Style(1 << 20);
    /// Warning icon.
    pub const ICON_WARNING: Style = Style(1 << 21);
    /// Error icon.
    pub const ICON_ERROR: Style = Style(1 << 22);
    /// Left-to-right orientation.
    pub const LEFT_TO_RIGHT: Style = Style(1 << 23);
    /// Right-to-left orientation.
    pub const RIGHT_TO_LEFT: Style = Style(1 << 24);
    /// Border.
    pub const BORDER: Style = Style(1 << 25);
    /// Wrap text.
    pub const WRAP: Style = Style(1 << 26);

    /// Create a style from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if every bit of `flag` is set.
    pub const fn has(self, flag: Style) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Keep exactly one of `exclusive`.
    ///
    /// If none is set the first is added. If several are set, the one listed
    /// first wins.
    pub fn check_bits(self, exclusive: &[Style]) -> Style {
        let mask = exclusive.iter().fold(0, |acc, style| acc | style.0);
        if self.0 & mask == 0 {
            return exclusive.first().map_or(self, |first| self | *first);
        }
        let cleared = Style(self.0 & !mask);
        exclusive
            .iter()
            .find(|style| self.has(**style))
            .map_or(self, |style| cleared | *style)
    }
}

impl BitOr for Style {
    type Output = Style;

    fn bitor(self, rhs: Self) -> Self::Output {
        Style(self.0 | rhs.0)
    }
}

impl BitOrAssign for Style {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Style {
    type Output = Style;

    fn bitand(self, rhs: Self) -> Self::Output {
        Style(self.0 & rhs.0)
    }
}

impl Not for Style {
    type Output = Style;

    fn not(self) -> Self::Output {
        Style(!self.0)
    }
}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Style({:#x})", self.0)
    }
}
