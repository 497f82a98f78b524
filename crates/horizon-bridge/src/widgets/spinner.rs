//! Spinner widget for numeric entry.
//!
//! A [`Spinner`] edits an integer `selection` between `minimum` and
//! `maximum`. With `digits` set, the value is shown with that many decimal
//! places: a selection of `1234` with two digits reads `12.34`.
//!
//! # Example
//!
//! ```ignore
//! let spinner = Spinner::new(&shell, Style::BORDER)?;
//! spinner.set_values(250, 0, 1000, 2, 5, 100)?;
//! assert_eq!(spinner.text()?, "2.50");
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_bridge_core::{
    Error, Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal, NativeWidget,
    Result, SignalKind, Style, Widget, WidgetBuilder, WidgetCore,
};

use super::{
    TEXT_LIMIT, char_len, check_orientation, direction_of, finish_create, send_input_event,
    splice_chars, truncate_chars, verify_text,
};

/// The largest number of decimal digits a spinner shows.
pub const MAX_DIGITS: u32 = 9;

const SPINNER_SIGNALS: &[SignalKind] = &[
    SignalKind::Changed,
    SignalKind::Insert,
    SignalKind::Delete,
    SignalKind::ValueChanged,
    SignalKind::Activate,
    SignalKind::KeyPress,
    SignalKind::ButtonPress,
    SignalKind::FocusIn,
    SignalKind::FocusOut,
];

#[derive(Debug, Clone, PartialEq)]
struct SpinnerState {
    minimum: i32,
    maximum: i32,
    selection: i32,
    increment: i32,
    page_increment: i32,
    digits: u32,
    text_limit: usize,
    text: String,
}

impl Default for SpinnerState {
    fn default() -> Self {
        Self {
            minimum: 0,
            maximum: 100,
            selection: 0,
            increment: 1,
            page_increment: 10,
            digits: 0,
            text_limit: TEXT_LIMIT,
            text: format_value(0, 0),
        }
    }
}

impl SpinnerState {
    fn set_selection(&mut self, value: i32) {
        self.selection = value.clamp(self.minimum, self.maximum);
        self.text = format_value(self.selection, self.digits);
    }
}

struct SpinnerInner {
    core: WidgetCore,
    state: Mutex<SpinnerState>,
}

/// A numeric entry with up and down arrows.
#[derive(Clone)]
pub struct Spinner {
    inner: Arc<SpinnerInner>,
}

impl Spinner {
    /// Create a spinner inside `parent`.
    pub fn new(parent: &impl Widget, style: Style) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let style = check_orientation(style);
        let inner = WidgetBuilder::new(&display, "Spinner", style)
            .parent(parent.core())
            .handle(HandleClass::SpinButton)
            .build(|core| SpinnerInner {
                core,
                state: Mutex::new(SpinnerState::default()),
            })?;
        finish_create(Self { inner }, |widget| {
            if style.has(Style::RIGHT_TO_LEFT) {
                widget
                    .inner
                    .core
                    .apply(NativeCommand::SetDirection(direction_of(style)))?;
            }
            Ok(())
        })
    }

    /// The minimum value.
    pub fn minimum(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().minimum)
    }

    /// Set the minimum. Ignored unless it is below the maximum.
    pub fn set_minimum(&self, value: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.commit(|state| {
            if value >= state.maximum {
                return;
            }
            state.minimum = value;
            state.set_selection(state.selection);
        })
    }

    /// The maximum value.
    pub fn maximum(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().maximum)
    }

    /// Set the maximum. Ignored unless it is above the minimum.
    pub fn set_maximum(&self, value: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.commit(|state| {
            if value <= state.minimum {
                return;
            }
            state.maximum = value;
            state.set_selection(state.selection);
        })
    }

    /// The current value.
    pub fn selection(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().selection)
    }

    /// Set the value, clamped to the range.
    pub fn set_selection(&self, value: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.commit(|state| state.set_selection(value))
    }

    /// The arrow step.
    pub fn increment(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().increment)
    }

    /// Set the arrow step. Values below one are ignored.
    pub fn set_increment(&self, value: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        if value < 1 {
            return Ok(());
        }
        self.inner.commit(|state| state.increment = value)
    }

    /// The page step.
    pub fn page_increment(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().page_increment)
    }

    /// Set the page step. Values below one are ignored.
    pub fn set_page_increment(&self, value: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        if value < 1 {
            return Ok(());
        }
        self.inner.commit(|state| state.page_increment = value)
    }

    /// The number of decimal places shown.
    pub fn digits(&self) -> Result<u32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().digits)
    }

    /// Set the number of decimal places, at most [`MAX_DIGITS`].
    pub fn set_digits(&self, digits: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        if digits > MAX_DIGITS {
            return Err(Error::InvalidArgument("too many digits"));
        }
        self.inner.commit(|state| {
            state.digits = digits;
            state.text = format_value(state.selection, digits);
        })
    }

    /// Set every value at once.
    ///
    /// Nothing changes unless `minimum < maximum`, both increments are at
    /// least one and `digits` is at most [`MAX_DIGITS`]. The selection is
    /// clamped to the new range.
    pub fn set_values(
        &self,
        selection: i32,
        minimum: i32,
        maximum: i32,
        digits: u32,
        increment: i32,
        page_increment: i32,
    ) -> Result<()> {
        self.inner.core.check_widget()?;
        if maximum <= minimum || digits > MAX_DIGITS || increment < 1 || page_increment < 1 {
            return Ok(());
        }
        self.inner.commit(|state| {
            state.minimum = minimum;
            state.maximum = maximum;
            state.digits = digits;
            state.increment = increment;
            state.page_increment = page_increment;
            state.set_selection(selection);
        })
    }

    /// The text shown in the entry.
    pub fn text(&self) -> Result<String> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text.clone())
    }

    /// The maximum number of characters the entry accepts.
    pub fn text_limit(&self) -> Result<usize> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text_limit)
    }

    /// Set the text limit, truncating the current text. Zero is rejected.
    pub fn set_text_limit(&self, limit: usize) -> Result<()> {
        self.inner.core.check_widget()?;
        if limit == 0 {
            return Err(Error::CannotBeZero);
        }
        self.inner.commit(|state| {
            state.text_limit = limit;
            if char_len(&state.text) > limit {
                state.text = truncate_chars(&state.text, limit);
                if let Some(value) = parse_value(&state.text, state.digits) {
                    state.selection = value.clamp(state.minimum, state.maximum);
                }
            }
        })
    }
}

impl SpinnerInner {
    /// Apply `update`, push what changed to the native side, and send
    /// `Modify` if the text changed.
    fn commit(&self, update: impl FnOnce(&mut SpinnerState)) -> Result<()> {
        let (before, after) = {
            let mut state = self.state.lock();
            let before = state.clone();
            update(&mut state);
            (before, state.clone())
        };
        if (before.minimum, before.maximum) != (after.minimum, after.maximum) {
            self.core.apply(NativeCommand::SetRange {
                min: after.minimum,
                max: after.maximum,
            })?;
        }
        if (before.increment, before.page_increment) != (after.increment, after.page_increment) {
            self.core.apply(NativeCommand::SetIncrements {
                step: after.increment,
                page: after.page_increment,
            })?;
        }
        if before.digits != after.digits {
            self.core.apply(NativeCommand::SetDigits(after.digits))?;
        }
        if before.text_limit != after.text_limit {
            self.core
                .apply(NativeCommand::SetTextLimit(after.text_limit))?;
        }
        if before.selection != after.selection {
            self.core.apply(NativeCommand::SetValue(after.selection))?;
        }
        if before.text != after.text {
            self.core.send_event(Event::new(EventType::Modify))?;
        }
        Ok(())
    }

    fn on_value_changed(&self, value: i32) -> Result<()> {
        let (changed, selection) = {
            let mut state = self.state.lock();
            let before = state.text.clone();
            state.set_selection(value);
            (before != state.text, state.selection)
        };
        if changed {
            self.core.send_event(Event::new(EventType::Modify))?;
        }
        self.core
            .post_event(Event::new(EventType::Selection).with_index(selection))
    }

    fn on_changed(&self, text: &str) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.text == text {
                return Ok(());
            }
            state.text = text.to_string();
            if let Some(value) = parse_value(text, state.digits) {
                state.selection = value.clamp(state.minimum, state.maximum);
            }
        }
        self.core.send_event(Event::new(EventType::Modify))?;
        Ok(())
    }

    fn on_edit(&self, inserted: &str, start: usize, end: usize) -> Result<()> {
        if inserted.is_empty() && start == end {
            return Ok(());
        }
        let Some(accepted) = verify_text(&self.core, inserted, start, end)? else {
            return Ok(());
        };
        let (text, value) = {
            let mut state = self.state.lock();
            let len = char_len(&state.text);
            let start = start.min(len);
            let end = end.clamp(start, len);
            let room = state.text_limit.saturating_sub(len - (end - start));
            state.text = splice_chars(&state.text, start, end, &truncate_chars(&accepted, room));
            let before = state.selection;
            if let Some(value) = parse_value(&state.text, state.digits) {
                state.selection = value.clamp(state.minimum, state.maximum);
            }
            let value = (state.selection != before).then_some(state.selection);
            (state.text.clone(), value)
        };
        self.core.apply(NativeCommand::SetText(text))?;
        if let Some(value) = value {
            self.core.apply(NativeCommand::SetValue(value))?;
        }
        self.core.send_event(Event::new(EventType::Modify))?;
        Ok(())
    }
}

impl NativeWidget for SpinnerInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::SpinButton => SPINNER_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::ValueChanged { value } => self.on_value_changed(*value),
            NativeSignal::Changed { text, .. } => self.on_changed(text),
            NativeSignal::Insert { text, position } => self.on_edit(text, *position, *position),
            NativeSignal::Delete { start, end } => self.on_edit("", *start, (*end).max(*start)),
            NativeSignal::Activate => self
                .core
                .post_event(Event::new(EventType::DefaultSelection)),
            other => send_input_event(&self.core, other).map(|_| ()),
        }
    }
}

impl Widget for Spinner {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for Spinner {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Spinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spinner").field("core", &self.inner.core).finish()
    }
}

/// Format `value` with `digits` implied decimal places.
fn format_value(value: i32, digits: u32) -> String {
    if digits == 0 {
        return value.to_string();
    }
    let factor = 10_i64.pow(digits);
    let magnitude = i64::from(value).abs();
    let sign = if value < 0 { "-" } else { "" };
    format!(
        "{sign}{}.{:0width$}",
        magnitude / factor,
        magnitude % factor,
        width = digits as usize
    )
}

/// Parse entry text back into a value with `digits` implied decimal places.
fn parse_value(text: &str, digits: u32) -> Option<i32> {
    let text = text.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let width = digits as usize;
    let mut fraction: String = fraction.chars().take(width).collect();
    while fraction.len() < width {
        fraction.push('0');
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction: i64 = if fraction.is_empty() { 0 } else { fraction.parse().ok()? };
    let magnitude = whole.checked_mul(10_i64.pow(digits))?.checked_add(fraction)?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}
