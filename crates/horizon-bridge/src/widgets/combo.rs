//! Combo widget for drop-down selection.
//!
//! A [`Combo`] pairs a list of string items with a text field:
//!
//! - `DROP_DOWN` combos show the list in a pop-up; `SIMPLE` combos keep it
//!   visible
//! - `READ_ONLY` combos only accept text that names an item
//! - Editable combos send `Verify` before user edits and `Modify` after
//!   every text change
//! - [`Combo::cut`], [`Combo::copy`] and [`Combo::paste`] move text between
//!   the text selection and the display clipboard; pasting and cutting are
//!   verified like typed edits
//!
//! Native handles: the combo itself, the entry (editable only), the pop-up
//! list, and the arrow button (`DROP_DOWN` only).
//!
//! # Example
//!
//! ```ignore
//! let combo = Combo::new(&shell, Style::DROP_DOWN | Style::READ_ONLY)?;
//! combo.set_items(["Small", "Medium", "Large"])?;
//! combo.select(1)?;
//! assert_eq!(combo.text()?, "Medium");
//!
//! combo.on(EventType::Selection, |event| println!("picked {}", event.index))?;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_bridge_core::{
    Error, Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal, NativeWidget,
    Result, SignalKind, Style, Widget, WidgetBuilder, WidgetCore,
};

use super::{
    TEXT_LIMIT, char_len, check_index, check_insert_index, check_orientation, check_range,
    direction_of, finish_create, orientation_of, send_input_event, splice_chars, to_count, to_index,
    truncate_chars, verify_text,
};

const COMBO_SIGNALS: &[SignalKind] = &[SignalKind::Changed];
const READ_ONLY_SIGNALS: &[SignalKind] = &[
    SignalKind::Changed,
    SignalKind::Activate,
    SignalKind::KeyPress,
    SignalKind::FocusIn,
    SignalKind::FocusOut,
];
const ENTRY_SIGNALS: &[SignalKind] = &[
    SignalKind::Changed,
    SignalKind::Insert,
    SignalKind::Delete,
    SignalKind::Activate,
    SignalKind::PreeditChanged,
    SignalKind::KeyPress,
    SignalKind::FocusIn,
    SignalKind::FocusOut,
];

#[derive(Debug, Clone, PartialEq)]
struct ComboState {
    items: Vec<String>,
    selection: i32,
    text: String,
    text_limit: usize,
    text_selection: (usize, usize),
    orientation: Style,
}

impl ComboState {
    fn index_of(&self, text: &str) -> i32 {
        to_index(self.items.iter().position(|item| item == text))
    }

    fn selected_item(&self) -> Option<&String> {
        usize::try_from(self.selection)
            .ok()
            .and_then(|index| self.items.get(index))
    }
}

struct ComboInner {
    core: WidgetCore,
    state: Mutex<ComboState>,
}

/// A drop-down or simple list with a text field.
#[derive(Clone)]
pub struct Combo {
    inner: Arc<ComboInner>,
}

impl Combo {
    /// Create a combo inside `parent`.
    ///
    /// Keeps one of `DROP_DOWN` (default) and `SIMPLE`. `READ_ONLY` is
    /// dropped for `SIMPLE` combos.
    pub fn new(parent: &impl Widget, style: Style) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let mut style = check_orientation(style.check_bits(&[Style::DROP_DOWN, Style::SIMPLE]));
        if style.has(Style::SIMPLE) {
            style = style & !Style::READ_ONLY;
        }

        let mut builder = WidgetBuilder::new(&display, "Combo", style)
            .parent(parent.core())
            .handle(HandleClass::Combo);
        if !style.has(Style::READ_ONLY) {
            builder = builder.handle(HandleClass::Entry);
        }
        builder = builder.handle(HandleClass::PopupList);
        if style.has(Style::DROP_DOWN) {
            builder = builder.handle(HandleClass::Button);
        }

        let inner = builder.build(|core| ComboInner {
            core,
            state: Mutex::new(ComboState {
                items: Vec::new(),
                selection: -1,
                text: String::new(),
                text_limit: TEXT_LIMIT,
                text_selection: (0, 0),
                orientation: orientation_of(style),
            }),
        })?;
        finish_create(Self { inner }, |combo| {
            if style.has(Style::RIGHT_TO_LEFT) {
                combo.inner.apply_direction(style)?;
            }
            Ok(())
        })
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Append an item.
    pub fn add(&self, item: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        let item = item.into();
        self.inner.commit(|state| state.items.push(item))
    }

    /// Insert an item at `index` (`0..=count`).
    pub fn add_at(&self, item: impl Into<String>, index: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        let item = item.into();
        let len = self.inner.state.lock().items.len();
        let position = check_insert_index(index, len)?;
        self.inner.commit(|state| {
            state.items.insert(position, item);
            if state.selection >= index {
                state.selection += 1;
            }
        })
    }

    /// Remove the item at `index`.
    pub fn remove(&self, index: i32) -> Result<()> {
        self.remove_range(index, index)
    }

    /// Remove the items `start..=end`.
    pub fn remove_range(&self, start: i32, end: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        let len = self.inner.state.lock().items.len();
        let (first, last) = check_range(start, end, len)?;
        let read_only = self.inner.is_read_only();
        self.inner.commit(|state| {
            state.items.drain(first..=last);
            if (start..=end).contains(&state.selection) {
                state.selection = -1;
                if read_only {
                    state.text.clear();
                }
            } else if state.selection > end {
                state.selection -= end - start + 1;
            }
        })
    }

    /// Remove the first item equal to `item`.
    pub fn remove_item(&self, item: &str) -> Result<()> {
        self.inner.core.check_widget()?;
        let index = self.inner.state.lock().index_of(item);
        if index == -1 {
            return Err(Error::InvalidArgument("item not found"));
        }
        self.remove(index)
    }

    /// Remove every item and clear the text.
    pub fn remove_all(&self) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.commit(|state| {
            state.items.clear();
            state.selection = -1;
            state.text.clear();
        })
    }

    /// The item at `index`.
    pub fn item(&self, index: i32) -> Result<String> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        let index = check_index(index, state.items.len())?;
        Ok(state.items[index].clone())
    }

    /// Every item, in order.
    pub fn items(&self) -> Result<Vec<String>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().items.clone())
    }

    /// The number of items.
    pub fn item_count(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(to_count(self.inner.state.lock().items.len()))
    }

    /// Replace the item at `index`.
    pub fn set_item(&self, index: i32, item: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        let item = item.into();
        let len = self.inner.state.lock().items.len();
        let position =
            check_index(index, len).map_err(|_| Error::InvalidArgument("index out of range"))?;
        self.inner.commit(|state| {
            if state.selection == index {
                state.text = item.clone();
            }
            state.items[position] = item;
        })
    }

    /// Replace every item. Clears the selection and the text.
    pub fn set_items<I, S>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.core.check_widget()?;
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        self.inner.commit(|state| {
            state.items = items;
            state.selection = -1;
            state.text.clear();
        })
    }

    /// The index of the first item equal to `item`, or `-1`.
    pub fn index_of(&self, item: &str) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().index_of(item))
    }

    /// The index of the first item equal to `item` at or after `start`, or
    /// `-1`. A `start` outside the list returns `-1`.
    pub fn index_of_from(&self, item: &str, start: i32) -> Result<i32> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        let Ok(start) = check_index(start, state.items.len()) else {
            return Ok(-1);
        };
        Ok(to_index(
            state.items[start..]
                .iter()
                .position(|candidate| candidate == item)
                .map(|offset| start + offset),
        ))
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select the item at `index` and show its text. Out-of-range indices are
    /// ignored.
    pub fn select(&self, index: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        let len = self.inner.state.lock().items.len();
        let Ok(position) = check_index(index, len) else {
            return Ok(());
        };
        self.inner.commit(|state| {
            state.selection = index;
            state.text = state.items[position].clone();
        })
    }

    /// Deselect the item at `index` if it is selected, clearing the text.
    pub fn deselect(&self, index: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        if self.inner.state.lock().selection != index {
            return Ok(());
        }
        self.deselect_all()
    }

    /// Clear the selection and the text.
    pub fn deselect_all(&self) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.commit(|state| {
            state.selection = -1;
            state.text.clear();
        })
    }

    /// The selected index, or `-1`.
    pub fn selection_index(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().selection)
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// The text field contents.
    pub fn text(&self) -> Result<String> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text.clone())
    }

    /// Replace the text.
    ///
    /// A `READ_ONLY` combo selects the matching item instead and ignores text
    /// that names no item. Editable combos truncate to the text limit.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        let text = text.into();
        if self.inner.is_read_only() {
            let index = self.inner.state.lock().index_of(&text);
            if index == -1 {
                return Ok(());
            }
            return self.select(index);
        }
        self.inner.commit(|state| {
            state.text = truncate_chars(&text, state.text_limit);
            state.selection = state.index_of(&state.text);
        })
    }

    /// The maximum number of characters the text field accepts.
    pub fn text_limit(&self) -> Result<usize> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text_limit)
    }

    /// Set the text limit. Zero is rejected.
    pub fn set_text_limit(&self, limit: usize) -> Result<()> {
        self.inner.core.check_widget()?;
        if limit == 0 {
            return Err(Error::CannotBeZero);
        }
        if self.inner.is_read_only() {
            return Ok(());
        }
        self.inner.commit(|state| {
            state.text_limit = limit;
            state.text = truncate_chars(&state.text, limit);
        })
    }

    /// The selected character range of the text field.
    pub fn selection(&self) -> Result<(usize, usize)> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text_selection)
    }

    /// Select the characters `start..end` of the text field, clamped to the
    /// text. Ignored for `READ_ONLY` combos.
    pub fn set_selection(&self, start: usize, end: usize) -> Result<()> {
        self.inner.core.check_widget()?;
        if self.inner.is_read_only() {
            return Ok(());
        }
        self.inner.commit(|state| {
            let len = char_len(&state.text);
            let start = start.min(len);
            state.text_selection = (start, end.clamp(start, len));
        })
    }

    /// Copy the selected text to the clipboard.
    ///
    /// Does nothing without a text selection or for `READ_ONLY` combos.
    pub fn copy(&self) -> Result<()> {
        let display = self.inner.core.check_widget()?;
        if self.inner.is_read_only() {
            return Ok(());
        }
        match self.inner.selected_text() {
            Some(text) => display.set_clipboard_text(text),
            None => Ok(()),
        }
    }

    /// Move the selected text to the clipboard.
    ///
    /// Does nothing without a text selection or for `READ_ONLY` combos.
    pub fn cut(&self) -> Result<()> {
        let display = self.inner.core.check_widget()?;
        if self.inner.is_read_only() {
            return Ok(());
        }
        let Some(text) = self.inner.selected_text() else {
            return Ok(());
        };
        display.set_clipboard_text(text)?;
        let (start, end) = self.inner.state.lock().text_selection;
        self.inner.edit("", start, end)
    }

    /// Replace the text selection with the clipboard contents.
    ///
    /// Ignored for `READ_ONLY` combos and when the clipboard holds no text.
    pub fn paste(&self) -> Result<()> {
        let display = self.inner.core.check_widget()?;
        if self.inner.is_read_only() {
            return Ok(());
        }
        let Some(text) = display.clipboard_text()? else {
            return Ok(());
        };
        let (start, end) = self.inner.state.lock().text_selection;
        self.inner.edit(&text, start, end)
    }

    /// Collapse the text selection to the caret.
    pub fn clear_selection(&self) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.commit(|state| {
            let caret = state.text_selection.1;
            state.text_selection = (caret, caret);
        })
    }

    // =========================================================================
    // Orientation
    // =========================================================================

    /// The orientation, `LEFT_TO_RIGHT` or `RIGHT_TO_LEFT`.
    pub fn orientation(&self) -> Result<Style> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().orientation)
    }

    /// Mirror the combo. Values other than the two orientations are ignored.
    pub fn set_orientation(&self, orientation: Style) -> Result<()> {
        self.inner.core.check_widget()?;
        if orientation != Style::LEFT_TO_RIGHT && orientation != Style::RIGHT_TO_LEFT {
            return Ok(());
        }
        self.inner.state.lock().orientation = orientation;
        self.inner.apply_direction(orientation)
    }
}

impl ComboInner {
    fn is_read_only(&self) -> bool {
        self.core.style().has(Style::READ_ONLY)
    }

    /// The selected characters of the text field, if any.
    fn selected_text(&self) -> Option<String> {
        let state = self.state.lock();
        let (start, end) = state.text_selection;
        (start < end).then(|| state.text.chars().skip(start).take(end - start).collect())
    }

    /// The handle that carries the text.
    fn text_handle(&self) -> Option<Handle> {
        self.core
            .handle_of(HandleClass::Entry)
            .or_else(|| self.core.handle())
    }

    fn apply_direction(&self, orientation: Style) -> Result<()> {
        let direction = direction_of(orientation);
        for handle in self.core.handles() {
            self.core
                .apply_to(handle, NativeCommand::SetDirection(direction))?;
        }
        Ok(())
    }

    /// Apply `update`, push what changed to the native side, and send
    /// `Modify` if the text changed.
    fn commit(&self, update: impl FnOnce(&mut ComboState)) -> Result<()> {
        let (before, after) = {
            let mut state = self.state.lock();
            let before = state.clone();
            update(&mut state);
            (before, state.clone())
        };
        self.sync_native(&before, &after)?;
        if before.text != after.text {
            self.core.send_event(Event::new(EventType::Modify))?;
        }
        Ok(())
    }

    fn sync_native(&self, before: &ComboState, after: &ComboState) -> Result<()> {
        if before.items != after.items {
            self.core.apply(NativeCommand::SetItems(after.items.clone()))?;
        }
        if before.selection != after.selection || before.items != after.items {
            let selected = usize::try_from(after.selection).ok();
            self.core.apply(NativeCommand::SetSelectedIndex(selected))?;
        }
        let Some(text_handle) = self.text_handle() else {
            return Ok(());
        };
        if before.text_limit != after.text_limit {
            self.core
                .apply_to(text_handle, NativeCommand::SetTextLimit(after.text_limit))?;
        }
        if before.text != after.text {
            self.core
                .apply_to(text_handle, NativeCommand::SetText(after.text.clone()))?;
        }
        if before.text_selection != after.text_selection {
            let (start, end) = after.text_selection;
            self.core
                .apply_to(text_handle, NativeCommand::SetTextSelection { start, end })?;
        }
        Ok(())
    }

    fn on_changed(&self, text: &str, selected: Option<usize>) -> Result<()> {
        let (before, after) = {
            let mut state = self.state.lock();
            let before = state.clone();
            state.text = text.to_string();
            state.selection = match selected {
                Some(index) if index < state.items.len() => to_index(Some(index)),
                _ => state.index_of(text),
            };
            (before, state.clone())
        };
        if before.text != after.text {
            self.core.send_event(Event::new(EventType::Modify))?;
        }
        if after.selection != before.selection && after.selection != -1 {
            let item = after.selected_item().cloned().unwrap_or_default();
            self.core.post_event(
                Event::new(EventType::Selection)
                    .with_index(after.selection)
                    .with_text(item),
            )?;
        }
        Ok(())
    }

    /// Replace the characters `start..end` with `inserted` after `Verify`.
    fn edit(&self, inserted: &str, start: usize, end: usize) -> Result<()> {
        let Some(accepted) = verify_text(&self.core, inserted, start, end)? else {
            return Ok(());
        };
        self.commit(|state| {
            let len = char_len(&state.text);
            let start = start.min(len);
            let end = end.clamp(start, len);
            let room = state.text_limit.saturating_sub(len - (end - start));
            let accepted = truncate_chars(&accepted, room);
            let caret = start + char_len(&accepted);
            state.text = splice_chars(&state.text, start, end, &accepted);
            state.selection = state.index_of(&state.text);
            state.text_selection = (caret, caret);
        })
    }
}

impl NativeWidget for ComboInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::Combo if self.is_read_only() => READ_ONLY_SIGNALS,
            HandleClass::Combo => COMBO_SIGNALS,
            HandleClass::Entry => ENTRY_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::Changed { text, selected } => self.on_changed(text, *selected),
            NativeSignal::Insert { text, position } => self.edit(text, *position, *position),
            NativeSignal::Delete { start, end } => self.edit("", *start, (*end).max(*start)),
            NativeSignal::Activate => {
                self.core.send_event(Event::new(EventType::DefaultSelection))?;
                Ok(())
            }
            NativeSignal::PreeditChanged { text, cursor } => {
                let mut event = Event::new(EventType::ImeComposition).with_text(text.clone());
                event.index = to_index(Some(*cursor));
                self.core.send_event(event)?;
                Ok(())
            }
            other => send_input_event(&self.core, other).map(|_| ()),
        }
    }
}

impl Widget for Combo {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for Combo {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Combo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Combo").field("core", &self.inner.core).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Shell;
    use horizon_bridge_core::{
        Display, DisplayRegistry, EventSource, HeadlessController, HeadlessToolkit, Listener,
        NativeHandleOwner,
    };

    fn setup() -> (DisplayRegistry, Display, HeadlessController, Shell) {
        let registry = DisplayRegistry::new();
        let toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let display = Display::builder(&registry).toolkit(toolkit).build().unwrap();
        let shell = Shell::new(&display, Style::NONE).unwrap();
        (registry, display, controller, shell)
    }

    fn pump(display: &Display) {
        while display.read_and_dispatch().unwrap() {}
    }

    fn count_events(combo: &Combo, event_type: EventType) -> Arc<Mutex<Vec<Event>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        combo
            .on(event_type, move |event| sink.lock().push(event.clone()))
            .unwrap();
        log
    }

    #[test]
    fn test_handles_follow_style() {
        let (_registry, display, controller, shell) = setup();
        let drop_down = Combo::new(&shell, Style::NONE).unwrap();
        let handles = drop_down.handles().unwrap();
        assert_eq!(handles.len(), 4);
        assert_eq!(controller.class_of(handles[1]), Some(HandleClass::Entry));
        assert!(drop_down.style().unwrap().has(Style::DROP_DOWN));

        let read_only = Combo::new(&shell, Style::READ_ONLY).unwrap();
        let handles = read_only.handles().unwrap();
        assert_eq!(handles.len(), 3);
        assert!(handles
            .iter()
            .all(|h| controller.class_of(*h) != Some(HandleClass::Entry)));

        let simple = Combo::new(&shell, Style::SIMPLE | Style::READ_ONLY).unwrap();
        assert!(!simple.style().unwrap().has(Style::READ_ONLY));
        assert_eq!(simple.handles().unwrap().len(), 3);
        display.dispose().unwrap();
    }

    #[test]
    fn test_items_and_bounds() {
        let (_registry, display, _controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        combo.add("a").unwrap();
        combo.add("c").unwrap();
        combo.add_at("b", 1).unwrap();
        assert_eq!(combo.items().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(combo.item_count().unwrap(), 3);
        assert_eq!(combo.item(2).unwrap(), "c");
        assert!(matches!(combo.item(3), Err(Error::InvalidRange { .. })));
        assert!(matches!(combo.item(-1), Err(Error::InvalidRange { .. })));
        assert!(combo.add_at("x", 5).is_err());

        combo.add("b").unwrap();
        assert_eq!(combo.index_of("b").unwrap(), 1);
        assert_eq!(combo.index_of_from("b", 2).unwrap(), 3);
        assert_eq!(combo.index_of_from("b", 9).unwrap(), -1);
        assert_eq!(combo.index_of("z").unwrap(), -1);

        combo.remove_range(1, 2).unwrap();
        assert_eq!(combo.items().unwrap(), vec!["a", "b"]);
        combo.remove_item("a").unwrap();
        assert!(matches!(
            combo.remove_item("a"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            combo.set_item(4, "q"),
            Err(Error::InvalidArgument(_))
        ));
        display.dispose().unwrap();
    }

    #[test]
    fn test_selection_round_trip() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::READ_ONLY).unwrap();
        let main = combo.handle().unwrap().unwrap();
        combo.set_items(["a", "b", "c"]).unwrap();

        combo.select(1).unwrap();
        assert_eq!(combo.selection_index().unwrap(), 1);
        assert_eq!(combo.text().unwrap(), "b");
        assert!(controller
            .commands(main)
            .contains(&NativeCommand::SetSelectedIndex(Some(1))));

        combo.select(7).unwrap();
        assert_eq!(combo.selection_index().unwrap(), 1);

        combo.deselect(0).unwrap();
        assert_eq!(combo.selection_index().unwrap(), 1);
        combo.deselect_all().unwrap();
        assert_eq!(combo.selection_index().unwrap(), -1);
        assert_eq!(combo.text().unwrap(), "");
        display.dispose().unwrap();
    }

    #[test]
    fn test_selection_tracks_structural_changes() {
        let (_registry, display, _controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        combo.set_items(["a", "b", "c"]).unwrap();
        combo.select(1).unwrap();

        combo.add_at("first", 0).unwrap();
        assert_eq!(combo.selection_index().unwrap(), 2);
        combo.remove(0).unwrap();
        assert_eq!(combo.selection_index().unwrap(), 1);
        combo.set_item(1, "B").unwrap();
        assert_eq!(combo.text().unwrap(), "B");

        combo.remove(1).unwrap();
        assert_eq!(combo.selection_index().unwrap(), -1);
        assert_eq!(combo.text().unwrap(), "B");
        display.dispose().unwrap();
    }

    #[test]
    fn test_read_only_set_text() {
        let (_registry, display, _controller, shell) = setup();
        let combo = Combo::new(&shell, Style::READ_ONLY).unwrap();
        combo.set_items(["red", "green"]).unwrap();

        combo.set_text("blue").unwrap();
        assert_eq!(combo.text().unwrap(), "");
        combo.set_text("green").unwrap();
        assert_eq!(combo.text().unwrap(), "green");
        assert_eq!(combo.selection_index().unwrap(), 1);
        display.dispose().unwrap();
    }

    #[test]
    fn test_set_text_sends_modify_and_truncates() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        let entry = combo.handles().unwrap()[1];
        let modified = count_events(&combo, EventType::Modify);

        assert!(matches!(combo.set_text_limit(0), Err(Error::CannotBeZero)));
        combo.set_text_limit(3).unwrap();
        combo.set_text("abcdef").unwrap();
        assert_eq!(combo.text().unwrap(), "abc");
        assert_eq!(
            controller.last_command(entry),
            Some(NativeCommand::SetText("abc".into()))
        );
        combo.set_text("abc").unwrap();
        assert_eq!(modified.lock().len(), 1);
        display.dispose().unwrap();
    }

    #[test]
    fn test_text_selection() {
        let (_registry, display, _controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        combo.set_text("hello").unwrap();
        combo.set_selection(1, 40).unwrap();
        assert_eq!(combo.selection().unwrap(), (1, 5));
        combo.clear_selection().unwrap();
        assert_eq!(combo.selection().unwrap(), (5, 5));
        display.dispose().unwrap();
    }

    #[test]
    fn test_native_change_posts_selection() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        let main = combo.handle().unwrap().unwrap();
        combo.set_items(["a", "b"]).unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        for event_type in [EventType::Modify, EventType::Selection] {
            let order = order.clone();
            combo
                .on(event_type, move |event| order.lock().push((event.event_type, event.index)))
                .unwrap();
        }

        controller.emit(
            main,
            NativeSignal::Changed {
                text: "b".into(),
                selected: Some(1),
            },
        );
        pump(&display);
        assert_eq!(
            *order.lock(),
            vec![(EventType::Modify, -1), (EventType::Selection, 1)]
        );
        assert_eq!(combo.selection_index().unwrap(), 1);
        assert_eq!(combo.text().unwrap(), "b");
        display.dispose().unwrap();
    }

    #[test]
    fn test_verify_can_deny_or_rewrite() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        let entry = combo.handles().unwrap()[1];
        combo
            .on(EventType::Verify, |event| {
                if event.text.chars().any(|c| c.is_ascii_digit()) {
                    event.doit = false;
                } else {
                    event.text = event.text.to_uppercase();
                }
            })
            .unwrap();

        controller.emit(
            entry,
            NativeSignal::Insert {
                text: "ab".into(),
                position: 0,
            },
        );
        controller.emit(
            entry,
            NativeSignal::Insert {
                text: "1".into(),
                position: 2,
            },
        );
        pump(&display);
        assert_eq!(combo.text().unwrap(), "AB");

        controller.emit(entry, NativeSignal::Delete { start: 0, end: 1 });
        pump(&display);
        assert_eq!(combo.text().unwrap(), "B");
        display.dispose().unwrap();
    }

    #[test]
    fn test_filter_denies_verify() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        let entry = combo.handles().unwrap()[1];
        display
            .add_filter(EventType::Verify, Listener::from_fn(|event| event.doit = false))
            .unwrap();

        controller.emit(
            entry,
            NativeSignal::Insert {
                text: "x".into(),
                position: 0,
            },
        );
        pump(&display);
        assert_eq!(combo.text().unwrap(), "");
        display.dispose().unwrap();
    }

    #[test]
    fn test_activate_and_ime() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        let entry = combo.handles().unwrap()[1];
        let defaults = count_events(&combo, EventType::DefaultSelection);
        let ime = count_events(&combo, EventType::ImeComposition);

        controller.emit(entry, NativeSignal::Activate);
        controller.emit(
            entry,
            NativeSignal::PreeditChanged {
                text: "かな".into(),
                cursor: 2,
            },
        );
        pump(&display);
        assert_eq!(defaults.lock().len(), 1);
        assert_eq!(ime.lock()[0].text, "かな");
        assert_eq!(ime.lock()[0].index, 2);
        display.dispose().unwrap();
    }

    #[test]
    fn test_orientation_mirrors_every_handle() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        combo.set_orientation(Style::RIGHT_TO_LEFT).unwrap();
        assert_eq!(combo.orientation().unwrap(), Style::RIGHT_TO_LEFT);
        for handle in combo.handles().unwrap() {
            assert_eq!(
                controller.last_command(handle),
                Some(NativeCommand::SetDirection(
                    horizon_bridge_core::TextDirection::RightToLeft
                ))
            );
        }
        display.dispose().unwrap();
    }

    #[test]
    fn test_clipboard_operations() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        let modified = count_events(&combo, EventType::Modify);
        combo.set_text("hello world").unwrap();

        combo.copy().unwrap();
        assert_eq!(controller.clipboard_text(), None);

        combo.set_selection(0, 5).unwrap();
        combo.copy().unwrap();
        assert_eq!(controller.clipboard_text().as_deref(), Some("hello"));
        assert_eq!(combo.text().unwrap(), "hello world");

        combo.set_selection(5, 11).unwrap();
        combo.cut().unwrap();
        assert_eq!(controller.clipboard_text().as_deref(), Some(" world"));
        assert_eq!(combo.text().unwrap(), "hello");
        assert_eq!(combo.selection().unwrap(), (5, 5));

        controller.set_clipboard_text(", there");
        combo.paste().unwrap();
        assert_eq!(combo.text().unwrap(), "hello, there");
        assert_eq!(combo.selection().unwrap(), (12, 12));
        assert_eq!(modified.lock().len(), 3);
        display.dispose().unwrap();
    }

    #[test]
    fn test_paste_is_verified_and_limited() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        combo.set_text_limit(4).unwrap();
        combo
            .on(EventType::Verify, |event| {
                event.doit = !event.text.contains('!');
            })
            .unwrap();

        controller.set_clipboard_text("oops!");
        combo.paste().unwrap();
        assert_eq!(combo.text().unwrap(), "");

        controller.set_clipboard_text("abcdef");
        combo.paste().unwrap();
        assert_eq!(combo.text().unwrap(), "abcd");

        let read_only = Combo::new(&shell, Style::READ_ONLY).unwrap();
        read_only.set_items(["abcdef"]).unwrap();
        read_only.paste().unwrap();
        read_only.cut().unwrap();
        assert_eq!(read_only.text().unwrap(), "");
        display.dispose().unwrap();
    }

    #[test]
    fn test_edit_past_end_keeps_caret_in_text() {
        let (_registry, display, controller, shell) = setup();
        let combo = Combo::new(&shell, Style::NONE).unwrap();
        let entry = combo.handles().unwrap()[1];
        controller.emit(
            entry,
            NativeSignal::Insert {
                text: "ab".into(),
                position: 10,
            },
        );
        pump(&display);
        assert_eq!(combo.text().unwrap(), "ab");
        assert_eq!(combo.selection().unwrap(), (2, 2));
        display.dispose().unwrap();
    }

    #[test]
    fn test_failed_native_setup_disposes_combo() {
        let (_registry, display, controller, shell) = setup();
        let widgets = display.widget_count().unwrap();
        let handles = controller.live_handle_count();
        controller.fail_next_apply(1);
        assert!(Combo::new(&shell, Style::RIGHT_TO_LEFT).is_err());
        assert_eq!(display.widget_count().unwrap(), widgets);
        assert_eq!(controller.live_handle_count(), handles);
        display.dispose().unwrap();
    }
}
