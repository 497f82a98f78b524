//! Table rows.
//!
//! A [`TableItem`] has no native handle. The table addresses its row by
//! position, so every change is sent to the table's handle with the row
//! index the item currently occupies.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_bridge_core::{
    Error, NativeCommand, NativeWidget, Result, Style, Widget, WidgetBuilder, WidgetCore,
};

use super::table::TableInner;
use super::{Table, check_insert_index};

struct TableItemState {
    /// One text per column, or a single text without columns.
    texts: Vec<String>,
    checked: bool,
    grayed: bool,
}

pub(crate) struct TableItemInner {
    core: WidgetCore,
    parent: Weak<TableInner>,
    state: Mutex<TableItemState>,
}

/// A row of a [`Table`].
#[derive(Clone)]
pub struct TableItem {
    inner: Arc<TableItemInner>,
}

impl TableItem {
    /// Append a row to `parent`.
    pub fn new(parent: &Table, style: Style) -> Result<Self> {
        let count = parent.items()?.len();
        Self::create(parent, style, count)
    }

    /// Insert a row into `parent` at `index` (`0..=count`).
    pub fn new_at(parent: &Table, style: Style, index: i32) -> Result<Self> {
        let count = parent.items()?.len();
        let index = check_insert_index(index, count)?;
        Self::create(parent, style, index)
    }

    fn create(parent: &Table, style: Style, index: usize) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let cells = parent.inner().cell_count();
        let inner = WidgetBuilder::new(&display, "TableItem", style)
            .parent(parent.core())
            .build(|core| TableItemInner {
                core,
                parent: parent.downgrade(),
                state: Mutex::new(TableItemState {
                    texts: vec![String::new(); cells],
                    checked: false,
                    grayed: false,
                }),
            })?;
        let item = Self { inner };
        parent.inner().insert_item(index, item.clone())?;
        Ok(item)
    }

    /// The table containing this row.
    pub fn parent(&self) -> Result<Table> {
        self.inner.core.check_widget()?;
        self.inner
            .parent
            .upgrade()
            .map(Table::from_inner)
            .ok_or(Error::WidgetDisposed)
    }

    /// The text of the first column.
    pub fn text(&self) -> Result<String> {
        self.text_at(0)
    }

    /// The text of `column`. Empty for a column that does not exist.
    pub fn text_at(&self, column: i32) -> Result<String> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        Ok(usize::try_from(column)
            .ok()
            .and_then(|column| state.texts.get(column))
            .cloned()
            .unwrap_or_default())
    }

    /// Set the text of the first column.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.set_text_at(0, text)
    }

    /// Set the text of `column`. Ignored for a column that does not exist.
    pub fn set_text_at(&self, column: i32, text: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        let Ok(column) = usize::try_from(column) else {
            return Ok(());
        };
        let text = text.into();
        {
            let mut state = self.inner.state.lock();
            let Some(cell) = state.texts.get_mut(column) else {
                return Ok(());
            };
            if *cell == text {
                return Ok(());
            }
            cell.clone_from(&text);
        }
        self.inner.apply_to_row(|row| NativeCommand::SetCellText { row, column, text })
    }

    /// Set the texts of the leading columns, in order.
    pub fn set_texts<S: AsRef<str>>(&self, texts: &[S]) -> Result<()> {
        self.inner.core.check_widget()?;
        for (column, text) in texts.iter().enumerate() {
            let Ok(column) = i32::try_from(column) else {
                break;
            };
            self.set_text_at(column, text.as_ref())?;
        }
        Ok(())
    }

    /// Whether the row's check box is checked. Always `false` unless the
    /// table has the `CHECK` style.
    pub fn checked(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        if !self.inner.parent_is_check() {
            return Ok(false);
        }
        Ok(self.inner.state.lock().checked)
    }

    /// Check or uncheck the row. Ignored unless the table has the `CHECK`
    /// style.
    pub fn set_checked(&self, checked: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        if !self.inner.parent_is_check() {
            return Ok(());
        }
        self.inner.state.lock().checked = checked;
        self.inner
            .apply_to_row(|row| NativeCommand::SetRowChecked { row, checked })
    }

    /// Whether the row's check box is grayed. Always `false` unless the
    /// table has the `CHECK` style.
    pub fn grayed(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        if !self.inner.parent_is_check() {
            return Ok(false);
        }
        Ok(self.inner.state.lock().grayed)
    }

    /// Gray or ungray the row's check box. Ignored unless the table has the
    /// `CHECK` style.
    pub fn set_grayed(&self, grayed: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        if !self.inner.parent_is_check() {
            return Ok(());
        }
        self.inner.state.lock().grayed = grayed;
        self.inner
            .apply_to_row(|row| NativeCommand::SetRowGrayed { row, grayed })
    }

    pub(crate) fn store_checked(&self, checked: bool) {
        self.inner.state.lock().checked = checked;
    }

    /// Empty every cell and clear the check state. The native row is reset
    /// by the table.
    pub(crate) fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.texts.iter_mut().for_each(String::clear);
        state.checked = false;
        state.grayed = false;
    }

    /// Add an empty cell before `column`.
    pub(crate) fn insert_cell(&self, column: usize) {
        let mut state = self.inner.state.lock();
        let column = column.min(state.texts.len());
        state.texts.insert(column, String::new());
    }

    /// Drop the cell at `column`.
    pub(crate) fn remove_cell(&self, column: usize) {
        let mut state = self.inner.state.lock();
        if column < state.texts.len() && state.texts.len() > 1 {
            state.texts.remove(column);
        }
    }

    /// Keep only the first `count` cells.
    pub(crate) fn truncate_cells(&self, count: usize) {
        self.inner.state.lock().texts.truncate(count.max(1));
    }
}

impl TableItemInner {
    fn parent_is_check(&self) -> bool {
        self.parent
            .upgrade()
            .is_some_and(|table| table.is_check())
    }

    /// Send a row command to the table for the row this item occupies.
    fn apply_to_row(&self, command: impl FnOnce(usize) -> NativeCommand) -> Result<()> {
        let Some(table) = self.parent.upgrade() else {
            return Ok(());
        };
        match table.row_of(self.core.id()) {
            Some(row) => table.core().apply(command(row)),
            None => Ok(()),
        }
    }
}

impl NativeWidget for TableItemInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn release_widget(&self) {
        if let Some(table) = self.parent.upgrade() {
            table.remove_item(self.core.id());
        }
    }
}

impl Widget for TableItem {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for TableItem {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for TableItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableItem")
            .field("core", &self.inner.core)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::{Shell, TableColumn};
    use horizon_bridge_core::{
        Display, DisplayRegistry, Disposable, HeadlessController, HeadlessToolkit,
        NativeHandleOwner,
    };

    fn setup(style: Style) -> (DisplayRegistry, Display, HeadlessController, Table) {
        let registry = DisplayRegistry::new();
        let toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let display = Display::builder(&registry).toolkit(toolkit).build().unwrap();
        let table = Table::new(&shell_of(&display), style).unwrap();
        (registry, display, controller, table)
    }

    fn shell_of(display: &Display) -> Shell {
        Shell::new(display, Style::NONE).unwrap()
    }

    #[test]
    fn test_insert_at_shifts_rows() {
        let (_registry, display, controller, table) = setup(Style::MULTI);
        let handle = table.handle().unwrap().unwrap();
        let first = TableItem::new(&table, Style::NONE).unwrap();
        let last = TableItem::new(&table, Style::NONE).unwrap();
        table.select(1).unwrap();

        let middle = TableItem::new_at(&table, Style::NONE, 1).unwrap();
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::InsertRow(1))
        );
        assert_eq!(table.items().unwrap(), vec![first, middle, last.clone()]);
        assert_eq!(table.selection().unwrap(), vec![last]);
        assert!(matches!(
            TableItem::new_at(&table, Style::NONE, 4),
            Err(Error::InvalidRange { index: 4, len: 3 })
        ));
        display.dispose().unwrap();
    }

    #[test]
    fn test_texts_follow_the_row() {
        let (_registry, display, controller, table) = setup(Style::NONE);
        let handle = table.handle().unwrap().unwrap();
        TableItem::new(&table, Style::NONE).unwrap();
        let item = TableItem::new(&table, Style::NONE).unwrap();

        item.set_text("beta").unwrap();
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetCellText {
                row: 1,
                column: 0,
                text: "beta".into(),
            })
        );
        table.remove(0).unwrap();
        item.set_text("gamma").unwrap();
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetCellText {
                row: 0,
                column: 0,
                text: "gamma".into(),
            })
        );
        assert_eq!(item.text().unwrap(), "gamma");
        assert_eq!(item.text_at(3).unwrap(), "");
        item.set_text_at(3, "ignored").unwrap();
        assert_eq!(item.text_at(3).unwrap(), "");
        display.dispose().unwrap();
    }

    #[test]
    fn test_column_cells() {
        let (_registry, display, _controller, table) = setup(Style::NONE);
        TableColumn::new(&table, Style::NONE).unwrap();
        let second = TableColumn::new(&table, Style::NONE).unwrap();
        let item = TableItem::new(&table, Style::NONE).unwrap();
        item.set_texts(&["name", "size", "extra"]).unwrap();
        assert_eq!(item.text_at(1).unwrap(), "size");
        assert_eq!(item.text_at(2).unwrap(), "");

        TableColumn::new_at(&table, Style::NONE, 1).unwrap();
        assert_eq!(item.text_at(1).unwrap(), "");
        assert_eq!(item.text_at(2).unwrap(), "size");

        second.dispose().unwrap();
        assert_eq!(item.text_at(0).unwrap(), "name");
        assert_eq!(item.text_at(1).unwrap(), "");
        assert_eq!(item.text_at(2).unwrap(), "");
        display.dispose().unwrap();
    }

    #[test]
    fn test_check_requires_check_style() {
        let (_registry, display, controller, table) = setup(Style::CHECK);
        let handle = table.handle().unwrap().unwrap();
        let item = TableItem::new(&table, Style::NONE).unwrap();
        item.set_checked(true).unwrap();
        item.set_grayed(true).unwrap();
        assert!(item.checked().unwrap());
        assert!(item.grayed().unwrap());
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetRowGrayed {
                row: 0,
                grayed: true,
            })
        );

        let plain = Table::new(&shell_of(&display), Style::NONE).unwrap();
        let other = TableItem::new(&plain, Style::NONE).unwrap();
        other.set_checked(true).unwrap();
        assert!(!other.checked().unwrap());
        display.dispose().unwrap();
    }

    #[test]
    fn test_disposed_item_rejects_calls() {
        let (_registry, display, _controller, table) = setup(Style::NONE);
        let item = TableItem::new(&table, Style::NONE).unwrap();
        assert_eq!(item.parent().unwrap(), table);
        item.dispose().unwrap();
        item.dispose().unwrap();
        assert!(matches!(item.text(), Err(Error::WidgetDisposed)));
        assert!(matches!(item.set_checked(true), Err(Error::WidgetDisposed)));
        assert_eq!(table.item_count().unwrap(), 0);
        display.dispose().unwrap();
    }
}
