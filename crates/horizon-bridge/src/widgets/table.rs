//! Table widget for multi-column lists.
//!
//! A [`Table`] shows rows of [`TableItem`]s under optional
//! [`TableColumn`]s. Items have no native handle of their own: the table
//! addresses them by row. Columns own a native column handle each.
//!
//! # Selection
//!
//! - `SINGLE` tables (default) keep at most one selected row
//! - `MULTI` tables keep any set of rows
//! - `CHECK` tables show a check box per row
//!
//! Programmatic selection never fires events. User selection posts
//! `Selection` with the focused item; toggling a row check box posts
//! `Selection` with [`EventDetail::Check`].
//!
//! # Columns
//!
//! Columns keep their creation index for cell addressing. The display order
//! is separate: [`Table::set_column_order`] or a user drag rearranges it and
//! sends `Move` to every column whose display position changed.
//!
//! # Example
//!
//! ```ignore
//! let table = Table::new(&shell, Style::MULTI | Style::CHECK)?;
//! let name = TableColumn::new(&table, Style::NONE)?;
//! name.set_text("Name")?;
//!
//! for label in ["alpha", "beta", "gamma"] {
//!     TableItem::new(&table, Style::NONE)?.set_text(label)?;
//! }
//! table.select_range(0, 1)?;
//! assert_eq!(table.selection_count()?, 2);
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_bridge_core::logging::targets;
use horizon_bridge_core::{
    Error, Event, EventDetail, EventType, Handle, HandleClass, NativeCommand, NativeSignal,
    NativeWidget, Result, SignalKind, SortDirection, Style, Widget, WidgetBuilder, WidgetCore,
    WidgetId, WidgetState,
};

use super::{
    TableColumn, TableItem, check_index, check_orientation, direction_of, finish_create,
    send_input_event, to_count, to_index,
};

const TABLE_SIGNALS: &[SignalKind] = &[
    SignalKind::SelectionChanged,
    SignalKind::RowActivated,
    SignalKind::RowToggled,
    SignalKind::ColumnsReordered,
    SignalKind::KeyPress,
    SignalKind::ButtonPress,
    SignalKind::FocusIn,
    SignalKind::FocusOut,
];

#[derive(Default)]
struct TableState {
    items: Vec<TableItem>,
    columns: Vec<TableColumn>,
    /// Column indices in display order.
    column_order: Vec<usize>,
    sort_column: Option<TableColumn>,
    sort_direction: SortDirection,
    /// Selected rows, sorted and unique.
    selection: Vec<usize>,
    header_visible: bool,
    lines_visible: bool,
    top_index: usize,
}

pub(crate) struct TableInner {
    core: WidgetCore,
    state: Mutex<TableState>,
}

/// A selectable list of rows with optional columns.
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    /// Create a table inside `parent`.
    ///
    /// Keeps one of `SINGLE` (default) and `MULTI`.
    pub fn new(parent: &impl Widget, style: Style) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let style = check_orientation(style.check_bits(&[Style::SINGLE, Style::MULTI]));
        let inner = WidgetBuilder::new(&display, "Table", style)
            .parent(parent.core())
            .handle(HandleClass::TreeView)
            .build(|core| TableInner {
                core,
                state: Mutex::new(TableState::default()),
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

    // =========================================================================
    // Items
    // =========================================================================

    /// The item at `index`.
    pub fn item(&self, index: i32) -> Result<TableItem> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        let index = check_index(index, state.items.len())?;
        Ok(state.items[index].clone())
    }

    /// Every item, in row order.
    pub fn items(&self) -> Result<Vec<TableItem>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().items.clone())
    }

    /// The number of rows.
    pub fn item_count(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(to_count(self.inner.state.lock().items.len()))
    }

    /// The row of `item`, or `-1` if it belongs to another table.
    pub fn index_of(&self, item: &TableItem) -> Result<i32> {
        self.inner.core.check_widget()?;
        item.core().check_widget()?;
        Ok(to_index(self.inner.row_of(item.id())))
    }

    /// Dispose the item at `index`.
    pub fn remove(&self, index: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        let item = {
            let state = self.inner.state.lock();
            state.items[check_index(index, state.items.len())?].clone()
        };
        item.core().dispose()
    }

    /// Dispose the items `start..=end`. Does nothing if `start > end`.
    pub fn remove_range(&self, start: i32, end: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        if start > end {
            return Ok(());
        }
        let doomed = {
            let state = self.inner.state.lock();
            let first = check_index(start, state.items.len())?;
            let last = check_index(end, state.items.len())?;
            state.items[first..=last].to_vec()
        };
        self.dispose_items(doomed)
    }

    /// Dispose the items at `indices`. Duplicates are removed once; any
    /// index out of range fails the whole call before anything is removed.
    pub fn remove_indices(&self, indices: &[i32]) -> Result<()> {
        self.inner.core.check_widget()?;
        let doomed = {
            let state = self.inner.state.lock();
            let mut rows = indices
                .iter()
                .map(|index| check_index(*index, state.items.len()))
                .collect::<Result<Vec<_>>>()?;
            rows.sort_unstable();
            rows.dedup();
            rows.into_iter().map(|row| state.items[row].clone()).collect()
        };
        self.dispose_items(doomed)
    }

    /// Dispose every item.
    pub fn remove_all(&self) -> Result<()> {
        self.inner.core.check_widget()?;
        let doomed = self.inner.state.lock().items.clone();
        self.dispose_items(doomed)
    }

    fn dispose_items(&self, items: Vec<TableItem>) -> Result<()> {
        for item in items.into_iter().rev() {
            item.core().dispose()?;
        }
        Ok(())
    }

    /// Reset the row at `index` to empty texts, unchecked and not grayed.
    pub fn clear(&self, index: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        let row = check_index(index, self.inner.state.lock().items.len())?;
        self.inner.clear_rows(&[row])
    }

    /// Reset the rows `start..=end`. Does nothing if `start > end`.
    pub fn clear_range(&self, start: i32, end: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        if start > end {
            return Ok(());
        }
        let rows: Vec<usize> = {
            let len = self.inner.state.lock().items.len();
            let first = check_index(start, len)?;
            let last = check_index(end, len)?;
            (first..=last).collect()
        };
        self.inner.clear_rows(&rows)
    }

    /// Reset the rows at `indices`. Any index out of range fails the whole
    /// call before anything is cleared.
    pub fn clear_indices(&self, indices: &[i32]) -> Result<()> {
        self.inner.core.check_widget()?;
        let mut rows = {
            let len = self.inner.state.lock().items.len();
            indices
                .iter()
                .map(|index| check_index(*index, len))
                .collect::<Result<Vec<_>>>()?
        };
        rows.sort_unstable();
        rows.dedup();
        self.inner.clear_rows(&rows)
    }

    /// Reset every row.
    pub fn clear_all(&self) -> Result<()> {
        self.inner.core.check_widget()?;
        let len = self.inner.state.lock().items.len();
        let rows: Vec<usize> = (0..len).collect();
        self.inner.clear_rows(&rows)
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// The column at `index`.
    pub fn column(&self, index: i32) -> Result<TableColumn> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        let index = check_index(index, state.columns.len())?;
        Ok(state.columns[index].clone())
    }

    /// Every column, in order.
    pub fn columns(&self) -> Result<Vec<TableColumn>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().columns.clone())
    }

    /// The number of columns.
    pub fn column_count(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(to_count(self.inner.state.lock().columns.len()))
    }

    /// The index of `column`, or `-1` if it belongs to another table.
    pub fn index_of_column(&self, column: &TableColumn) -> Result<i32> {
        self.inner.core.check_widget()?;
        column.core().check_widget()?;
        let state = self.inner.state.lock();
        Ok(to_index(state.columns.iter().position(|c| c == column)))
    }

    /// Column indices in the order the columns are displayed.
    pub fn column_order(&self) -> Result<Vec<i32>> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        Ok(state
            .column_order
            .iter()
            .map(|index| to_index(Some(*index)))
            .collect())
    }

    /// Display the columns in `order`, which must name every column index
    /// exactly once.
    ///
    /// Sends `Move` to each column whose display position changed.
    pub fn set_column_order(&self, order: &[i32]) -> Result<()> {
        self.inner.core.check_widget()?;
        let count = self.inner.state.lock().columns.len();
        let order = order
            .iter()
            .map(|index| usize::try_from(*index).unwrap_or(usize::MAX))
            .collect::<Vec<_>>();
        if !is_permutation(&order, count) {
            return Err(Error::InvalidArgument("column order must name every column once"));
        }
        let moved = self.inner.store_column_order(order.clone());
        if moved.is_empty() {
            return Ok(());
        }
        self.inner.core.apply(NativeCommand::SetColumnOrder(order))?;
        send_moves(&moved)
    }

    /// The column showing the sort indicator.
    pub fn sort_column(&self) -> Result<Option<TableColumn>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().sort_column.clone())
    }

    /// Show the sort indicator on `column`, or on no column.
    ///
    /// Columns of other tables are ignored.
    pub fn set_sort_column(&self, column: Option<&TableColumn>) -> Result<()> {
        self.inner.core.check_widget()?;
        if let Some(column) = column {
            if column.core().is_disposed() {
                return Err(Error::InvalidArgument("column is disposed"));
            }
            if !self.inner.state.lock().columns.contains(column) {
                return Ok(());
            }
        }
        self.inner.state.lock().sort_column = column.cloned();
        let handle = column.and_then(|column| column.core().handle());
        self.inner.core.apply(NativeCommand::SetSortColumn(handle))
    }

    /// The direction of the sort indicator.
    pub fn sort_direction(&self) -> Result<SortDirection> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().sort_direction)
    }

    /// Set the direction of the sort indicator.
    pub fn set_sort_direction(&self, direction: SortDirection) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().sort_direction = direction;
        self.inner
            .core
            .apply(NativeCommand::SetSortDirection(direction))
    }

    /// Scroll horizontally until `column` is visible. Columns of other
    /// tables are ignored.
    pub fn show_column(&self, column: &TableColumn) -> Result<()> {
        self.inner.core.check_widget()?;
        if column.core().is_disposed() {
            return Err(Error::InvalidArgument("column is disposed"));
        }
        let index = self
            .inner
            .state
            .lock()
            .columns
            .iter()
            .position(|c| c == column);
        match index {
            Some(index) => self.inner.core.apply(NativeCommand::ShowColumn(index)),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select the row at `index`. Out-of-range indices are ignored.
    pub fn select(&self, index: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.update_selection(|selection, len, single| {
            if let Ok(row) = check_index(index, len) {
                if single {
                    selection.clear();
                }
                selection.push(row);
            }
        })
    }

    /// Select the rows `start..=end`, ignoring rows out of range.
    ///
    /// A `SINGLE` table ignores ranges of more than one row.
    pub fn select_range(&self, start: i32, end: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.update_selection(|selection, len, single| {
            if len == 0 || end < 0 || start > end || (single && start != end) {
                return;
            }
            let first = usize::try_from(start).unwrap_or(0);
            let last = usize::try_from(end).map_or(0, |end| end.min(len - 1));
            if first > last {
                return;
            }
            if single {
                selection.clear();
            }
            selection.extend(first..=last);
        })
    }

    /// Select the rows at `indices`, ignoring rows out of range.
    ///
    /// A `SINGLE` table selects only the first valid index.
    pub fn select_indices(&self, indices: &[i32]) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.update_selection(|selection, len, single| {
            let mut rows = indices
                .iter()
                .filter_map(|index| check_index(*index, len).ok());
            if single {
                if let Some(row) = rows.next() {
                    selection.clear();
                    selection.push(row);
                }
            } else {
                selection.extend(rows);
            }
        })
    }

    /// Select every row. Ignored for `SINGLE` tables.
    pub fn select_all(&self) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.update_selection(|selection, len, single| {
            if !single {
                selection.extend(0..len);
            }
        })
    }

    /// Deselect the row at `index`. Out-of-range indices are ignored.
    pub fn deselect(&self, index: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.update_selection(|selection, len, _| {
            if let Ok(row) = check_index(index, len) {
                selection.retain(|selected| *selected != row);
            }
        })
    }

    /// Deselect the rows `start..=end`.
    pub fn deselect_range(&self, start: i32, end: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.update_selection(|selection, _, _| {
            selection.retain(|row| {
                let row = i64::try_from(*row).unwrap_or(i64::MAX);
                row < i64::from(start) || row > i64::from(end)
            });
        })
    }

    /// Deselect the rows at `indices`.
    pub fn deselect_indices(&self, indices: &[i32]) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.update_selection(|selection, _, _| {
            selection.retain(|row| !indices.iter().any(|index| usize::try_from(*index) == Ok(*row)));
        })
    }

    /// Clear the selection.
    pub fn deselect_all(&self) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.update_selection(|selection, _, _| selection.clear())
    }

    /// Replace the selection with the row at `index`.
    pub fn set_selection(&self, index: i32) -> Result<()> {
        self.deselect_all()?;
        self.select(index)?;
        self.show_selection()
    }

    /// Replace the selection with the rows `start..=end`.
    pub fn set_selection_range(&self, start: i32, end: i32) -> Result<()> {
        self.deselect_all()?;
        self.select_range(start, end)?;
        self.show_selection()
    }

    /// Replace the selection with the rows at `indices`.
    pub fn set_selection_indices(&self, indices: &[i32]) -> Result<()> {
        self.deselect_all()?;
        self.select_indices(indices)?;
        self.show_selection()
    }

    /// Replace the selection with `items`. Items of other tables are
    /// ignored; a `SINGLE` table selects only the first item.
    pub fn set_selection_items(&self, items: &[TableItem]) -> Result<()> {
        self.inner.core.check_widget()?;
        for item in items {
            if item.core().is_disposed() {
                return Err(Error::InvalidArgument("item is disposed"));
            }
        }
        self.deselect_all()?;
        let limit = if self.inner.is_single() { 1 } else { items.len() };
        let rows: Vec<i32> = items
            .iter()
            .take(limit)
            .filter_map(|item| self.inner.row_of(item.id()))
            .map(|row| to_index(Some(row)))
            .collect();
        self.select_indices(&rows)?;
        self.show_selection()
    }

    /// The selected items, in row order.
    pub fn selection(&self) -> Result<Vec<TableItem>> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        Ok(state
            .selection
            .iter()
            .map(|row| state.items[*row].clone())
            .collect())
    }

    /// The first selected row, or `-1`.
    pub fn selection_index(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(to_index(self.inner.state.lock().selection.first().copied()))
    }

    /// Every selected row, ascending.
    pub fn selection_indices(&self) -> Result<Vec<i32>> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        Ok(state.selection.iter().map(|row| to_index(Some(*row))).collect())
    }

    /// The number of selected rows.
    pub fn selection_count(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(to_count(self.inner.state.lock().selection.len()))
    }

    /// Whether the row at `index` is selected. `false` out of range.
    pub fn is_selected(&self, index: i32) -> Result<bool> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        Ok(check_index(index, state.items.len())
            .is_ok_and(|row| state.selection.binary_search(&row).is_ok()))
    }

    /// Scroll the first selected row into view.
    pub fn show_selection(&self) -> Result<()> {
        self.inner.core.check_widget()?;
        let first = self.inner.state.lock().selection.first().copied();
        match first {
            Some(row) => self.inner.show_row(row),
            None => Ok(()),
        }
    }

    /// Scroll until `item` is visible. Items of other tables are ignored.
    pub fn show_item(&self, item: &TableItem) -> Result<()> {
        self.inner.core.check_widget()?;
        if item.core().is_disposed() {
            return Err(Error::InvalidArgument("item is disposed"));
        }
        match self.inner.row_of(item.id()) {
            Some(row) => self.inner.show_row(row),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Appearance
    // =========================================================================

    /// The first visible row.
    pub fn top_index(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(to_index(Some(self.inner.state.lock().top_index)))
    }

    /// Scroll so `index` is the first visible row. Out-of-range indices are
    /// ignored.
    pub fn set_top_index(&self, index: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        let row = {
            let mut state = self.inner.state.lock();
            let Ok(row) = check_index(index, state.items.len()) else {
                return Ok(());
            };
            state.top_index = row;
            row
        };
        self.inner.core.apply(NativeCommand::SetTopIndex(row))
    }

    /// Whether column headers are shown.
    pub fn header_visible(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().header_visible)
    }

    /// Show or hide column headers.
    pub fn set_header_visible(&self, visible: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().header_visible = visible;
        self.inner.core.apply(NativeCommand::SetHeaderVisible(visible))
    }

    /// Whether grid lines are shown.
    pub fn lines_visible(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().lines_visible)
    }

    /// Show or hide grid lines.
    pub fn set_lines_visible(&self, visible: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().lines_visible = visible;
        self.inner.core.apply(NativeCommand::SetLinesVisible(visible))
    }

    pub(crate) fn inner(&self) -> &Arc<TableInner> {
        &self.inner
    }
}

impl TableInner {
    fn is_single(&self) -> bool {
        self.core.style().has(Style::SINGLE)
    }

    fn is_disposing(&self) -> bool {
        matches!(
            self.core.state(),
            WidgetState::Disposing | WidgetState::Disposed
        )
    }

    pub(crate) fn is_check(&self) -> bool {
        self.core.style().has(Style::CHECK)
    }

    pub(crate) fn row_of(&self, id: WidgetId) -> Option<usize> {
        self.state.lock().items.iter().position(|item| item.id() == id)
    }

    /// The number of text cells per row.
    pub(crate) fn cell_count(&self) -> usize {
        self.state.lock().columns.len().max(1)
    }

    /// Scroll the least amount needed to make `row` visible.
    fn show_row(&self, row: usize) -> Result<()> {
        {
            let mut state = self.state.lock();
            if row < state.top_index {
                state.top_index = row;
            }
        }
        self.core.apply(NativeCommand::ShowRow(row))
    }

    fn clear_rows(&self, rows: &[usize]) -> Result<()> {
        let items: Vec<(usize, TableItem)> = {
            let state = self.state.lock();
            rows.iter()
                .filter_map(|row| state.items.get(*row).map(|item| (*row, item.clone())))
                .collect()
        };
        for (row, item) in items {
            item.reset();
            self.core.apply(NativeCommand::ClearRow(row))?;
        }
        Ok(())
    }

    /// Replace the display order and return the columns whose display
    /// position changed, in their new order.
    fn store_column_order(&self, order: Vec<usize>) -> Vec<TableColumn> {
        let mut state = self.state.lock();
        let moved = order
            .iter()
            .zip(&state.column_order)
            .filter(|(after, before)| after != before)
            .filter_map(|(after, _)| state.columns.get(*after).cloned())
            .collect();
        state.column_order = order;
        moved
    }

    fn on_columns_reordered(&self, order: &[usize]) -> Result<()> {
        let count = self.state.lock().columns.len();
        if !is_permutation(order, count) {
            return Ok(());
        }
        send_moves(&self.store_column_order(order.to_vec()))
    }

    /// Apply `update` to the selection, normalize it, and push it to the
    /// native side if it changed.
    fn update_selection(&self, update: impl FnOnce(&mut Vec<usize>, usize, bool)) -> Result<()> {
        let single = self.is_single();
        let changed = {
            let mut state = self.state.lock();
            let before = state.selection.clone();
            let len = state.items.len();
            update(&mut state.selection, len, single);
            state.selection.retain(|row| *row < len);
            state.selection.sort_unstable();
            state.selection.dedup();
            (before != state.selection).then(|| state.selection.clone())
        };
        match changed {
            Some(rows) => self.core.apply(NativeCommand::SelectRows(rows)),
            None => Ok(()),
        }
    }

    pub(crate) fn insert_item(&self, index: usize, item: TableItem) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.items.insert(index, item);
            for row in state.selection.iter_mut().filter(|row| **row >= index) {
                *row += 1;
            }
        }
        self.core.apply(NativeCommand::InsertRow(index))
    }

    /// Forget the item `id`, which is being disposed.
    pub(crate) fn remove_item(&self, id: WidgetId) {
        let row = {
            let mut state = self.state.lock();
            let Some(row) = state.items.iter().position(|item| item.id() == id) else {
                return;
            };
            state.items.remove(row);
            state.selection.retain(|selected| *selected != row);
            for selected in state.selection.iter_mut().filter(|selected| **selected > row) {
                *selected -= 1;
            }
            if state.top_index >= state.items.len() {
                state.top_index = state.items.len().saturating_sub(1);
            }
            row
        };
        if self.is_disposing() {
            return;
        }
        if let Err(err) = self.core.apply(NativeCommand::RemoveRows {
            start: row,
            end: row + 1,
        }) {
            tracing::warn!(target: targets::WIDGET, ?id, row, error = %err, "failed to remove table row");
        }
    }

    /// Add `column` at `index`, shifting the cell texts of every row when
    /// other columns already exist.
    pub(crate) fn insert_column(&self, index: usize, column: TableColumn) -> Result<()> {
        let (child, shift, items) = {
            let mut state = self.state.lock();
            let shift = !state.columns.is_empty();
            let child = column.core().handle();
            state.columns.insert(index, column);
            for position in state.column_order.iter_mut().filter(|position| **position >= index) {
                *position += 1;
            }
            let at = index.min(state.column_order.len());
            state.column_order.insert(at, index);
            (child, shift, state.items.clone())
        };
        if shift {
            for item in &items {
                item.insert_cell(index);
            }
        }
        match child {
            Some(child) => self.core.apply(NativeCommand::InsertChild { child, index }),
            None => Ok(()),
        }
    }

    /// Forget the column `id`, which is being disposed.
    pub(crate) fn remove_column(&self, id: WidgetId) {
        let (index, remaining, items) = {
            let mut state = self.state.lock();
            let Some(index) = state.columns.iter().position(|column| column.id() == id) else {
                return;
            };
            state.columns.remove(index);
            state.column_order.retain(|position| *position != index);
            for position in state.column_order.iter_mut().filter(|position| **position > index) {
                *position -= 1;
            }
            if state
                .sort_column
                .as_ref()
                .is_some_and(|column| column.id() == id)
            {
                state.sort_column = None;
            }
            (index, state.columns.len(), state.items.clone())
        };
        for item in &items {
            if remaining == 0 {
                item.truncate_cells(1);
            } else {
                item.remove_cell(index);
            }
        }
    }

    fn item_at(&self, row: usize) -> Option<TableItem> {
        self.state.lock().items.get(row).cloned()
    }

    fn on_selection_changed(&self, rows: &[usize], focus: Option<usize>) -> Result<()> {
        let single = self.is_single();
        let focus_row = {
            let mut state = self.state.lock();
            let len = state.items.len();
            let mut selection: Vec<usize> = rows.iter().copied().filter(|row| *row < len).collect();
            selection.sort_unstable();
            selection.dedup();
            if single && selection.len() > 1 {
                let keep = focus
                    .filter(|row| selection.contains(row))
                    .unwrap_or(selection[0]);
                selection = vec![keep];
            }
            state.selection = selection;
            focus
                .filter(|row| *row < len)
                .or_else(|| state.selection.first().copied())
        };
        let Some(row) = focus_row else {
            return Ok(());
        };
        let Some(item) = self.item_at(row) else {
            return Ok(());
        };
        self.core.post_event(
            Event::new(EventType::Selection)
                .with_item(item.id())
                .with_index(to_index(Some(row))),
        )
    }

    fn on_row_activated(&self, row: usize) -> Result<()> {
        let mut event = Event::new(EventType::DefaultSelection);
        if let Some(item) = self.item_at(row) {
            event = event.with_item(item.id()).with_index(to_index(Some(row)));
        }
        self.core.post_event(event)
    }

    fn on_row_toggled(&self, row: usize, checked: bool) -> Result<()> {
        let Some(item) = self.item_at(row) else {
            return Ok(());
        };
        item.store_checked(checked);
        self.core.post_event(
            Event::new(EventType::Selection)
                .with_item(item.id())
                .with_index(to_index(Some(row)))
                .with_detail(EventDetail::Check),
        )
    }
}

/// Whether `order` names every index in `0..count` exactly once.
fn is_permutation(order: &[usize], count: usize) -> bool {
    if order.len() != count {
        return false;
    }
    let mut seen = vec![false; count];
    order
        .iter()
        .all(|&index| index < count && !std::mem::replace(&mut seen[index], true))
}

fn send_moves(columns: &[TableColumn]) -> Result<()> {
    for column in columns {
        column.core().send_event(Event::new(EventType::Move))?;
    }
    Ok(())
}

impl NativeWidget for TableInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::TreeView => TABLE_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::SelectionChanged { rows, focus } => {
                self.on_selection_changed(rows, *focus)
            }
            NativeSignal::RowActivated { row } => self.on_row_activated(*row),
            NativeSignal::RowToggled { row, checked } => self.on_row_toggled(*row, *checked),
            NativeSignal::ColumnsReordered { order } => self.on_columns_reordered(order),
            other => send_input_event(&self.core, other).map(|_| ()),
        }
    }

    fn release_widget(&self) {
        let mut state = self.state.lock();
        state.items.clear();
        state.columns.clear();
        state.column_order.clear();
        state.sort_column = None;
        state.selection.clear();
    }
}

impl Widget for Table {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("core", &self.inner.core).finish()
    }
}

impl Table {
    pub(crate) fn from_inner(inner: Arc<TableInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<TableInner> {
        Arc::downgrade(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Shell;
    use horizon_bridge_core::{
        Display, DisplayRegistry, Disposable, EventSource, HeadlessController, HeadlessToolkit,
        NativeHandleOwner,
    };

    fn setup(style: Style) -> (DisplayRegistry, Display, HeadlessController, Table) {
        let registry = DisplayRegistry::new();
        let toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let display = Display::builder(&registry).toolkit(toolkit).build().unwrap();
        let shell = Shell::new(&display, Style::NONE).unwrap();
        let table = Table::new(&shell, style).unwrap();
        (registry, display, controller, table)
    }

    fn fill(table: &Table, labels: &[&str]) -> Vec<TableItem> {
        labels
            .iter()
            .map(|label| {
                let item = TableItem::new(table, Style::NONE).unwrap();
                item.set_text(*label).unwrap();
                item
            })
            .collect()
    }

    fn record(table: &Table, event_type: EventType) -> Arc<Mutex<Vec<Event>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        table
            .on(event_type, move |event| sink.lock().push(event.clone()))
            .unwrap();
        log
    }

    #[test]
    fn test_item_bounds() {
        let (_registry, display, _controller, table) = setup(Style::SINGLE);
        let items = fill(&table, &["a", "b", "c"]);
        assert_eq!(table.item_count().unwrap(), 3);
        for (index, item) in items.iter().enumerate() {
            assert_eq!(&table.item(index as i32).unwrap(), item);
            assert_eq!(table.index_of(item).unwrap(), index as i32);
        }
        assert!(matches!(
            table.item(3),
            Err(Error::InvalidRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            table.item(-1),
            Err(Error::InvalidRange { index: -1, len: 3 })
        ));
        display.dispose().unwrap();
    }

    #[test]
    fn test_single_selection_round_trip() {
        let (_registry, display, controller, table) = setup(Style::SINGLE);
        let handle = table.handle().unwrap().unwrap();
        fill(&table, &["a", "b", "c"]);

        table.select(1).unwrap();
        assert_eq!(table.selection_index().unwrap(), 1);
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SelectRows(vec![1]))
        );

        table.select(2).unwrap();
        assert_eq!(table.selection_indices().unwrap(), vec![2]);
        table.select_range(0, 1).unwrap();
        table.select_all().unwrap();
        assert_eq!(table.selection_indices().unwrap(), vec![2]);

        table.select_indices(&[7, 0, 1]).unwrap();
        assert_eq!(table.selection_indices().unwrap(), vec![0]);

        table.deselect_all().unwrap();
        assert_eq!(table.selection_index().unwrap(), -1);
        assert_eq!(table.selection_count().unwrap(), 0);
        display.dispose().unwrap();
    }

    #[test]
    fn test_multi_selection() {
        let (_registry, display, _controller, table) = setup(Style::MULTI);
        let items = fill(&table, &["a", "b", "c", "d", "e"]);

        table.select_range(-2, 1).unwrap();
        table.select_indices(&[4, 4, 9]).unwrap();
        assert_eq!(table.selection_indices().unwrap(), vec![0, 1, 4]);
        assert!(table.is_selected(4).unwrap());
        assert!(!table.is_selected(9).unwrap());

        table.deselect_range(0, 0).unwrap();
        table.deselect_indices(&[4]).unwrap();
        assert_eq!(table.selection().unwrap(), vec![items[1].clone()]);

        table.select_all().unwrap();
        assert_eq!(table.selection_count().unwrap(), 5);
        table.deselect(2).unwrap();
        assert_eq!(table.selection_indices().unwrap(), vec![0, 1, 3, 4]);

        table.set_selection_range(3, 2).unwrap();
        assert_eq!(table.selection_count().unwrap(), 0);
        table
            .set_selection_items(&[items[3].clone(), items[0].clone()])
            .unwrap();
        assert_eq!(table.selection_indices().unwrap(), vec![0, 3]);
        assert_eq!(table.top_index().unwrap(), 0);
        display.dispose().unwrap();
    }

    #[test]
    fn test_removal_adjusts_selection() {
        let (_registry, display, controller, table) = setup(Style::MULTI);
        let handle = table.handle().unwrap().unwrap();
        let items = fill(&table, &["a", "b", "c", "d", "e"]);
        table.select_indices(&[1, 3, 4]).unwrap();

        table.remove(1).unwrap();
        assert!(items[1].is_disposed());
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::RemoveRows { start: 1, end: 2 })
        );
        assert_eq!(table.selection_indices().unwrap(), vec![2, 3]);

        table.remove_range(2, 1).unwrap();
        assert_eq!(table.item_count().unwrap(), 4);
        assert!(matches!(
            table.remove_range(0, 4),
            Err(Error::InvalidRange { .. })
        ));
        assert!(matches!(
            table.remove_indices(&[0, 9]),
            Err(Error::InvalidRange { .. })
        ));
        assert_eq!(table.item_count().unwrap(), 4);

        table.remove_indices(&[3, 0, 3]).unwrap();
        assert_eq!(table.items().unwrap(), vec![items[2].clone(), items[3].clone()]);
        assert_eq!(table.selection_indices().unwrap(), vec![1]);

        table.remove_all().unwrap();
        assert_eq!(table.item_count().unwrap(), 0);
        assert_eq!(table.selection_count().unwrap(), 0);
        display.dispose().unwrap();
    }

    #[test]
    fn test_native_selection_posts_focus_item() {
        let (_registry, display, controller, table) = setup(Style::SINGLE);
        let handle = table.handle().unwrap().unwrap();
        let items = fill(&table, &["a", "b", "c"]);
        let selections = record(&table, EventType::Selection);

        controller.emit(
            handle,
            NativeSignal::SelectionChanged {
                rows: vec![0, 2],
                focus: Some(2),
            },
        );
        while display.read_and_dispatch().unwrap() {}
        assert_eq!(table.selection_indices().unwrap(), vec![2]);
        let events = selections.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].item, Some(items[2].id()));
        assert_eq!(events[0].index, 2);
        drop(events);
        display.dispose().unwrap();
    }

    #[test]
    fn test_native_activation_and_toggle() {
        let (_registry, display, controller, table) = setup(Style::CHECK);
        let handle = table.handle().unwrap().unwrap();
        let items = fill(&table, &["a", "b"]);
        let defaults = record(&table, EventType::DefaultSelection);
        let selections = record(&table, EventType::Selection);

        controller.emit(handle, NativeSignal::RowActivated { row: 1 });
        controller.emit(
            handle,
            NativeSignal::RowToggled {
                row: 0,
                checked: true,
            },
        );
        while display.read_and_dispatch().unwrap() {}

        assert_eq!(defaults.lock()[0].item, Some(items[1].id()));
        assert_eq!(selections.lock()[0].detail, EventDetail::Check);
        assert!(items[0].checked().unwrap());
        display.dispose().unwrap();
    }

    #[test]
    fn test_appearance() {
        let (_registry, display, controller, table) = setup(Style::NONE);
        let handle = table.handle().unwrap().unwrap();
        fill(&table, &["a", "b", "c"]);
        table.set_header_visible(true).unwrap();
        table.set_lines_visible(true).unwrap();
        assert!(table.header_visible().unwrap());
        assert!(table.lines_visible().unwrap());

        table.set_top_index(2).unwrap();
        table.set_top_index(5).unwrap();
        assert_eq!(table.top_index().unwrap(), 2);
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetTopIndex(2))
        );
        display.dispose().unwrap();
    }

    #[test]
    fn test_dispose_table_disposes_rows_and_columns() {
        let (_registry, display, controller, table) = setup(Style::NONE);
        let column = TableColumn::new(&table, Style::NONE).unwrap();
        let column_handle = column.handle().unwrap().unwrap();
        let items = fill(&table, &["a", "b"]);
        table.dispose().unwrap();
        assert!(column.is_disposed());
        assert!(items.iter().all(|item| item.is_disposed()));
        assert!(!controller.is_alive(column_handle));
        display.dispose().unwrap();
    }

    #[test]
    fn test_select_range_clamps_to_rows() {
        let (_registry, display, _controller, table) = setup(Style::MULTI);
        fill(&table, &["a", "b", "c"]);

        table.select_range(0, i32::MAX).unwrap();
        assert_eq!(table.selection_indices().unwrap(), vec![0, 1, 2]);

        table.deselect_all().unwrap();
        table.select_range(i32::MIN, 0).unwrap();
        assert_eq!(table.selection_indices().unwrap(), vec![0]);

        table.deselect_all().unwrap();
        table.select_range(5, i32::MAX).unwrap();
        assert_eq!(table.selection_count().unwrap(), 0);
        display.dispose().unwrap();
    }

    #[test]
    fn test_column_order_sends_move() {
        let (_registry, display, controller, table) = setup(Style::NONE);
        let handle = table.handle().unwrap().unwrap();
        let columns: Vec<TableColumn> = (0..3)
            .map(|_| TableColumn::new(&table, Style::NONE).unwrap())
            .collect();
        let moves = Arc::new(Mutex::new(Vec::new()));
        for (index, column) in columns.iter().enumerate() {
            let sink = moves.clone();
            column
                .on(EventType::Move, move |_| sink.lock().push(index))
                .unwrap();
        }
        assert_eq!(table.column_order().unwrap(), vec![0, 1, 2]);

        table.set_column_order(&[2, 0, 1]).unwrap();
        assert_eq!(table.column_order().unwrap(), vec![2, 0, 1]);
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetColumnOrder(vec![2, 0, 1]))
        );
        assert_eq!(*moves.lock(), vec![2, 0, 1]);

        moves.lock().clear();
        table.set_column_order(&[2, 1, 0]).unwrap();
        assert_eq!(*moves.lock(), vec![1, 0]);

        let bad_orders: [&[i32]; 4] = [&[0, 0, 1], &[0, 1], &[0, 1, 3], &[-1, 0, 1]];
        for bad in bad_orders {
            assert!(matches!(
                table.set_column_order(bad),
                Err(Error::InvalidArgument(_))
            ));
        }
        assert_eq!(table.column_order().unwrap(), vec![2, 1, 0]);

        let inserted = TableColumn::new_at(&table, Style::NONE, 1).unwrap();
        assert_eq!(table.column_order().unwrap(), vec![3, 1, 2, 0]);
        inserted.dispose().unwrap();
        assert_eq!(table.column_order().unwrap(), vec![2, 1, 0]);
        display.dispose().unwrap();
    }

    #[test]
    fn test_native_column_reorder() {
        let (_registry, display, controller, table) = setup(Style::NONE);
        let handle = table.handle().unwrap().unwrap();
        let first = TableColumn::new(&table, Style::NONE).unwrap();
        TableColumn::new(&table, Style::NONE).unwrap();
        let moved = Arc::new(Mutex::new(0));
        let sink = moved.clone();
        first
            .on(EventType::Move, move |_| *sink.lock() += 1)
            .unwrap();

        controller.emit(handle, NativeSignal::ColumnsReordered { order: vec![1, 0] });
        controller.emit(handle, NativeSignal::ColumnsReordered { order: vec![1, 1] });
        while display.read_and_dispatch().unwrap() {}
        assert_eq!(table.column_order().unwrap(), vec![1, 0]);
        assert_eq!(*moved.lock(), 1);
        display.dispose().unwrap();
    }

    #[test]
    fn test_sort_indicator() {
        let (_registry, display, controller, table) = setup(Style::NONE);
        let handle = table.handle().unwrap().unwrap();
        TableColumn::new(&table, Style::NONE).unwrap();
        let size = TableColumn::new(&table, Style::NONE).unwrap();
        let size_handle = size.handle().unwrap().unwrap();
        assert_eq!(table.sort_column().unwrap(), None);
        assert_eq!(table.sort_direction().unwrap(), SortDirection::None);

        table.set_sort_column(Some(&size)).unwrap();
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetSortColumn(Some(size_handle)))
        );
        table.set_sort_direction(SortDirection::Down).unwrap();
        assert_eq!(table.sort_column().unwrap(), Some(size.clone()));
        assert_eq!(table.sort_direction().unwrap(), SortDirection::Down);

        size.dispose().unwrap();
        assert_eq!(table.sort_column().unwrap(), None);
        assert!(matches!(
            table.set_sort_column(Some(&size)),
            Err(Error::InvalidArgument(_))
        ));
        table.set_sort_column(None).unwrap();
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetSortColumn(None))
        );
        display.dispose().unwrap();
    }

    #[test]
    fn test_show_item_and_column() {
        let (_registry, display, controller, table) = setup(Style::NONE);
        let handle = table.handle().unwrap().unwrap();
        let items = fill(&table, &["a", "b", "c", "d", "e"]);
        let column = TableColumn::new(&table, Style::NONE).unwrap();

        table.set_top_index(3).unwrap();
        table.show_item(&items[1]).unwrap();
        assert_eq!(table.top_index().unwrap(), 1);
        assert_eq!(controller.last_command(handle), Some(NativeCommand::ShowRow(1)));

        table.show_item(&items[4]).unwrap();
        assert_eq!(table.top_index().unwrap(), 1);
        assert_eq!(controller.last_command(handle), Some(NativeCommand::ShowRow(4)));

        table.show_column(&column).unwrap();
        assert_eq!(controller.last_command(handle), Some(NativeCommand::ShowColumn(0)));

        items[0].dispose().unwrap();
        assert!(matches!(
            table.show_item(&items[0]),
            Err(Error::InvalidArgument(_))
        ));
        display.dispose().unwrap();
    }

    #[test]
    fn test_clear_resets_rows() {
        let (_registry, display, controller, table) = setup(Style::CHECK);
        let handle = table.handle().unwrap().unwrap();
        let items = fill(&table, &["a", "b", "c"]);
        items[0].set_checked(true).unwrap();

        table.clear(0).unwrap();
        assert_eq!(items[0].text().unwrap(), "");
        assert!(!items[0].checked().unwrap());
        assert_eq!(controller.last_command(handle), Some(NativeCommand::ClearRow(0)));

        assert!(matches!(
            table.clear_indices(&[1, 7]),
            Err(Error::InvalidRange { .. })
        ));
        assert_eq!(items[1].text().unwrap(), "b");

        table.clear_range(2, 1).unwrap();
        assert_eq!(items[2].text().unwrap(), "c");
        table.clear_range(1, 2).unwrap();
        assert_eq!(items[1].text().unwrap(), "");
        assert_eq!(items[2].text().unwrap(), "");

        items[1].set_text("again").unwrap();
        table.clear_all().unwrap();
        assert_eq!(items[1].text().unwrap(), "");
        assert_eq!(table.item_count().unwrap(), 3);
        display.dispose().unwrap();
    }

    #[test]
    fn test_failed_native_setup_leaves_nothing() {
        let registry = DisplayRegistry::new();
        let toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let display = Display::builder(&registry).toolkit(toolkit).build().unwrap();
        let shell = Shell::new(&display, Style::NONE).unwrap();
        let widgets = display.widget_count().unwrap();
        let handles = controller.live_handle_count();

        controller.fail_next_apply(1);
        assert!(matches!(
            Table::new(&shell, Style::RIGHT_TO_LEFT),
            Err(Error::Native(_))
        ));
        assert_eq!(display.widget_count().unwrap(), widgets);
        assert_eq!(controller.live_handle_count(), handles);
        display.dispose().unwrap();
    }
}
