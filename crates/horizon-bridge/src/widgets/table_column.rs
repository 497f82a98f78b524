//! Table columns.
//!
//! Each [`TableColumn`] owns a native column handle inside its table.
//! Adding a column between existing ones inserts an empty cell into every
//! row; disposing one drops that cell. A column receives `Move` when its
//! display position changes.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_bridge_core::{
    Alignment, Error, Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal,
    NativeWidget, Result, SignalKind, Style, Widget, WidgetBuilder, WidgetCore,
};

use super::table::TableInner;
use super::{Table, check_insert_index};

const COLUMN_SIGNALS: &[SignalKind] = &[SignalKind::ColumnClicked, SignalKind::ColumnResized];

struct TableColumnState {
    text: String,
    width: i32,
    alignment: Alignment,
    resizable: bool,
    moveable: bool,
    tool_tip_text: Option<String>,
}

pub(crate) struct TableColumnInner {
    core: WidgetCore,
    parent: Weak<TableInner>,
    state: Mutex<TableColumnState>,
}

/// A column of a [`Table`].
#[derive(Clone)]
pub struct TableColumn {
    inner: Arc<TableColumnInner>,
}

impl TableColumn {
    /// Append a column to `parent`.
    pub fn new(parent: &Table, style: Style) -> Result<Self> {
        let count = parent.columns()?.len();
        Self::create(parent, style, count)
    }

    /// Insert a column into `parent` at `index` (`0..=count`).
    pub fn new_at(parent: &Table, style: Style, index: i32) -> Result<Self> {
        let count = parent.columns()?.len();
        let index = check_insert_index(index, count)?;
        Self::create(parent, style, index)
    }

    fn create(parent: &Table, style: Style, index: usize) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let inner = WidgetBuilder::new(&display, "TableColumn", style)
            .parent(parent.core())
            .handle(HandleClass::TreeColumn)
            .build(|core| TableColumnInner {
                core,
                parent: parent.downgrade(),
                state: Mutex::new(TableColumnState {
                    text: String::new(),
                    width: 0,
                    alignment: Alignment::Left,
                    resizable: true,
                    moveable: false,
                    tool_tip_text: None,
                }),
            })?;
        let column = Self { inner };
        parent.inner().insert_column(index, column.clone())?;
        Ok(column)
    }

    /// The table containing this column.
    pub fn parent(&self) -> Result<Table> {
        self.inner.core.check_widget()?;
        self.inner
            .parent
            .upgrade()
            .map(Table::from_inner)
            .ok_or(Error::WidgetDisposed)
    }

    /// The header text.
    pub fn text(&self) -> Result<String> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text.clone())
    }

    /// Set the header text.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        let text = text.into();
        self.inner.state.lock().text.clone_from(&text);
        self.inner.core.apply(NativeCommand::SetText(text))
    }

    /// The header tooltip.
    pub fn tool_tip_text(&self) -> Result<Option<String>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().tool_tip_text.clone())
    }

    /// Set or clear the header tooltip.
    pub fn set_tool_tip_text(&self, text: Option<&str>) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().tool_tip_text = text.map(str::to_owned);
        Ok(())
    }

    /// The width in pixels.
    pub fn width(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().width)
    }

    /// Set the width in pixels. Negative widths are ignored.
    pub fn set_width(&self, width: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        if width < 0 {
            return Ok(());
        }
        {
            let mut state = self.inner.state.lock();
            if state.width == width {
                return Ok(());
            }
            state.width = width;
        }
        self.inner.core.apply(NativeCommand::SetWidth(width))?;
        self.inner.core.send_event(Event::new(EventType::Resize))?;
        Ok(())
    }

    /// The content alignment.
    pub fn alignment(&self) -> Result<Alignment> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().alignment)
    }

    /// Set the content alignment.
    pub fn set_alignment(&self, alignment: Alignment) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().alignment = alignment;
        self.inner.core.apply(NativeCommand::SetAlignment(alignment))
    }

    /// Whether the user may resize the column.
    pub fn resizable(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().resizable)
    }

    /// Allow or forbid resizing by the user.
    pub fn set_resizable(&self, resizable: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().resizable = resizable;
        self.inner.core.apply(NativeCommand::SetResizable(resizable))
    }

    /// Whether the user may drag the column to another position.
    pub fn moveable(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().moveable)
    }

    /// Allow or forbid reordering by the user.
    pub fn set_moveable(&self, moveable: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().moveable = moveable;
        self.inner.core.apply(NativeCommand::SetMoveable(moveable))
    }
}

impl TableColumnInner {
    fn on_resized(&self, width: i32) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.width == width {
                return Ok(());
            }
            state.width = width;
        }
        self.core.send_event(Event::new(EventType::Resize))?;
        Ok(())
    }
}

impl NativeWidget for TableColumnInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::TreeColumn => COLUMN_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::ColumnClicked => {
                self.core.send_event(Event::new(EventType::Selection))?;
                Ok(())
            }
            NativeSignal::ColumnResized { width } => self.on_resized(*width),
            _ => Ok(()),
        }
    }

    fn release_widget(&self) {
        if let Some(table) = self.parent.upgrade() {
            table.remove_column(self.core.id());
        }
    }
}

impl Widget for TableColumn {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for TableColumn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for TableColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableColumn")
            .field("core", &self.inner.core)
            .finish()
    }
}
