//! Menu items.
//!
//! A [`MenuItem`] lives in one [`Menu`]. Its style is one of `PUSH`
//! (default), `CHECK`, `RADIO`, `SEPARATOR` and `CASCADE`.
//!
//! Activating an item posts `Selection`. `CHECK` items toggle first;
//! `RADIO` items select themselves and deselect the adjacent radio items of
//! their group. A `CASCADE` item with a sub-menu opens it instead.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_bridge_core::logging::targets;
use horizon_bridge_core::{
    Error, Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal, NativeWidget,
    Result, SignalKind, Style, Widget, WidgetBuilder, WidgetCore, WidgetId,
};

use super::menu::MenuInner;
use super::{Menu, check_insert_index};

const ITEM_SIGNALS: &[SignalKind] = &[SignalKind::Activate, SignalKind::Select];

#[derive(Default)]
struct MenuItemState {
    text: String,
    accelerator: u32,
    enabled: bool,
    selection: bool,
    command_id: i32,
    menu: Option<Menu>,
}

pub(crate) struct MenuItemInner {
    core: WidgetCore,
    parent: Weak<MenuInner>,
    state: Mutex<MenuItemState>,
}

/// An entry in a [`Menu`].
#[derive(Clone)]
pub struct MenuItem {
    inner: Arc<MenuItemInner>,
}

impl MenuItem {
    /// Append an item to `parent`.
    pub fn new(parent: &Menu, style: Style) -> Result<Self> {
        let count = parent.items()?.len();
        Self::create(parent, style, count)
    }

    /// Insert an item into `parent` at `index` (`0..=count`).
    pub fn new_at(parent: &Menu, style: Style, index: i32) -> Result<Self> {
        let count = parent.items()?.len();
        let index = check_insert_index(index, count)?;
        Self::create(parent, style, index)
    }

    fn create(parent: &Menu, style: Style, index: usize) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let style = style.check_bits(&[
            Style::PUSH,
            Style::CHECK,
            Style::RADIO,
            Style::SEPARATOR,
            Style::CASCADE,
        ]);
        let inner = WidgetBuilder::new(&display, "MenuItem", style)
            .parent(parent.core())
            .handle(HandleClass::MenuItem)
            .build(|core| MenuItemInner {
                core,
                parent: parent.downgrade(),
                state: Mutex::new(MenuItemState {
                    enabled: true,
                    ..MenuItemState::default()
                }),
            })?;
        let item = Self { inner };

        if let Some(child) = item.inner.core.handle() {
            parent
                .core()
                .apply(NativeCommand::InsertChild { child, index })?;
        }
        parent.inner().state.lock().items.insert(index, item.clone());
        Ok(item)
    }

    /// The menu containing this item.
    pub fn parent(&self) -> Result<Menu> {
        self.inner.core.check_widget()?;
        self.inner.parent_menu().ok_or(Error::WidgetDisposed)
    }

    /// The label.
    pub fn text(&self) -> Result<String> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text.clone())
    }

    /// Set the label. Ignored for separators.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        if self.inner.core.style().has(Style::SEPARATOR) {
            return Ok(());
        }
        let text = text.into();
        self.inner.state.lock().text = text.clone();
        self.inner.core.apply(NativeCommand::SetText(text))
    }

    /// The keyboard accelerator, or zero.
    pub fn accelerator(&self) -> Result<u32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().accelerator)
    }

    /// Set the keyboard accelerator. Zero removes it.
    pub fn set_accelerator(&self, accelerator: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().accelerator = accelerator;
        self.inner
            .core
            .apply(NativeCommand::SetAccelerator(accelerator))
    }

    /// Whether the item is enabled.
    pub fn is_enabled(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().enabled)
    }

    /// Enable or disable the item.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().enabled = enabled;
        self.inner.core.apply(NativeCommand::SetEnabled(enabled))
    }

    /// Whether a `CHECK` or `RADIO` item is selected. Always `false` for
    /// other items.
    pub fn selection(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().selection)
    }

    /// Select or deselect a `CHECK` or `RADIO` item. Ignored for other
    /// items; radio siblings are left untouched.
    pub fn set_selection(&self, selected: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        if !self.inner.is_toggle() {
            return Ok(());
        }
        self.inner.store_selection(selected)
    }

    /// An application-defined identifier.
    pub fn command_id(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().command_id)
    }

    /// Set the application-defined identifier.
    pub fn set_command_id(&self, id: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().command_id = id;
        Ok(())
    }

    /// The sub-menu of a `CASCADE` item.
    pub fn menu(&self) -> Result<Option<Menu>> {
        self.inner.core.check_widget()?;
        let menu = self.inner.state.lock().menu.clone();
        Ok(menu.filter(|menu| !menu.core().is_disposed()))
    }

    /// Attach or detach the sub-menu of a `CASCADE` item.
    ///
    /// The menu must be a `DROP_DOWN` menu of the same shell. A menu attached
    /// to another item moves to this one.
    pub fn set_menu(&self, menu: Option<&Menu>) -> Result<()> {
        self.inner.core.check_widget()?;
        if !self.inner.core.style().has(Style::CASCADE) {
            return Err(Error::InvalidArgument("item is not a cascade item"));
        }
        if let Some(menu) = menu {
            menu.core().check_widget()?;
            if !menu.core().style().has(Style::DROP_DOWN) {
                return Err(Error::InvalidArgument("menu is not a drop-down menu"));
            }
            let parent = self.parent()?;
            if menu.shell_id() != parent.shell_id() {
                return Err(Error::InvalidArgument("menu belongs to another shell"));
            }
        }

        let old = self.inner.state.lock().menu.take();
        if let Some(old) = &old {
            old.inner().state.lock().parent_item = None;
        }
        let Some(menu) = menu else {
            return self.inner.core.apply(NativeCommand::AttachSubmenu(None));
        };

        if let Some(previous) = menu.inner().parent_item() {
            previous.inner.state.lock().menu = None;
            previous
                .inner
                .core
                .apply(NativeCommand::AttachSubmenu(None))?;
        }
        menu.inner().state.lock().parent_item = Some(Arc::downgrade(&self.inner));
        self.inner.state.lock().menu = Some(menu.clone());
        self.inner
            .core
            .apply(NativeCommand::AttachSubmenu(menu.core().handle()))
    }

    pub(crate) fn from_inner(inner: Arc<MenuItemInner>) -> Self {
        Self { inner }
    }
}

impl MenuItemInner {
    fn parent_menu(&self) -> Option<Menu> {
        self.parent.upgrade().map(Menu::from_inner)
    }

    fn is_toggle(&self) -> bool {
        let style = self.core.style();
        style.has(Style::CHECK) || style.has(Style::RADIO)
    }

    fn store_selection(&self, selected: bool) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.selection == selected {
                return Ok(());
            }
            state.selection = selected;
        }
        self.core.apply(NativeCommand::SetChecked(selected))
    }

    /// Forget `menu`, which is being disposed.
    pub(crate) fn detach_menu(&self, menu: WidgetId) {
        let mut state = self.state.lock();
        if state.menu.as_ref().is_some_and(|current| current.core().id() == menu) {
            state.menu = None;
        }
    }

    /// Select this item and deselect the radio items adjacent to it.
    fn select_radio(&self) -> Result<()> {
        let siblings = match self.parent_menu() {
            Some(menu) => menu.inner().state.lock().items.clone(),
            None => Vec::new(),
        };
        if let Some(position) = siblings.iter().position(|item| item.core().id() == self.core.id()) {
            let is_radio = |item: &&MenuItem| item.inner.core.style().has(Style::RADIO);
            let before = siblings[..position].iter().rev().take_while(is_radio);
            let after = siblings[position + 1..].iter().take_while(is_radio);
            for sibling in before.chain(after) {
                sibling.inner.store_selection(false)?;
            }
        }
        self.store_selection(true)
    }

    fn activate(&self) -> Result<()> {
        let (enabled, has_menu) = {
            let state = self.state.lock();
            (state.enabled, state.menu.is_some())
        };
        let style = self.core.style();
        if !enabled || (style.has(Style::CASCADE) && has_menu) {
            return Ok(());
        }
        if style.has(Style::CHECK) {
            let selected = !self.state.lock().selection;
            self.store_selection(selected)?;
        } else if style.has(Style::RADIO) {
            self.select_radio()?;
        }
        self.core.post_event(Event::new(EventType::Selection))
    }
}

impl NativeWidget for MenuItemInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::MenuItem => ITEM_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::Activate => self.activate(),
            NativeSignal::Select => {
                self.core.send_event(Event::new(EventType::Arm))?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn release_widget(&self) {
        let menu = self.state.lock().menu.take();
        if let Some(menu) = menu {
            menu.inner().state.lock().parent_item = None;
            if let Err(err) = menu.core().dispose() {
                tracing::warn!(target: targets::WIDGET, id = ?menu.core().id(), error = %err, "cascade menu disposal failed");
            }
        }
        if let Some(parent) = self.parent.upgrade() {
            parent.remove_item(self.core.id());
        }
    }
}

impl Widget for MenuItem {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for MenuItem {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuItem")
            .field("core", &self.inner.core)
            .finish()
    }
}
