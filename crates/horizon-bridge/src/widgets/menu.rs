//! Menus.
//!
//! A [`Menu`] belongs to a [`Shell`] and is disposed with it. Its style is
//! one of:
//!
//! - `BAR` - a menu bar, installed with [`Shell::set_menu_bar`]
//! - `POP_UP` - a context menu shown with [`Menu::set_visible`] (default)
//! - `DROP_DOWN` - a sub-menu, attached to a `CASCADE` [`MenuItem`]
//!
//! # Example
//!
//! ```ignore
//! let bar = Menu::new(&shell, Style::BAR)?;
//! shell.set_menu_bar(Some(&bar))?;
//!
//! let file = MenuItem::new(&bar, Style::CASCADE)?;
//! file.set_text("&File")?;
//! let file_menu = Menu::for_item(&file)?;
//! file.set_menu(Some(&file_menu))?;
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_bridge_core::{
    Error, Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal, NativeWidget,
    Result, SignalKind, Style, Widget, WidgetBuilder, WidgetCore, WidgetId,
};

use super::menu_item::MenuItemInner;
use super::shell::ShellInner;
use super::{MenuItem, Shell, to_count, to_index};

const MENU_SIGNALS: &[SignalKind] = &[SignalKind::Show, SignalKind::Hide];

#[derive(Default)]
pub(crate) struct MenuState {
    pub(crate) items: Vec<MenuItem>,
    visible: bool,
    enabled: bool,
    default_item: Option<MenuItem>,
    pub(crate) parent_item: Option<Weak<MenuItemInner>>,
}

pub(crate) struct MenuInner {
    core: WidgetCore,
    shell_id: WidgetId,
    shell: Weak<ShellInner>,
    pub(crate) state: Mutex<MenuState>,
}

/// A menu bar, pop-up menu or drop-down menu.
#[derive(Clone)]
pub struct Menu {
    inner: Arc<MenuInner>,
}

impl Menu {
    /// Create a menu for `shell`.
    ///
    /// Keeps one of `POP_UP` (default), `BAR` and `DROP_DOWN`.
    pub fn new(shell: &Shell, style: Style) -> Result<Self> {
        let display = shell.core().check_widget()?;
        let style = style.check_bits(&[Style::POP_UP, Style::BAR, Style::DROP_DOWN]);
        let inner = WidgetBuilder::new(&display, "Menu", style)
            .parent(shell.core())
            .handle(HandleClass::Menu)
            .build(|core| MenuInner {
                core,
                shell_id: shell.id(),
                shell: shell.downgrade(),
                state: Mutex::new(MenuState {
                    enabled: true,
                    ..MenuState::default()
                }),
            })?;
        Ok(Self { inner })
    }

    /// Create a drop-down menu in the same shell as `parent`.
    pub fn for_menu(parent: &Menu) -> Result<Self> {
        parent.inner.core.check_widget()?;
        Self::new(&parent.shell()?, Style::DROP_DOWN)
    }

    /// Create a drop-down menu in the same shell as `item`, ready to be
    /// attached with [`MenuItem::set_menu`].
    pub fn for_item(item: &MenuItem) -> Result<Self> {
        Self::for_menu(&item.parent()?)
    }

    /// The shell the menu belongs to.
    pub fn shell(&self) -> Result<Shell> {
        self.inner.core.check_widget()?;
        self.inner
            .shell
            .upgrade()
            .map(Shell::from_inner)
            .ok_or(Error::WidgetDisposed)
    }

    pub(crate) fn shell_id(&self) -> WidgetId {
        self.inner.shell_id
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// The item at `index`.
    pub fn item(&self, index: i32) -> Result<MenuItem> {
        self.inner.core.check_widget()?;
        let state = self.inner.state.lock();
        let index = super::check_index(index, state.items.len())?;
        Ok(state.items[index].clone())
    }

    /// Every item, in order.
    pub fn items(&self) -> Result<Vec<MenuItem>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().items.clone())
    }

    /// The number of items.
    pub fn item_count(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(to_count(self.inner.state.lock().items.len()))
    }

    /// The index of `item`, or `-1` if it is not in this menu.
    pub fn index_of(&self, item: &MenuItem) -> Result<i32> {
        self.inner.core.check_widget()?;
        item.core().check_widget()?;
        Ok(to_index(
            self.inner
                .state
                .lock()
                .items
                .iter()
                .position(|candidate| candidate == item),
        ))
    }

    /// The item marked as default, if any.
    pub fn default_item(&self) -> Result<Option<MenuItem>> {
        self.inner.core.check_widget()?;
        let item = self.inner.state.lock().default_item.clone();
        Ok(item.filter(|item| !item.core().is_disposed()))
    }

    /// Mark `item` as the default item, or clear the mark.
    ///
    /// The item must belong to this menu.
    pub fn set_default_item(&self, item: Option<&MenuItem>) -> Result<()> {
        self.inner.core.check_widget()?;
        let handle = match item {
            Some(item) => {
                item.core().check_widget()?;
                if self.index_of(item)? == -1 {
                    return Err(Error::InvalidArgument("item belongs to another menu"));
                }
                item.core().handle()
            }
            None => None,
        };
        self.inner.state.lock().default_item = item.cloned();
        self.inner.core.apply(NativeCommand::SetDefaultItem(handle))
    }

    // =========================================================================
    // Cascade
    // =========================================================================

    /// The `CASCADE` item this menu is attached to.
    pub fn parent_item(&self) -> Result<Option<MenuItem>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.parent_item())
    }

    /// The menu containing [`parent_item`](Self::parent_item).
    pub fn parent_menu(&self) -> Result<Option<Menu>> {
        match self.parent_item()? {
            Some(item) => item.parent().map(Some),
            None => Ok(None),
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Whether the menu is showing.
    pub fn is_visible(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().visible)
    }

    /// Show or hide a `POP_UP` menu. Ignored for other menus.
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        if !self.inner.core.style().has(Style::POP_UP) {
            return Ok(());
        }
        self.inner.core.apply(NativeCommand::SetVisible(visible))
    }

    /// Whether the menu is enabled.
    pub fn is_enabled(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().enabled)
    }

    /// Enable or disable the menu.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().enabled = enabled;
        self.inner.core.apply(NativeCommand::SetEnabled(enabled))
    }

    /// Move a `POP_UP` menu to a screen location. Ignored for other menus.
    pub fn set_location(&self, x: i32, y: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        if !self.inner.core.style().has(Style::POP_UP) {
            return Ok(());
        }
        self.inner.core.apply(NativeCommand::SetLocation { x, y })
    }

    pub(crate) fn from_inner(inner: Arc<MenuInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<MenuInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &MenuInner {
        &self.inner
    }
}

impl MenuInner {
    pub(crate) fn parent_item(&self) -> Option<MenuItem> {
        let parent = self.state.lock().parent_item.clone();
        parent
            .and_then(|weak| weak.upgrade())
            .map(MenuItem::from_inner)
            .filter(|item| !item.core().is_disposed())
    }

    /// Forget `item`, which is being disposed.
    pub(crate) fn remove_item(&self, id: WidgetId) {
        let mut state = self.state.lock();
        state.items.retain(|item| item.core().id() != id);
        if state.default_item.as_ref().is_some_and(|item| item.core().id() == id) {
            state.default_item = None;
        }
    }
}

impl NativeWidget for MenuInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::Menu => MENU_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        let visible = match signal {
            NativeSignal::Show => true,
            NativeSignal::Hide => false,
            _ => return Ok(()),
        };
        self.state.lock().visible = visible;
        let event_type = if visible {
            EventType::Show
        } else {
            EventType::Hide
        };
        self.core.send_event(Event::new(event_type))?;
        Ok(())
    }

    fn release_widget(&self) {
        let parent_item = {
            let mut state = self.state.lock();
            state.items.clear();
            state.default_item = None;
            state.parent_item.take()
        };
        if let Some(item) = parent_item.and_then(|weak| weak.upgrade()) {
            item.detach_menu(self.core.id());
        }
    }
}

impl Widget for Menu {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for Menu {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Menu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Menu").field("core", &self.inner.core).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_bridge_core::{
        Display, DisplayRegistry, Disposable, EventSource, HeadlessController, HeadlessToolkit,
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

    #[test]
    fn test_style_defaults_to_pop_up() {
        let (_registry, display, _controller, shell) = setup();
        let menu = Menu::new(&shell, Style::NONE).unwrap();
        assert!(menu.style().unwrap().has(Style::POP_UP));
        let bar = Menu::new(&shell, Style::BAR | Style::DROP_DOWN).unwrap();
        assert!(bar.style().unwrap().has(Style::BAR));
        assert!(!bar.style().unwrap().has(Style::DROP_DOWN));
        assert_eq!(bar.shell().unwrap(), shell);
        display.dispose().unwrap();
    }

    #[test]
    fn test_items_in_order() {
        let (_registry, display, controller, shell) = setup();
        let menu = Menu::new(&shell, Style::POP_UP).unwrap();
        let open = MenuItem::new(&menu, Style::PUSH).unwrap();
        let quit = MenuItem::new(&menu, Style::PUSH).unwrap();
        let separator = MenuItem::new_at(&menu, Style::SEPARATOR, 1).unwrap();

        assert_eq!(menu.item_count().unwrap(), 3);
        assert_eq!(menu.items().unwrap(), vec![open.clone(), separator.clone(), quit.clone()]);
        assert_eq!(menu.index_of(&quit).unwrap(), 2);
        assert!(matches!(menu.item(3), Err(Error::InvalidRange { .. })));

        let menu_handle = menu.handle().unwrap().unwrap();
        assert_eq!(
            controller.last_command(menu_handle),
            Some(NativeCommand::InsertChild {
                child: separator.handle().unwrap().unwrap(),
                index: 1
            })
        );

        separator.dispose().unwrap();
        assert_eq!(menu.items().unwrap(), vec![open, quit]);
        display.dispose().unwrap();
    }

    #[test]
    fn test_default_item_must_belong() {
        let (_registry, display, _controller, shell) = setup();
        let menu = Menu::new(&shell, Style::POP_UP).unwrap();
        let other = Menu::new(&shell, Style::POP_UP).unwrap();
        let item = MenuItem::new(&menu, Style::PUSH).unwrap();
        let stranger = MenuItem::new(&other, Style::PUSH).unwrap();

        assert!(matches!(
            menu.set_default_item(Some(&stranger)),
            Err(Error::InvalidArgument(_))
        ));
        menu.set_default_item(Some(&item)).unwrap();
        assert_eq!(menu.default_item().unwrap(), Some(item.clone()));
        item.dispose().unwrap();
        assert_eq!(menu.default_item().unwrap(), None);
        display.dispose().unwrap();
    }

    #[test]
    fn test_visibility_follows_native_show_hide() {
        let (_registry, display, controller, shell) = setup();
        let menu = Menu::new(&shell, Style::POP_UP).unwrap();
        let handle = menu.handle().unwrap().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        for event_type in [EventType::Show, EventType::Hide] {
            let events = events.clone();
            menu.on(event_type, move |event| events.lock().push(event.event_type))
                .unwrap();
        }

        menu.set_location(10, 20).unwrap();
        menu.set_visible(true).unwrap();
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetVisible(true))
        );
        controller.emit(handle, NativeSignal::Show);
        display.read_and_dispatch().unwrap();
        assert!(menu.is_visible().unwrap());
        controller.emit(handle, NativeSignal::Hide);
        display.read_and_dispatch().unwrap();
        assert!(!menu.is_visible().unwrap());
        assert_eq!(*events.lock(), vec![EventType::Show, EventType::Hide]);
        display.dispose().unwrap();
    }

    #[test]
    fn test_bar_ignores_visibility_and_location() {
        let (_registry, display, controller, shell) = setup();
        let bar = Menu::new(&shell, Style::BAR).unwrap();
        let handle = bar.handle().unwrap().unwrap();
        bar.set_visible(true).unwrap();
        bar.set_location(1, 1).unwrap();
        assert!(controller.commands(handle).is_empty());
        display.dispose().unwrap();
    }

    #[test]
    fn test_cascade_links() {
        let (_registry, display, _controller, shell) = setup();
        let bar = Menu::new(&shell, Style::BAR).unwrap();
        let file = MenuItem::new(&bar, Style::CASCADE).unwrap();
        let file_menu = Menu::for_item(&file).unwrap();
        assert!(file_menu.style().unwrap().has(Style::DROP_DOWN));
        assert_eq!(file_menu.parent_item().unwrap(), None);

        file.set_menu(Some(&file_menu)).unwrap();
        assert_eq!(file_menu.parent_item().unwrap(), Some(file.clone()));
        assert_eq!(file_menu.parent_menu().unwrap(), Some(bar.clone()));

        file_menu.dispose().unwrap();
        assert_eq!(file.menu().unwrap(), None);
        display.dispose().unwrap();
    }

    #[test]
    fn test_disposed_with_shell() {
        let (_registry, display, controller, shell) = setup();
        let menu = Menu::new(&shell, Style::POP_UP).unwrap();
        let item = MenuItem::new(&menu, Style::PUSH).unwrap();
        let handle = item.handle().unwrap().unwrap();
        shell.dispose().unwrap();
        assert!(menu.is_disposed());
        assert!(item.is_disposed());
        assert!(!controller.is_alive(handle));
        assert!(matches!(menu.items(), Err(Error::WidgetDisposed)));
        display.dispose().unwrap();
    }
}
