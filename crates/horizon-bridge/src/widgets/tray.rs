//! The system tray.
//!
//! Each display has at most one [`Tray`], obtained with [`Tray::system`].
//! It has no native handle of its own; every [`TrayItem`] owns a status
//! icon.
//!
//! A click on an icon sends `Selection`, a double click sends
//! `DefaultSelection`, and a context-menu request sends `MenuDetect` with
//! the pointer location, so the application can open a pop-up
//! [`Menu`](super::Menu) there.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_bridge_core::logging::targets;
use horizon_bridge_core::{
    Display, Error, Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal,
    NativeWidget, Result, SignalKind, Style, Widget, WidgetBuilder, WidgetCore,
};

use super::{ToolTip, check_index, to_count, to_index};

/// Display data key under which the tray is kept.
const TRAY_KEY: &str = "horizon_bridge.tray";

const ITEM_SIGNALS: &[SignalKind] = &[
    SignalKind::Activate,
    SignalKind::ButtonPress,
    SignalKind::PopupMenu,
];

struct TrayInner {
    core: WidgetCore,
    items: Mutex<Vec<TrayItem>>,
}

/// The display's system tray.
#[derive(Clone)]
pub struct Tray {
    inner: Arc<TrayInner>,
}

impl Tray {
    /// The tray of `display`, created on first use.
    pub fn system(display: &Display) -> Result<Self> {
        if let Some(tray) = display.data_for::<Tray>(TRAY_KEY)?
            && !tray.inner.core.is_disposed()
        {
            return Ok(Tray::clone(&tray));
        }
        let inner = WidgetBuilder::new(display, "Tray", Style::NONE).build(|core| TrayInner {
            core,
            items: Mutex::new(Vec::new()),
        })?;
        let tray = Self { inner };
        display.set_data_for(TRAY_KEY, tray.clone())?;
        tracing::debug!(target: targets::WIDGET, id = ?tray.inner.core.id(), "system tray created");
        Ok(tray)
    }

    /// The item at `index`.
    pub fn item(&self, index: i32) -> Result<TrayItem> {
        self.inner.core.check_widget()?;
        let items = self.inner.items.lock();
        let index = check_index(index, items.len())?;
        Ok(items[index].clone())
    }

    /// Every item, in creation order.
    pub fn items(&self) -> Result<Vec<TrayItem>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.items.lock().clone())
    }

    /// The number of items.
    pub fn item_count(&self) -> Result<i32> {
        self.inner.core.check_widget()?;
        Ok(to_count(self.inner.items.lock().len()))
    }

    /// The position of `item`, or `-1`.
    pub fn index_of(&self, item: &TrayItem) -> Result<i32> {
        self.inner.core.check_widget()?;
        let items = self.inner.items.lock();
        Ok(to_index(items.iter().position(|i| i == item)))
    }
}

impl NativeWidget for TrayInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn release_widget(&self) {
        self.items.lock().clear();
    }
}

impl Widget for Tray {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for Tray {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Tray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tray").field("core", &self.inner.core).finish()
    }
}

// ============================================================================
// TrayItem
// ============================================================================

struct TrayItemState {
    tool_tip_text: Option<String>,
    visible: bool,
    tool_tip: Option<ToolTip>,
}

struct TrayItemInner {
    core: WidgetCore,
    parent: Weak<TrayInner>,
    state: Mutex<TrayItemState>,
}

/// An icon in the [`Tray`].
#[derive(Clone)]
pub struct TrayItem {
    inner: Arc<TrayItemInner>,
}

impl TrayItem {
    /// Add a visible icon to `parent`.
    pub fn new(parent: &Tray, style: Style) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let inner = WidgetBuilder::new(&display, "TrayItem", style)
            .parent(parent.core())
            .handle(HandleClass::StatusIcon)
            .build(|core| TrayItemInner {
                core,
                parent: Arc::downgrade(&parent.inner),
                state: Mutex::new(TrayItemState {
                    tool_tip_text: None,
                    visible: true,
                    tool_tip: None,
                }),
            })?;
        let item = Self { inner };
        parent.inner.items.lock().push(item.clone());
        Ok(item)
    }

    /// The tray containing this item.
    pub fn parent(&self) -> Result<Tray> {
        self.inner.core.check_widget()?;
        self.inner
            .parent
            .upgrade()
            .map(|inner| Tray { inner })
            .ok_or(Error::WidgetDisposed)
    }

    /// The text shown when hovering the icon.
    pub fn tool_tip_text(&self) -> Result<Option<String>> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().tool_tip_text.clone())
    }

    /// Set or clear the hover text.
    pub fn set_tool_tip_text(&self, text: Option<&str>) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().tool_tip_text = text.map(str::to_owned);
        self.inner
            .core
            .apply(NativeCommand::SetText(text.unwrap_or_default().to_owned()))
    }

    /// Whether the icon is shown.
    pub fn is_visible(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().visible)
    }

    /// Show or hide the icon. Sends `Show` or `Hide` when it changes.
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.inner.core.check_widget()?;
        {
            let mut state = self.inner.state.lock();
            if state.visible == visible {
                return Ok(());
            }
            state.visible = visible;
        }
        self.inner.core.apply(NativeCommand::SetVisible(visible))?;
        let event_type = if visible {
            EventType::Show
        } else {
            EventType::Hide
        };
        self.inner.core.send_event(Event::new(event_type))?;
        Ok(())
    }

    /// The attached balloon tooltip.
    pub fn tool_tip(&self) -> Result<Option<ToolTip>> {
        self.inner.core.check_widget()?;
        let tool_tip = self.inner.state.lock().tool_tip.clone();
        Ok(tool_tip.filter(|tool_tip| !tool_tip.core().is_disposed()))
    }

    /// Attach or detach a tooltip shown next to the icon.
    pub fn set_tool_tip(&self, tool_tip: Option<&ToolTip>) -> Result<()> {
        self.inner.core.check_widget()?;
        let handle = match tool_tip {
            Some(tool_tip) => {
                tool_tip.core().check_widget()?;
                tool_tip.core().handle()
            }
            None => None,
        };
        self.inner.state.lock().tool_tip = tool_tip.cloned();
        self.inner.core.apply(NativeCommand::AttachToolTip(handle))
    }
}

impl TrayItemInner {
    fn on_button_press(&self, count: u32) -> Result<()> {
        if count == 2 {
            self.core
                .send_event(Event::new(EventType::DefaultSelection))?;
        }
        Ok(())
    }
}

impl NativeWidget for TrayItemInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::StatusIcon => ITEM_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::Activate => {
                self.core.send_event(Event::new(EventType::Selection))?;
                Ok(())
            }
            NativeSignal::ButtonPress { count, .. } => self.on_button_press(*count),
            NativeSignal::PopupMenu { x, y } => {
                self.core
                    .send_event(Event::new(EventType::MenuDetect).with_location(*x, *y))?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn release_widget(&self) {
        self.state.lock().tool_tip = None;
        if let Some(tray) = self.parent.upgrade() {
            let id = self.core.id();
            tray.items.lock().retain(|item| item.inner.core.id() != id);
        }
    }
}

impl Widget for TrayItem {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for TrayItem {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for TrayItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrayItem")
            .field("core", &self.inner.core)
            .finish()
    }
}
