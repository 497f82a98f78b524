//! Top-level window.
//!
//! A [`Shell`] is the root of a widget tree. Controls, menus and tooltips
//! are created with a shell as their parent and are disposed with it.
//!
//! # Example
//!
//! ```ignore
//! let shell = Shell::new(&display, Style::NONE)?;
//! shell.set_text("Settings")?;
//! shell.on(EventType::Close, |event| event.doit = confirm_close())?;
//! shell.open()?;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_bridge_core::{
    Display, Error, Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal,
    NativeWidget, Result, SignalKind, Style, Widget, WidgetBuilder, WidgetCore,
};

use super::{Menu, check_orientation, direction_of, orientation_of, send_input_event};

const SHELL_SIGNALS: &[SignalKind] = &[
    SignalKind::DeleteRequest,
    SignalKind::Show,
    SignalKind::Hide,
    SignalKind::FocusIn,
    SignalKind::FocusOut,
    SignalKind::KeyPress,
];

#[derive(Default)]
struct ShellState {
    text: String,
    visible: bool,
    menu_bar: Option<Menu>,
}

pub(crate) struct ShellInner {
    core: WidgetCore,
    orientation: Mutex<Style>,
    state: Mutex<ShellState>,
}

/// A top-level window.
#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

impl Shell {
    /// Create a shell on `display`.
    pub fn new(display: &Display, style: Style) -> Result<Self> {
        let style = check_orientation(style);
        let inner = WidgetBuilder::new(display, "Shell", style)
            .handle(HandleClass::Window)
            .build(|core| ShellInner {
                core,
                orientation: Mutex::new(orientation_of(style)),
                state: Mutex::new(ShellState::default()),
            })?;
        if style.has(Style::RIGHT_TO_LEFT) {
            inner.core.apply(NativeCommand::SetDirection(direction_of(style)))?;
        }
        Ok(Self { inner })
    }

    /// The title text.
    pub fn text(&self) -> Result<String> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text.clone())
    }

    /// Set the title text.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        let text = text.into();
        self.inner.state.lock().text = text.clone();
        self.inner.core.apply(NativeCommand::SetText(text))
    }

    /// Whether the shell is visible.
    pub fn is_visible(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().visible)
    }

    /// Show or hide the shell, sending `Show` or `Hide` on a change.
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

    /// Make the shell visible.
    pub fn open(&self) -> Result<()> {
        self.set_visible(true)
    }

    /// Request that the shell close.
    ///
    /// Sends `Close` and disposes the shell unless a listener cleared
    /// `doit`. Returns whether the shell was disposed.
    pub fn close(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        self.inner.close()
    }

    /// The menu bar, if one is set.
    pub fn menu_bar(&self) -> Result<Option<Menu>> {
        self.inner.core.check_widget()?;
        let menu_bar = self.inner.state.lock().menu_bar.clone();
        Ok(menu_bar.filter(|menu| !menu.core().is_disposed()))
    }

    /// Set or clear the menu bar.
    ///
    /// The menu must be a `BAR` menu created for this shell.
    pub fn set_menu_bar(&self, menu: Option<&Menu>) -> Result<()> {
        self.inner.core.check_widget()?;
        let handle = match menu {
            Some(menu) => {
                menu.core().check_widget()?;
                if !menu.core().style().has(Style::BAR) {
                    return Err(Error::InvalidArgument("menu is not a menu bar"));
                }
                if menu.shell_id() != self.inner.core.id() {
                    return Err(Error::InvalidArgument("menu belongs to another shell"));
                }
                menu.core().handle()
            }
            None => None,
        };
        self.inner.state.lock().menu_bar = menu.cloned();
        self.inner.core.apply(NativeCommand::SetMenuBar(handle))
    }

    /// The orientation, `LEFT_TO_RIGHT` or `RIGHT_TO_LEFT`.
    pub fn orientation(&self) -> Result<Style> {
        self.inner.core.check_widget()?;
        Ok(*self.inner.orientation.lock())
    }

    /// Change the orientation. Other values are ignored.
    pub fn set_orientation(&self, orientation: Style) -> Result<()> {
        self.inner.core.check_widget()?;
        if orientation != Style::LEFT_TO_RIGHT && orientation != Style::RIGHT_TO_LEFT {
            return Ok(());
        }
        *self.inner.orientation.lock() = orientation;
        self.inner
            .core
            .apply(NativeCommand::SetDirection(direction_of(orientation)))
    }

    pub(crate) fn from_inner(inner: Arc<ShellInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<ShellInner> {
        Arc::downgrade(&self.inner)
    }
}

impl ShellInner {
    fn close(&self) -> Result<bool> {
        let event = self.core.send_event(Event::new(EventType::Close))?;
        if event.doit {
            self.core.dispose()?;
        }
        Ok(event.doit)
    }
}

impl NativeWidget for ShellInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::Window => SHELL_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::DeleteRequest => {
                self.close()?;
            }
            NativeSignal::Show | NativeSignal::Hide => {
                let visible = matches!(signal, NativeSignal::Show);
                {
                    let mut state = self.state.lock();
                    if state.visible == visible {
                        return Ok(());
                    }
                    state.visible = visible;
                }
                let event_type = if visible {
                    EventType::Show
                } else {
                    EventType::Hide
                };
                self.core.send_event(Event::new(event_type))?;
            }
            other => {
                send_input_event(&self.core, other)?;
            }
        }
        Ok(())
    }

    fn release_widget(&self) {
        self.state.lock().menu_bar = None;
    }
}

impl Widget for Shell {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for Shell {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell").field("core", &self.inner.core).finish()
    }
}
