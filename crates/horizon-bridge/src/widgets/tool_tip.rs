//! Tooltips.
//!
//! A [`ToolTip`] is a small window owned by a [`Shell`], shown on demand at
//! a location. `BALLOON` tooltips draw a pointer towards the location; at
//! most one of `ICON_ERROR`, `ICON_INFORMATION` and `ICON_WARNING` selects
//! the icon. With auto-hide on (the default) a shown tooltip hides itself
//! after [`AUTO_HIDE_DELAY`].
//!
//! A tooltip can also be attached to a [`TrayItem`](super::TrayItem), which
//! then positions it next to the tray icon.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use horizon_bridge_core::logging::targets;
use horizon_bridge_core::{
    Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal, NativeWidget, Result,
    SignalKind, Style, TimerId, Widget, WidgetBuilder, WidgetCore,
};

use super::Shell;

/// How long an auto-hiding tooltip stays visible.
pub const AUTO_HIDE_DELAY: Duration = Duration::from_secs(5);

const TOOL_TIP_SIGNALS: &[SignalKind] = &[SignalKind::Clicked, SignalKind::Hide];

const ICON_STYLES: [Style; 3] = [Style::ICON_ERROR, Style::ICON_INFORMATION, Style::ICON_WARNING];

struct ToolTipState {
    text: String,
    message: String,
    visible: bool,
    auto_hide: bool,
    location: (i32, i32),
    hide_timer: Option<TimerId>,
}

struct ToolTipInner {
    core: WidgetCore,
    state: Mutex<ToolTipState>,
}

/// A tooltip window.
#[derive(Clone)]
pub struct ToolTip {
    inner: Arc<ToolTipInner>,
}

/// Keep the first icon bit of `style` and clear the others.
fn check_icon(style: Style) -> Style {
    if ICON_STYLES.iter().any(|icon| style.has(*icon)) {
        style.check_bits(&ICON_STYLES)
    } else {
        style
    }
}

impl ToolTip {
    /// Create a hidden tooltip owned by `parent`.
    pub fn new(parent: &Shell, style: Style) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let inner = WidgetBuilder::new(&display, "ToolTip", check_icon(style))
            .parent(parent.core())
            .handle(HandleClass::TooltipWindow)
            .build(|core| ToolTipInner {
                core,
                state: Mutex::new(ToolTipState {
                    text: String::new(),
                    message: String::new(),
                    visible: false,
                    auto_hide: true,
                    location: (0, 0),
                    hide_timer: None,
                }),
            })?;
        Ok(Self { inner })
    }

    /// The title.
    pub fn text(&self) -> Result<String> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().text.clone())
    }

    /// Set the title.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        let text = text.into();
        self.inner.state.lock().text.clone_from(&text);
        self.inner.core.apply(NativeCommand::SetText(text))
    }

    /// The body text.
    pub fn message(&self) -> Result<String> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().message.clone())
    }

    /// Set the body text.
    pub fn set_message(&self, message: impl Into<String>) -> Result<()> {
        self.inner.core.check_widget()?;
        let message = message.into();
        self.inner.state.lock().message.clone_from(&message);
        self.inner.core.apply(NativeCommand::SetMessage(message))
    }

    /// Whether the tooltip hides itself after a delay.
    pub fn auto_hide(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().auto_hide)
    }

    /// Turn auto-hide on or off. Turning it off keeps a visible tooltip up.
    pub fn set_auto_hide(&self, auto_hide: bool) -> Result<()> {
        let display = self.inner.core.check_widget()?;
        let timer = {
            let mut state = self.inner.state.lock();
            state.auto_hide = auto_hide;
            if auto_hide { None } else { state.hide_timer.take() }
        };
        if let Some(timer) = timer {
            display.cancel_timer(timer)?;
        }
        self.inner.core.apply(NativeCommand::SetAutoHide(auto_hide))
    }

    /// Where the tooltip points, in display coordinates.
    pub fn location(&self) -> Result<(i32, i32)> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().location)
    }

    /// Move the tooltip.
    pub fn set_location(&self, x: i32, y: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        self.inner.state.lock().location = (x, y);
        self.inner.core.apply(NativeCommand::SetLocation { x, y })
    }

    /// Whether the tooltip is showing.
    pub fn is_visible(&self) -> Result<bool> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().visible)
    }

    /// Show or hide the tooltip.
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        let display = self.inner.core.check_widget()?;
        let (changed, stale, auto_hide) = {
            let mut state = self.inner.state.lock();
            let changed = state.visible != visible;
            state.visible = visible;
            (changed, state.hide_timer.take(), state.auto_hide)
        };
        if let Some(timer) = stale {
            display.cancel_timer(timer)?;
        }
        if changed {
            self.inner.core.apply(NativeCommand::SetVisible(visible))?;
        }
        if visible && auto_hide {
            let weak = Arc::downgrade(&self.inner);
            let timer = display.timer_exec(AUTO_HIDE_DELAY, move || hide_expired(&weak))?;
            self.inner.state.lock().hide_timer = Some(timer);
        }
        Ok(())
    }
}

/// Timer callback of an auto-hiding tooltip.
fn hide_expired(weak: &Weak<ToolTipInner>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if inner.core.is_disposed() {
        return;
    }
    {
        let mut state = inner.state.lock();
        state.hide_timer = None;
        if !state.visible {
            return;
        }
        state.visible = false;
    }
    if let Err(err) = inner.core.apply(NativeCommand::SetVisible(false)) {
        tracing::warn!(target: targets::WIDGET, id = ?inner.core.id(), error = %err, "failed to hide tooltip");
    }
}

impl NativeWidget for ToolTipInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::TooltipWindow => TOOL_TIP_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::Clicked => {
                self.core.send_event(Event::new(EventType::Selection))?;
                Ok(())
            }
            NativeSignal::Hide => {
                self.state.lock().visible = false;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn release_widget(&self) {
        let timer = self.state.lock().hide_timer.take();
        if let (Some(timer), Ok(display)) = (timer, self.core.display()) {
            let _ = display.cancel_timer(timer);
        }
    }
}

impl Widget for ToolTip {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for ToolTip {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ToolTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolTip").field("core", &self.inner.core).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_bridge_core::{
        Display, DisplayRegistry, Disposable, EventSource, HeadlessController, HeadlessToolkit,
        NativeHandleOwner,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup(style: Style) -> (DisplayRegistry, Display, HeadlessController, ToolTip) {
        let registry = DisplayRegistry::new();
        let toolkit = HeadlessToolkit::new();
        let controller = toolkit.controller();
        let display = Display::builder(&registry).toolkit(toolkit).build().unwrap();
        let shell = Shell::new(&display, Style::NONE).unwrap();
        let tool_tip = ToolTip::new(&shell, style).unwrap();
        (registry, display, controller, tool_tip)
    }

    #[test]
    fn test_icon_styles_are_exclusive() {
        assert_eq!(check_icon(Style::BALLOON), Style::BALLOON);
        let style = check_icon(Style::ICON_WARNING | Style::ICON_ERROR | Style::BALLOON);
        assert!(style.has(Style::ICON_ERROR));
        assert!(!style.has(Style::ICON_WARNING));
        assert!(style.has(Style::BALLOON));
    }

    #[test]
    fn test_text_message_location() {
        let (_registry, display, controller, tool_tip) = setup(Style::BALLOON);
        let handle = tool_tip.handle().unwrap().unwrap();
        assert_eq!(
            controller.class_of(handle),
            Some(HandleClass::TooltipWindow)
        );
        tool_tip.set_text("Update").unwrap();
        tool_tip.set_message("A new version is available").unwrap();
        assert_eq!(tool_tip.text().unwrap(), "Update");
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetMessage("A new version is available".into()))
        );
        tool_tip.set_location(40, 12).unwrap();
        assert_eq!(tool_tip.location().unwrap(), (40, 12));
        display.dispose().unwrap();
    }

    #[test]
    fn test_visibility_without_auto_hide() {
        let (_registry, display, controller, tool_tip) = setup(Style::NONE);
        let handle = tool_tip.handle().unwrap().unwrap();
        assert!(tool_tip.auto_hide().unwrap());
        tool_tip.set_auto_hide(false).unwrap();
        tool_tip.set_visible(true).unwrap();
        assert!(tool_tip.is_visible().unwrap());
        assert_eq!(
            controller.last_command(handle),
            Some(NativeCommand::SetVisible(true))
        );

        controller.emit(handle, NativeSignal::Hide);
        while display.read_and_dispatch().unwrap() {}
        assert!(!tool_tip.is_visible().unwrap());
        display.dispose().unwrap();
    }

    #[test]
    fn test_hide_timer_expires() {
        let (_registry, display, _controller, tool_tip) = setup(Style::NONE);
        tool_tip.set_visible(true).unwrap();
        let weak = Arc::downgrade(&tool_tip.inner);
        hide_expired(&weak);
        assert!(!tool_tip.is_visible().unwrap());
        display.dispose().unwrap();
    }

    #[test]
    fn test_click_sends_selection() {
        let (_registry, display, controller, tool_tip) = setup(Style::BALLOON);
        let handle = tool_tip.handle().unwrap().unwrap();
        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = clicks.clone();
        tool_tip
            .on(EventType::Selection, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        controller.emit(handle, NativeSignal::Clicked);
        while display.read_and_dispatch().unwrap() {}
        assert_eq!(clicks.load(Ordering::SeqCst), 1);

        tool_tip.dispose().unwrap();
        assert!(!controller.is_alive(handle));
        display.dispose().unwrap();
    }
}
