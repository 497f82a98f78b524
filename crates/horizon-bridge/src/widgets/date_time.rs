//! DateTime widget for picking dates and times.
//!
//! The style picks the editor:
//!
//! - `DATE` - a date field (default)
//! - `TIME` - a time-of-day field
//! - `CALENDAR` - a month calendar
//!
//! `SHORT`, `MEDIUM` and `LONG` select the display format. Months are
//! 1-based, as in [`chrono`]. Years are limited to 1752 through 9999, the
//! range of the Gregorian calendar the widget edits.
//!
//! Setters that would produce an invalid date or time are ignored rather
//! than rejected, matching the native editors.
//!
//! # Example
//!
//! ```ignore
//! let picker = DateTime::new(&shell, Style::CALENDAR)?;
//! picker.set_date(2024, 2, 29)?;
//! picker.on(EventType::Selection, |_| println!("date changed"))?;
//! ```

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, NaiveTime, Timelike};
use parking_lot::Mutex;

use horizon_bridge_core::logging::targets;
use horizon_bridge_core::{
    Event, EventType, Handle, HandleClass, NativeCommand, NativeSignal, NativeWidget, Result,
    SignalKind, Style, Widget, WidgetBuilder, WidgetCore,
};

use super::{check_orientation, direction_of, finish_create, send_input_event};

/// The earliest year the widget accepts.
pub const MIN_YEAR: i32 = 1752;
/// The latest year the widget accepts.
pub const MAX_YEAR: i32 = 9999;

const CALENDAR_SIGNALS: &[SignalKind] = &[
    SignalKind::DateChanged,
    SignalKind::Activate,
    SignalKind::KeyPress,
    SignalKind::FocusIn,
    SignalKind::FocusOut,
];
const FIELD_SIGNALS: &[SignalKind] = &[
    SignalKind::DateChanged,
    SignalKind::TimeChanged,
    SignalKind::Activate,
    SignalKind::KeyPress,
    SignalKind::ButtonPress,
    SignalKind::FocusIn,
    SignalKind::FocusOut,
];

struct DateTimeInner {
    core: WidgetCore,
    state: Mutex<(NaiveDate, NaiveTime)>,
}

/// A date, time or calendar picker.
#[derive(Clone)]
pub struct DateTime {
    inner: Arc<DateTimeInner>,
}

impl DateTime {
    /// Create a picker inside `parent`, showing the current local date and
    /// time.
    pub fn new(parent: &impl Widget, style: Style) -> Result<Self> {
        let display = parent.core().check_widget()?;
        let style = check_orientation(
            style
                .check_bits(&[Style::DATE, Style::TIME, Style::CALENDAR])
                .check_bits(&[Style::MEDIUM, Style::SHORT, Style::LONG]),
        );
        let class = if style.has(Style::CALENDAR) {
            HandleClass::Calendar
        } else {
            HandleClass::SpinButton
        };

        let now = Local::now().naive_local();
        let time = now.time().with_nanosecond(0).unwrap_or(now.time());
        let inner = WidgetBuilder::new(&display, "DateTime", style)
            .parent(parent.core())
            .handle(class)
            .build(|core| DateTimeInner {
                core,
                state: Mutex::new((now.date(), time)),
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

    /// The selected date.
    pub fn date(&self) -> Result<NaiveDate> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().0)
    }

    /// The selected time of day.
    pub fn time(&self) -> Result<NaiveTime> {
        self.inner.core.check_widget()?;
        Ok(self.inner.state.lock().1)
    }

    /// The year.
    pub fn year(&self) -> Result<i32> {
        Ok(self.date()?.year())
    }

    /// The month, 1 through 12.
    pub fn month(&self) -> Result<u32> {
        Ok(self.date()?.month())
    }

    /// The day of the month.
    pub fn day(&self) -> Result<u32> {
        Ok(self.date()?.day())
    }

    /// The hour, 0 through 23.
    pub fn hours(&self) -> Result<u32> {
        Ok(self.time()?.hour())
    }

    /// The minute.
    pub fn minutes(&self) -> Result<u32> {
        Ok(self.time()?.minute())
    }

    /// The second.
    pub fn seconds(&self) -> Result<u32> {
        Ok(self.time()?.second())
    }

    /// Set the date. Invalid dates are ignored.
    pub fn set_date(&self, year: i32, month: u32, day: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        match valid_date(year, month, day) {
            Some(date) => self.inner.store_date(date),
            None => Ok(()),
        }
    }

    /// Set the year. Out-of-range years are ignored; a day past the end of
    /// the month (February 29th) moves to the last day.
    pub fn set_year(&self, year: i32) -> Result<()> {
        self.inner.core.check_widget()?;
        let current = self.inner.state.lock().0;
        match clamped_date(year, current.month(), current.day()) {
            Some(date) => self.inner.store_date(date),
            None => Ok(()),
        }
    }

    /// Set the month. Ignored if the current day does not exist in it.
    pub fn set_month(&self, month: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        let current = self.inner.state.lock().0;
        match valid_date(current.year(), month, current.day()) {
            Some(date) => self.inner.store_date(date),
            None => Ok(()),
        }
    }

    /// Set the day of the month. Invalid days are ignored.
    pub fn set_day(&self, day: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        let current = self.inner.state.lock().0;
        match valid_date(current.year(), current.month(), day) {
            Some(date) => self.inner.store_date(date),
            None => Ok(()),
        }
    }

    /// Set the time of day. Invalid times are ignored.
    pub fn set_time(&self, hours: u32, minutes: u32, seconds: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        match NaiveTime::from_hms_opt(hours, minutes, seconds) {
            Some(time) => self.inner.store_time(time),
            None => Ok(()),
        }
    }

    /// Set the hour. Invalid hours are ignored.
    pub fn set_hours(&self, hours: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        let time = self.inner.state.lock().1;
        match time.with_hour(hours) {
            Some(time) => self.inner.store_time(time),
            None => Ok(()),
        }
    }

    /// Set the minute. Invalid minutes are ignored.
    pub fn set_minutes(&self, minutes: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        let time = self.inner.state.lock().1;
        match time.with_minute(minutes) {
            Some(time) => self.inner.store_time(time),
            None => Ok(()),
        }
    }

    /// Set the second. Invalid seconds are ignored.
    pub fn set_seconds(&self, seconds: u32) -> Result<()> {
        self.inner.core.check_widget()?;
        let time = self.inner.state.lock().1;
        match time.with_second(seconds) {
            Some(time) => self.inner.store_time(time),
            None => Ok(()),
        }
    }
}

impl DateTimeInner {
    fn store_date(&self, date: NaiveDate) -> Result<()> {
        self.state.lock().0 = date;
        self.core.apply(NativeCommand::SetDate {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        })
    }

    fn store_time(&self, time: NaiveTime) -> Result<()> {
        self.state.lock().1 = time;
        self.core.apply(NativeCommand::SetTime {
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
        })
    }
}

impl NativeWidget for DateTimeInner {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn signals(&self, class: HandleClass) -> &'static [SignalKind] {
        match class {
            HandleClass::Calendar => CALENDAR_SIGNALS,
            HandleClass::SpinButton => FIELD_SIGNALS,
            _ => &[],
        }
    }

    fn handle_signal(&self, _handle: Handle, signal: &NativeSignal) -> Result<()> {
        match signal {
            NativeSignal::DateChanged { year, month, day } => {
                let Some(date) = valid_date(*year, *month, *day) else {
                    tracing::debug!(target: targets::WIDGET, year, month, day, "ignoring invalid native date");
                    return Ok(());
                };
                {
                    let mut state = self.state.lock();
                    if state.0 == date {
                        return Ok(());
                    }
                    state.0 = date;
                }
                self.core.post_event(Event::new(EventType::Selection))
            }
            NativeSignal::TimeChanged {
                hour,
                minute,
                second,
            } => {
                let Some(time) = NaiveTime::from_hms_opt(*hour, *minute, *second) else {
                    return Ok(());
                };
                {
                    let mut state = self.state.lock();
                    if state.1 == time {
                        return Ok(());
                    }
                    state.1 = time;
                }
                self.core.post_event(Event::new(EventType::Selection))
            }
            NativeSignal::Activate => {
                self.core.send_event(Event::new(EventType::DefaultSelection))?;
                Ok(())
            }
            other => send_input_event(&self.core, other).map(|_| ()),
        }
    }
}

impl Widget for DateTime {
    fn core(&self) -> &WidgetCore {
        &self.inner.core
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateTime")
            .field("core", &self.inner.core)
            .finish()
    }
}

fn valid_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    (1..=day)
        .rev()
        .take(4)
        .find_map(|day| valid_date(year, month, day))
}
