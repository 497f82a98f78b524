//! Display configuration.
//!
//! [`DisplayConfig`] tunes a display's event loop. It can be built in code or
//! loaded from TOML; every field is optional in the file.
//!
//! ```toml
//! app_name = "inventory"
//! sleep_timeout_ms = 250
//! deferred_event_limit = 512
//! trace_native_events = true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default bound on queued deferred events.
pub const DEFAULT_DEFERRED_EVENT_LIMIT: usize = 1024;

/// Configuration for a [`crate::Display`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// The application name reported to the native toolkit.
    pub app_name: Option<String>,
    /// Upper bound for one [`crate::Display::sleep`] wait, in milliseconds.
    ///
    /// `None` sleeps until woken or until the next timer is due.
    pub sleep_timeout_ms: Option<u64>,
    /// Maximum number of deferred events held at once. Further posts are
    /// dropped with a warning.
    pub deferred_event_limit: usize,
    /// Log every native event at trace level.
    pub trace_native_events: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            app_name: None,
            sleep_timeout_ms: None,
            deferred_event_limit: DEFAULT_DEFERRED_EVENT_LIMIT,
            trace_native_events: false,
        }
    }
}

impl DisplayConfig {
    /// Create a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Bound each sleep by `timeout`.
    pub fn with_sleep_timeout(mut self, timeout: Duration) -> Self {
        self.sleep_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set the deferred event bound.
    pub fn with_deferred_event_limit(mut self, limit: usize) -> Self {
        self.deferred_event_limit = limit;
        self
    }

    /// Enable or disable native event tracing.
    pub fn with_native_event_tracing(mut self, enabled: bool) -> Self {
        self.trace_native_events = enabled;
        self
    }

    /// The sleep bound as a duration.
    pub fn sleep_timeout(&self) -> Option<Duration> {
        self.sleep_timeout_ms.map(Duration::from_millis)
    }

    /// Check the configuration for values the event loop cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.deferred_event_limit == 0 {
            return Err(Error::Config(
                "deferred_event_limit must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
