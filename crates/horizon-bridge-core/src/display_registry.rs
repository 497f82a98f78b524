//! Tracking of live displays.
//!
//! A [`DisplayRegistry`] enforces one live display per thread and an optional
//! limit on the total number of displays. It also remembers the default
//! display, created on demand by [`DisplayRegistry::get_or_create_default`].
//!
//! Entries hold weak references, so the registry never keeps a display alive.

use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::display::{Display, DisplayInner};
use crate::error::{Error, Result};
use crate::logging::targets;

struct Entry {
    thread: ThreadId,
    display: Weak<DisplayInner>,
}

impl Entry {
    fn upgrade(&self) -> Option<Display> {
        self.display.upgrade().map(Display::from_inner)
    }

    fn is_live(&self) -> bool {
        self.upgrade().is_some_and(|display| !display.is_disposed())
    }
}

#[derive(Default)]
struct RegistryState {
    entries: Vec<Entry>,
    default: Option<Weak<DisplayInner>>,
    limit: Option<usize>,
}

impl RegistryState {
    fn prune(&mut self) {
        self.entries.retain(Entry::is_live);
    }
}

/// The set of live displays in a process.
#[derive(Clone, Default)]
pub struct DisplayRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl DisplayRegistry {
    /// Create an empty registry with no display limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that allows at most `limit` live displays.
    pub fn with_limit(limit: usize) -> Self {
        let registry = Self::default();
        registry.inner.lock().limit = Some(limit);
        registry
    }

    pub(crate) fn register(&self, display: &Display) -> Result<()> {
        let thread = thread::current().id();
        let mut state = self.inner.lock();
        state.prune();

        if state.entries.iter().any(|entry| entry.thread == thread) {
            return Err(Error::ThreadHasDisplay);
        }
        if let Some(limit) = state.limit
            && state.entries.len() >= limit
        {
            return Err(Error::TooManyDisplays { limit });
        }

        state.entries.push(Entry {
            thread,
            display: display.downgrade(),
        });
        tracing::debug!(target: targets::DISPLAY, ?thread, count = state.entries.len(), "display registered");
        Ok(())
    }

    pub(crate) fn deregister(&self, display: &Display) {
        let weak = display.downgrade();
        let mut state = self.inner.lock();
        state.entries.retain(|entry| !entry.display.ptr_eq(&weak));
        if state
            .default
            .as_ref()
            .is_some_and(|default| default.ptr_eq(&weak))
        {
            state.default = None;
        }
    }

    /// The live display bound to the calling thread.
    pub fn current(&self) -> Option<Display> {
        self.find(thread::current().id())
    }

    /// The live display bound to `thread`.
    pub fn find(&self, thread: ThreadId) -> Option<Display> {
        let state = self.inner.lock();
        state
            .entries
            .iter()
            .filter(|entry| entry.thread == thread)
            .find_map(Entry::upgrade)
            .filter(|display| !display.is_disposed())
    }

    /// The default display, if one was created and is still live.
    pub fn default_display(&self) -> Option<Display> {
        let state = self.inner.lock();
        state
            .default
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Display::from_inner)
            .filter(|display| !display.is_disposed())
    }

    /// Return the default display, creating it on the calling thread if
    /// there is none.
    pub fn get_or_create_default(&self) -> Result<Display> {
        if let Some(display) = self.default_display() {
            return Ok(display);
        }
        let display = Display::new(self)?;
        self.inner.lock().default = Some(display.downgrade());
        Ok(display)
    }

    /// The number of live displays.
    pub fn len(&self) -> usize {
        let mut state = self.inner.lock();
        state.prune();
        state.entries.len()
    }

    /// Whether no display is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DisplayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayRegistry")
            .field("live", &self.len())
            .field("limit", &self.inner.lock().limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_display_per_thread() {
        let registry = DisplayRegistry::new();
        let display = Display::new(&registry).unwrap();
        assert!(matches!(Display::new(&registry), Err(Error::ThreadHasDisplay)));
        assert_eq!(registry.current(), Some(display.clone()));

        display.dispose().unwrap();
        assert!(registry.current().is_none());
        let again = Display::new(&registry).unwrap();
        again.dispose().unwrap();
    }

    #[test]
    fn test_displays_on_other_threads() {
        let registry = DisplayRegistry::new();
        let display = Display::new(&registry).unwrap();

        let remote = registry.clone();
        let (thread, count) = thread::spawn(move || {
            let other = Display::new(&remote).unwrap();
            let found = remote.find(thread::current().id()).is_some();
            let count = remote.len();
            other.dispose().unwrap();
            (found, count)
        })
        .join()
        .unwrap();
        assert!(thread);
        assert_eq!(count, 2);
        assert_eq!(registry.len(), 1);
        display.dispose().unwrap();
    }

    #[test]
    fn test_limit() {
        let registry = DisplayRegistry::with_limit(1);
        let display = Display::new(&registry).unwrap();

        let remote = registry.clone();
        let refused = thread::spawn(move || Display::new(&remote).err())
            .join()
            .unwrap();
        assert!(matches!(refused, Some(Error::TooManyDisplays { limit: 1 })));
        display.dispose().unwrap();
    }

    #[test]
    fn test_default_display() {
        let registry = DisplayRegistry::new();
        assert!(registry.default_display().is_none());

        let display = registry.get_or_create_default().unwrap();
        assert_eq!(registry.get_or_create_default().unwrap(), display);
        assert_eq!(registry.default_display(), Some(display.clone()));

        display.dispose().unwrap();
        assert!(registry.default_display().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dropped_display_is_pruned() {
        let registry = DisplayRegistry::new();
        let display = Display::new(&registry).unwrap();
        drop(display);
        assert!(registry.is_empty());
        let replacement = Display::new(&registry).unwrap();
        replacement.dispose().unwrap();
    }
}
