//! Thread affinity checks.
//!
//! Each display is bound to the thread that created it, its UI thread. Every
//! widget and display operation except the synchronizer entry points verifies
//! the calling thread against that affinity and fails with
//! [`Error::ThreadInvalidAccess`] otherwise.
//!
//! ```ignore
//! use horizon_bridge_core::thread_check::ThreadAffinity;
//!
//! struct Surface {
//!     affinity: ThreadAffinity,
//! }
//!
//! impl Surface {
//!     fn redraw(&self) -> Result<()> {
//!         self.affinity.check()?;
//!         // ... safe to touch native state ...
//!         Ok(())
//!     }
//! }
//! ```

use std::thread::ThreadId;

use crate::error::{Error, Result};

/// The thread an object is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// The bound thread.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether the calling thread is the bound thread.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Fail with [`Error::ThreadInvalidAccess`] off the bound thread.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_same_thread() {
            Ok(())
        } else {
            tracing::debug!(
                target: crate::logging::targets::THREAD,
                expected = ?self.thread_id,
                actual = ?std::thread::current().id(),
                "invalid thread access"
            );
            Err(Error::ThreadInvalidAccess)
        }
    }

    /// Panic in debug builds when called off the bound thread.
    #[inline]
    pub fn debug_assert_same_thread(&self) {
        debug_assert!(
            self.is_same_thread(),
            "called from thread {:?}, expected {:?}",
            std::thread::current().id(),
            self.thread_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_thread() {
        let affinity = ThreadAffinity::current();
        assert!(affinity.is_same_thread());
        assert!(affinity.check().is_ok());
        affinity.debug_assert_same_thread();
    }

    #[test]
    fn test_other_thread() {
        let affinity = ThreadAffinity::current();
        let result = std::thread::spawn(move || (affinity.is_same_thread(), affinity.check()))
            .join()
            .unwrap();
        assert!(!result.0);
        assert!(matches!(result.1, Err(Error::ThreadInvalidAccess)));
    }
}
