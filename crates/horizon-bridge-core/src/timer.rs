//! Timer queue for a display.
//!
//! Provides one-shot timed runnables that run on the UI thread from
//! `read_and_dispatch` once their deadline has passed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a scheduled timer.
    pub struct TimerId;
}

/// Deadline used for delays too long to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// A boxed timer task.
pub(crate) type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Internal timer data.
struct TimerData {
    /// When this timer fires.
    deadline: Instant,
    /// The task to run.
    task: TimerTask,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
    sequence: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.sequence == other.sequence
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        // Timers with equal deadlines fire in scheduling order.
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Manages the pending timers of one display.
pub struct TimerManager {
    /// All scheduled timers.
    timers: SlotMap<TimerId, TimerData>,
    /// Priority queue of pending fires (min-heap by fire time).
    queue: BinaryHeap<TimerQueueEntry>,
    next_sequence: u64,
}

impl TimerManager {
    /// Create a new timer manager.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Schedule `task` to run once after `delay`.
    ///
    /// Delays past the representable range are capped at roughly thirty
    /// years, so such a timer stays pending for the life of the display.
    pub(crate) fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerId {
        let now = Instant::now();
        let deadline = now
            .checked_add(delay)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let id = self.timers.insert(TimerData { deadline, task });
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(TimerQueueEntry {
            id,
            fire_time: deadline,
            sequence,
        });
        tracing::trace!(target: targets::TIMER, ?id, ?delay, "timer scheduled");
        id
    }

    /// Cancel a pending timer.
    ///
    /// Returns `false` if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(id).is_some()
    }

    /// Whether a timer is still pending.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Get the duration until the next timer fires, if any.
    ///
    /// Returns `None` if there are no pending timers.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        self.discard_cancelled();
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(Instant::now()))
    }

    /// Whether a timer is due now.
    pub fn has_expired(&mut self) -> bool {
        self.time_until_next() == Some(Duration::ZERO)
    }

    /// Remove and return the next task whose deadline has passed.
    pub(crate) fn pop_expired(&mut self) -> Option<(TimerId, TimerTask)> {
        let now = Instant::now();
        loop {
            let entry = *self.queue.peek()?;
            if entry.fire_time > now {
                return None;
            }
            self.queue.pop();
            // Cancelled timers leave stale queue entries behind.
            if let Some(timer) = self.timers.remove(entry.id) {
                debug_assert!(timer.deadline <= now);
                tracing::trace!(target: targets::TIMER, id = ?entry.id, "timer fired");
                return Some((entry.id, timer.task));
            }
        }
    }

    /// Get the number of pending timers.
    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.timers.clear();
        self.queue.clear();
    }

    fn discard_cancelled(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_delay_fires_immediately() {
        let mut timers = TimerManager::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        timers.schedule(
            Duration::ZERO,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(timers.has_expired());
        let (_, task) = timers.pop_expired().unwrap();
        task();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timers.pop_expired().is_none());
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_future_timer_waits() {
        let mut timers = TimerManager::new();
        timers.schedule(Duration::from_secs(60), Box::new(|| {}));
        assert!(timers.pop_expired().is_none());
        let wait = timers.time_until_next().unwrap();
        assert!(wait > Duration::from_secs(50));
    }

    #[test]
    fn test_unrepresentable_delay_stays_pending() {
        let mut timers = TimerManager::new();
        let id = timers.schedule(Duration::MAX, Box::new(|| {}));
        assert!(timers.is_pending(id));
        assert!(timers.pop_expired().is_none());
        assert!(timers.time_until_next().unwrap() > Duration::from_secs(60 * 60 * 24 * 365));
    }

    #[test]
    fn test_cancel() {
        let mut timers = TimerManager::new();
        let id = timers.schedule(Duration::ZERO, Box::new(|| {}));
        assert!(timers.is_pending(id));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(timers.pop_expired().is_none());
        assert_eq!(timers.time_until_next(), None);
    }

    #[test]
    fn test_equal_deadlines_keep_order() {
        let mut timers = TimerManager::new();
        let first = timers.schedule(Duration::ZERO, Box::new(|| {}));
        let second = timers.schedule(Duration::ZERO, Box::new(|| {}));
        assert_eq!(timers.pop_expired().map(|(id, _)| id), Some(first));
        assert_eq!(timers.pop_expired().map(|(id, _)| id), Some(second));
    }
}
