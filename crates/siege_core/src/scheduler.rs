//! Cancellable deferred events.
//!
//! The match controller owns one [`Scheduler`] for every delayed callback
//! (pending-hit fallbacks, enemy spawns). Entries fire in `(due, handle)`
//! order so simultaneous events resolve in the order they were scheduled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::unit::UnitId;

/// Deferred events owned by the match controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchTimer {
    /// Land a unit's pending hit if no animation event did first.
    HitFallback(UnitId),
    /// Spawn the next enemy wave member.
    EnemySpawn,
}

/// Opaque handle returned by [`Scheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventHandle(pub u64);

/// Time-ordered queue of payloads with cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler<T> {
    queue: BTreeMap<(u64, EventHandle), T>,
    due_by_handle: BTreeMap<EventHandle, u64>,
    next_handle: u64,
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            due_by_handle: BTreeMap::new(),
            next_handle: 0,
        }
    }

    /// Schedule `payload` to fire at `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, payload: T) -> EventHandle {
        let handle = EventHandle(self.next_handle);
        self.next_handle += 1;
        self.queue.insert((due_ms, handle), payload);
        self.due_by_handle.insert(handle, due_ms);
        handle
    }

    /// Remove a scheduled entry. Returns its payload if it was still pending.
    pub fn cancel(&mut self, handle: EventHandle) -> Option<T> {
        let due = self.due_by_handle.remove(&handle)?;
        self.queue.remove(&(due, handle))
    }

    /// Drop every pending entry.
    pub fn cancel_all(&mut self) {
        self.queue.clear();
        self.due_by_handle.clear();
    }

    /// Pop the earliest entry due at or before `now_ms`.
    ///
    /// Call repeatedly until `None`; entries scheduled while draining are
    /// picked up in the same pass if they are already due.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(EventHandle, T)> {
        let (&(due, handle), _) = self.queue.first_key_value()?;
        if due > now_ms {
            return None;
        }
        self.due_by_handle.remove(&handle);
        self.queue.remove(&(due, handle)).map(|payload| (handle, payload))
    }

    /// Whether `handle` is still pending.
    #[must_use]
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.due_by_handle.contains_key(&handle)
    }

    /// Due time of a pending entry.
    #[must_use]
    pub fn due_at(&self, handle: EventHandle) -> Option<u64> {
        self.due_by_handle.get(&handle).copied()
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pending entries in firing order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, EventHandle, &T)> {
        self.queue
            .iter()
            .map(|(&(due, handle), payload)| (due, handle, payload))
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_then_schedule_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(300, "late");
        scheduler.schedule(100, "first");
        scheduler.schedule(100, "second");

        assert!(scheduler.pop_due(99).is_none());
        assert_eq!(scheduler.pop_due(100).map(|(_, p)| p), Some("first"));
        assert_eq!(scheduler.pop_due(100).map(|(_, p)| p), Some("second"));
        assert!(scheduler.pop_due(299).is_none());
        assert_eq!(scheduler.pop_due(1000).map(|(_, p)| p), Some("late"));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(50, 1_u32);
        assert!(scheduler.is_pending(handle));
        assert_eq!(scheduler.cancel(handle), Some(1));
        assert_eq!(scheduler.cancel(handle), None);
        assert!(scheduler.pop_due(1000).is_none());
    }

    #[test]
    fn test_fired_handle_cannot_be_cancelled() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(10, ());
        assert!(scheduler.pop_due(10).is_some());
        assert!(!scheduler.is_pending(handle));
        assert!(scheduler.cancel(handle).is_none());
    }

    #[test]
    fn test_cancel_all() {
        let mut scheduler = Scheduler::new();
        for due in 0..10 {
            scheduler.schedule(due, due);
        }
        scheduler.cancel_all();
        assert_eq!(scheduler.len(), 0);
        assert!(scheduler.pop_due(u64::MAX).is_none());
    }
}
