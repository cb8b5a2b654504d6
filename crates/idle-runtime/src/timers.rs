//! Deferred callbacks ordered by due time.
//!
//! The queue only stores what should happen; [`crate::Game::advance_to`]
//! pops due entries in `(due, scheduling order)` and runs them. Cancelled
//! entries are dropped lazily when they reach the front.

use idle_core::{BoostId, Millis};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Scheduler step; re-arms itself.
    Tick,
    /// Lift the cooldown of a boost.
    CooldownClear(BoostId),
    /// Automatic repository spawn; re-arms itself while automation is owned.
    AutoSpawn,
    /// Periodic save request; re-arms itself.
    Autosave,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(Millis, u64)>>,
    live: HashMap<u64, TimerKind>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Millis, kind: TimerKind) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((due, seq)));
        self.live.insert(seq, kind);
        TimerId(seq)
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id.0).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    /// Remove and return the earliest live timer due at or before `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<(Millis, TimerKind)> {
        while let Some(&Reverse((due, seq))) = self.heap.peek() {
            if due > now {
                return None;
            }
            self.heap.pop();
            if let Some(kind) = self.live.remove(&seq) {
                return Some((due, kind));
            }
        }
        None
    }

    pub fn next_due(&mut self) -> Option<Millis> {
        while let Some(&Reverse((due, seq))) = self.heap.peek() {
            if self.live.contains_key(&seq) {
                return Some(due);
            }
            self.heap.pop();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, kind: TimerKind) -> bool {
        self.live.values().any(|k| *k == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(200, TimerKind::Tick);
        q.schedule(100, TimerKind::Autosave);
        q.schedule(200, TimerKind::AutoSpawn);
        assert_eq!(q.pop_due(50), None);
        assert_eq!(q.pop_due(250), Some((100, TimerKind::Autosave)));
        assert_eq!(q.pop_due(250), Some((200, TimerKind::Tick)));
        assert_eq!(q.pop_due(250), Some((200, TimerKind::AutoSpawn)));
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TimerQueue::new();
        let a = q.schedule(10, TimerKind::CooldownClear(BoostId::CoffeeRush));
        q.schedule(20, TimerKind::Tick);
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.next_due(), Some(20));
        assert_eq!(q.pop_due(100), Some((20, TimerKind::Tick)));
        q.schedule(30, TimerKind::Tick);
        q.cancel_all();
        assert_eq!(q.pop_due(i64::MAX), None);
        assert_eq!(q.len(), 0);
    }
}
