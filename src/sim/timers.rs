//! Deferred actions scheduled against the simulation clock
//!
//! One queue for the whole arena. Actions carry every parameter they need,
//! so they still run correctly if whoever scheduled them is gone.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::projectile::FireParams;

/// Something to do later
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredAction {
    /// Delayed duplicate bullet from an echo cell
    EchoShot(FireParams),
}

#[derive(Debug, Clone)]
struct Scheduled {
    due_at: u64,
    seq: u64,
    action: DeferredAction,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl Ord for Scheduled {
    // Reversed: BinaryHeap is a max-heap, we want the earliest first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-queue of deferred actions, FIFO among equal due times
#[derive(Debug, Clone, Default)]
pub struct TimerWheel {
    queue: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_at: u64, action: DeferredAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            due_at,
            seq,
            action,
        });
    }

    /// Remove and return every action due at or before `now`, in due order
    pub fn drain_due(&mut self, now: u64) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|s| s.due_at <= now) {
            if let Some(s) = self.queue.pop() {
                due.push(s.action);
            }
        }
        due
    }

    /// Earliest pending due time
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|s| s.due_at)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop everything pending
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
