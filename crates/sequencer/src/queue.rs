//! Tick-ordered event queue.
//!
//! Events are ordered by `(due_tick, insertion sequence)`, so events
//! scheduled for the same tick dispatch in the order they were queued.
//! Cancellation is explicit through [`EventHandle`]: liveness is tracked in a
//! separate set, cancelled entries stay in the heap until popped, and
//! cancelling an already-dispatched handle is a no-op.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use orbital_core::time::Tick;

/// Handle for revoking a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

struct Scheduled<E> {
    due: Tick,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}
impl<E> Eq for Scheduled<E> {}
impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

pub struct EventQueue<E> {
    heap: BinaryHeap<Reverse<Scheduled<E>>>,
    next_seq: u64,
    /// Seqs scheduled but not yet popped or cancelled.
    live: HashSet<u64>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            live: HashSet::new(),
        }
    }

    /// Schedule `event` for dispatch at `due`.
    pub fn schedule(&mut self, due: Tick, event: E) -> EventHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(seq);
        self.heap.push(Reverse(Scheduled { due, seq, event }));
        EventHandle(seq)
    }

    /// Revoke a scheduled event. A no-op if it already dispatched or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: EventHandle) {
        self.live.remove(&handle.0);
    }

    /// Whether `handle` still refers to a pending event.
    pub fn is_live(&self, handle: EventHandle) -> bool {
        self.live.contains(&handle.0)
    }

    /// Next event due at or before `now`, in (due, schedule) order.
    pub fn pop_due(&mut self, now: Tick) -> Option<E> {
        while self
            .heap
            .peek()
            .is_some_and(|Reverse(entry)| entry.due <= now)
        {
            if let Some(Reverse(entry)) = self.heap.pop() {
                if self.live.remove(&entry.seq) {
                    return Some(entry.event);
                }
            }
        }
        None
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    /// True when no live event is pending. Exact even while cancelled
    /// entries still sit in the heap.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
