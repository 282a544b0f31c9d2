//! Min-heap of pending timeout tasks.

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// A scheduled fallback check for one key.
///
/// `generation` is the key's timeout generation at schedule time; a task whose
/// generation no longer matches the key is stale.
#[derive(Clone, Debug)]
pub struct TimeoutTask<K> {
    pub key: K,
    pub expire_at: Instant,
    pub generation: u64,
}

impl<K> PartialEq for TimeoutTask<K> {
    fn eq(&self, other: &Self) -> bool {
        self.expire_at == other.expire_at && self.generation == other.generation
    }
}

impl<K> Eq for TimeoutTask<K> {}

impl<K> PartialOrd for TimeoutTask<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for TimeoutTask<K> {
    // Reversed so `BinaryHeap` pops the earliest expiry first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .expire_at
            .cmp(&self.expire_at)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

/// Pending timeout tasks ordered by expiry, earliest first.
///
/// Superseded tasks are never removed eagerly; the scanner filters them when
/// they expire.
pub struct TimeoutQueue<K> {
    heap: Mutex<BinaryHeap<TimeoutTask<K>>>,
}

impl<K> Default for TimeoutQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimeoutQueue<K> {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
        }
    }

    pub fn schedule(&self, key: K, expire_at: Instant, generation: u64) {
        self.heap.lock().push(TimeoutTask {
            key,
            expire_at,
            generation,
        });
    }

    /// Remove and return every task with `expire_at <= now`, earliest first.
    pub fn drain_expired(&self, now: Instant) -> Vec<TimeoutTask<K>> {
        let mut heap = self.heap.lock();
        let mut expired = Vec::new();
        while heap.peek().is_some_and(|task| task.expire_at <= now) {
            if let Some(task) = heap.pop() {
                expired.push(task);
            }
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }
}
