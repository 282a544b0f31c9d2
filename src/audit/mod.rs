//! Global, capacity-bounded audit trail of transition attempts.
//!
//! The trail sits behind its own mutex, independent of the per-key locks, so
//! appends for different keys never serialize through a key lock. When the
//! capacity is reached the oldest entry is evicted (FIFO).

mod entry;

pub use entry::AuditLogEntry;

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default number of entries retained by a trail.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Append-only FIFO of [`AuditLogEntry`] values.
pub struct AuditTrail<K, S> {
    entries: Mutex<VecDeque<AuditLogEntry<K, S>>>,
    capacity: usize,
}

impl<K: Clone, S: Clone> Default for AuditTrail<K, S> {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl<K: Clone, S: Clone> AuditTrail<K, S> {
    /// Create a trail keeping at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, entry: AuditLogEntry<K, S>) {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Copy of every retained entry, oldest first. Leaves the trail intact.
    pub fn snapshot(&self) -> Vec<AuditLogEntry<K, S>> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Remove and return every retained entry, oldest first.
    pub fn drain(&self) -> Vec<AuditLogEntry<K, S>> {
        self.entries.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
