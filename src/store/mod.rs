//! Keyed storage of state contexts with per-key locking.
//!
//! Every key gets its own slot, and therefore its own reader-writer lock, the
//! moment it is initialized. Slots are handed out as `Arc`s so the map shard is
//! never held while a key lock is taken: operations on distinct keys never
//! contend beyond the brief map lookup.

mod context;

pub use context::{KeySlot, StateContext, TimeoutConfig};

use crate::core::{HistoryEntry, Key, State, DEFAULT_HISTORY_CAPACITY};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Owns one [`StateContext`] per key.
pub struct KeyedStateStore<K: Key, S: State> {
    slots: DashMap<K, Arc<KeySlot<S>>>,
    history_capacity: usize,
}

impl<K: Key, S: State> Default for KeyedStateStore<K, S> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl<K: Key, S: State> KeyedStateStore<K, S> {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            slots: DashMap::new(),
            history_capacity,
        }
    }

    /// Create the context for `key` if it does not exist yet.
    ///
    /// Idempotent: an existing key keeps its current state and history.
    /// Returns `true` when the key was created by this call.
    pub fn initialize(&self, key: K, initial: S) -> bool {
        match self.slots.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(KeySlot::new(initial, self.history_capacity)));
                true
            }
        }
    }

    /// Shared handle to the slot of `key`.
    pub fn slot(&self, key: &K) -> Option<Arc<KeySlot<S>>> {
        self.slots.get(key).map(|slot| Arc::clone(slot.value()))
    }

    pub fn current_state(&self, key: &K) -> Option<S> {
        let slot = self.slot(key)?;
        let context = slot.context().read();
        Some(context.current().clone())
    }

    /// Snapshot of the history of `key`; empty for unknown keys.
    pub fn history(&self, key: &K) -> Vec<HistoryEntry<S>> {
        let Some(slot) = self.slot(key) else {
            return Vec::new();
        };
        let context = slot.context().read();
        context.history_snapshot()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn keys(&self) -> Vec<K> {
        self.slots.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_creates_context() {
        let store = KeyedStateStore::new(10);
        assert!(store.initialize("M", "Idle"));

        assert_eq!(store.current_state(&"M"), Some("Idle"));
        assert!(store.history(&"M").is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = KeyedStateStore::new(10);
        store.initialize("M", "Idle");

        let slot = store.slot(&"M").unwrap();
        slot.context().write().apply("Processing", "");

        assert!(!store.initialize("M", "Idle"));
        assert_eq!(store.current_state(&"M"), Some("Processing"));
        assert_eq!(store.history(&"M").len(), 1);
    }

    #[test]
    fn unknown_keys_read_as_absent() {
        let store: KeyedStateStore<&str, &str> = KeyedStateStore::default();

        assert!(store.slot(&"missing").is_none());
        assert!(store.current_state(&"missing").is_none());
        assert!(store.history(&"missing").is_empty());
        assert!(!store.contains_key(&"missing"));
        assert!(store.is_empty());
    }

    #[test]
    fn keys_lock_independently() {
        let store = KeyedStateStore::new(10);
        store.initialize("a", "Idle");
        store.initialize("b", "Idle");

        let a = store.slot(&"a").unwrap();
        let _held = a.context().write();

        // Reading another key must not block on the held write lock.
        assert_eq!(store.current_state(&"b"), Some("Idle"));
    }

    #[test]
    fn history_capacity_is_applied_to_new_keys() {
        let store = KeyedStateStore::new(2);
        store.initialize("M", "A");

        let slot = store.slot(&"M").unwrap();
        {
            let mut context = slot.context().write();
            context.apply("B", "");
            context.apply("C", "");
            context.apply("D", "");
        }

        let states: Vec<_> = store.history(&"M").into_iter().map(|e| e.state).collect();
        assert_eq!(states, vec!["C", "D"]);
    }
}
