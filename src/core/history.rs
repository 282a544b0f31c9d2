//! Per-key history of committed transitions.
//!
//! History is bounded: once the capacity is reached, recording a new entry
//! evicts the oldest one.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of entries kept per key.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use keyed_fsm::core::HistoryEntry;
/// use chrono::Utc;
///
/// let entry = HistoryEntry {
///     state: "Processing",
///     timestamp: Utc::now(),
///     reason: "job accepted".to_string(),
/// };
/// assert_eq!(entry.state, "Processing");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<S> {
    /// The state entered by the transition
    pub state: S,
    /// When the transition committed
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied reason, empty when none was given
    pub reason: String,
}

/// Ordered, capacity-bounded history of transitions, newest last.
///
/// # Example
///
/// ```rust
/// use keyed_fsm::core::StateHistory;
///
/// let mut history = StateHistory::with_capacity(2);
/// history.record("A", "");
/// history.record("B", "");
/// history.record("C", "");
///
/// let path: Vec<_> = history.path().into_iter().copied().collect();
/// assert_eq!(path, vec!["B", "C"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory<S> {
    entries: VecDeque<HistoryEntry<S>>,
    capacity: usize,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create an empty history with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an empty history keeping at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
        }
    }

    /// Append an entry stamped with the current time, evicting the oldest
    /// entries beyond capacity.
    pub fn record(&mut self, state: S, reason: &str) {
        self.entries.push_back(HistoryEntry {
            state,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// States entered, oldest first.
    pub fn path(&self) -> Vec<&S> {
        self.entries.iter().map(|entry| &entry.state).collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry<S>> {
        self.entries.back()
    }

    /// Copy of every retained entry, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry<S>> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
