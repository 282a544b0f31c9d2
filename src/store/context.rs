//! Per-key mutable record and the slot that guards it.

use crate::core::{HistoryEntry, State, StateHistory};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Idle timeout configured for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeoutConfig<S> {
    /// How long the key may stay in a state before falling back
    pub duration: Duration,
    /// State entered when the timeout elapses
    pub fallback: S,
}

/// Mutable record of one key: current state, bounded history and timeout.
#[derive(Clone, Debug)]
pub struct StateContext<S: State> {
    current: S,
    history: StateHistory<S>,
    last_updated: Instant,
    timeout: Option<TimeoutConfig<S>>,
}

impl<S: State> StateContext<S> {
    pub(crate) fn new(initial: S, history_capacity: usize) -> Self {
        Self {
            current: initial,
            history: StateHistory::with_capacity(history_capacity),
            last_updated: Instant::now(),
            timeout: None,
        }
    }

    pub fn current(&self) -> &S {
        &self.current
    }

    pub fn history(&self) -> &StateHistory<S> {
        &self.history
    }

    pub fn last_updated(&self) -> Instant {
        self.last_updated
    }

    pub fn timeout(&self) -> Option<&TimeoutConfig<S>> {
        self.timeout.as_ref()
    }

    /// Time elapsed since the last committed transition (or creation).
    pub fn idle_for(&self) -> Duration {
        self.last_updated.elapsed()
    }

    /// Commit `to` as the current state, recording it in history.
    pub(crate) fn apply(&mut self, to: S, reason: &str) {
        self.history.record(to.clone(), reason);
        self.current = to;
        self.last_updated = Instant::now();
    }

    pub(crate) fn set_timeout(&mut self, timeout: Option<TimeoutConfig<S>>) {
        self.timeout = timeout;
    }

    pub(crate) fn history_snapshot(&self) -> Vec<HistoryEntry<S>> {
        self.history.snapshot()
    }
}

/// A key's context together with its lock and optimistic-concurrency tags.
///
/// `version` changes on every commit and `generation` on every timeout
/// (re)schedule. Both are only advanced while the context's write lock is held,
/// but may be read without it.
#[derive(Debug)]
pub struct KeySlot<S: State> {
    context: RwLock<StateContext<S>>,
    version: AtomicU64,
    generation: AtomicU64,
}

impl<S: State> KeySlot<S> {
    pub(crate) fn new(initial: S, history_capacity: usize) -> Self {
        Self {
            context: RwLock::new(StateContext::new(initial, history_capacity)),
            version: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn context(&self) -> &RwLock<StateContext<S>> {
        &self.context
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Advance the version from `expected`, failing if another commit got
    /// there first.
    pub(crate) fn try_advance_version(&self, expected: u64) -> bool {
        self.version
            .compare_exchange(expected, expected + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Start a new timeout generation, returning its tag.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}
