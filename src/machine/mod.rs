//! Concurrent keyed state machine.
//!
//! A [`KeyedStateMachine`] manages many independent machines, one per key,
//! sharing a single graph of legal transitions. It is `Send + Sync`; share it
//! behind an `Arc` and call it from any number of threads.
//!
//! # Key Concepts
//!
//! - **Optimistic transitions**: actions run without holding the key lock;
//!   commits re-validate a per-key version and lose to any transition that
//!   committed in between
//! - **Idle timeouts**: a key can fall back to a designated state when no
//!   transition commits within its timeout
//! - **Audit trail**: every attempt on an initialized key is recorded
//!
//! # Example
//!
//! ```rust
//! use keyed_fsm::machine::{noop, KeyedStateMachine};
//!
//! let machine = KeyedStateMachine::builder()
//!     .transition("Idle", "Processing")
//!     .transition("Processing", "Idle")
//!     .auto_start_scanner(false)
//!     .build()
//!     .unwrap();
//!
//! machine.initialize_state("M", "Idle");
//! assert!(machine.transition(&"M", "Processing", noop, "job accepted"));
//! assert_eq!(machine.current_state(&"M"), Some("Processing"));
//! assert!(!machine.transition(&"M", "Done", noop, ""));
//! ```

pub mod error;
pub mod hooks;

mod executor;

pub use error::{MachineError, TransitionError};
pub use hooks::{FailureHook, Hooks, TransitionHook};

use crate::audit::AuditLogEntry;
use crate::builder::{BuildError, MachineBuilder};
use crate::config::MachineConfig;
use crate::core::{HistoryEntry, Key, State, TransitionGraph};
use crate::metrics::MetricsSnapshot;
use crate::timeout::TimeoutScanner;
use executor::MachineCore;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Action that does nothing and never fails.
pub fn noop<K, S>(_key: &K, _from: &S, _to: &S) -> Result<(), Infallible> {
    Ok(())
}

/// Registry of independent state machines addressed by key.
///
/// Setup (`add_transition`, hooks via the builder) is expected to complete
/// before concurrent transitions start. The timeout scanner thread is owned
/// by this value and joined on [`shutdown`](Self::shutdown) or drop.
pub struct KeyedStateMachine<K: Key, S: State> {
    core: Arc<MachineCore<K, S>>,
    config: MachineConfig,
    scanner: Mutex<Option<TimeoutScanner>>,
}

impl<K: Key, S: State> KeyedStateMachine<K, S> {
    /// Build a machine with the default configuration and a running scanner.
    pub fn new() -> Result<Self, BuildError> {
        Self::builder().build()
    }

    pub fn builder() -> MachineBuilder<K, S> {
        MachineBuilder::new()
    }

    pub(crate) fn from_parts(
        config: MachineConfig,
        graph: TransitionGraph<S>,
        hooks: Hooks<K, S>,
    ) -> Self {
        Self {
            core: Arc::new(MachineCore::new(&config, graph, hooks)),
            config,
            scanner: Mutex::new(None),
        }
    }

    /// Identifier of this machine, used in log fields.
    pub fn id(&self) -> Uuid {
        self.core.id()
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Create `key` in `initial` state.
    ///
    /// Idempotent: calling it again for an existing key never resets the
    /// key's current state or history. Returns `true` if the key was created.
    pub fn initialize_state(&self, key: K, initial: S) -> bool {
        self.core.initialize_state(key, initial)
    }

    /// Allow transitions from `from` to `to`. Returns `false` if the edge
    /// already existed.
    ///
    /// Intended for setup, before transitions run concurrently.
    pub fn add_transition(&self, from: S, to: S) -> bool {
        self.core.add_transition(from, to)
    }

    pub fn is_legal(&self, from: &S, to: &S) -> bool {
        self.core.is_legal(from, to)
    }

    /// Transition `key` to `to`, running `action` first.
    ///
    /// Returns `true` if the transition committed. See
    /// [`try_transition`](Self::try_transition) for the failure kinds.
    pub fn transition<F, E>(&self, key: &K, to: S, action: F, reason: &str) -> bool
    where
        F: FnOnce(&K, &S, &S) -> Result<(), E>,
        E: Display,
    {
        self.try_transition(key, to, action, reason).is_ok()
    }

    /// Transition `key` to `to`, running `action` first.
    ///
    /// `action` receives `(key, from, to)` and runs without any lock held.
    /// If it or the before hook returns an error or panics, the transition is
    /// aborted and the failure audited, but anything the action already did
    /// is NOT undone. A panicking after hook is logged; the commit stands.
    /// If another transition on the same key commits while the action runs,
    /// this one fails with [`TransitionError::ConcurrentConflict`].
    pub fn try_transition<F, E>(
        &self,
        key: &K,
        to: S,
        action: F,
        reason: &str,
    ) -> Result<(), TransitionError>
    where
        F: FnOnce(&K, &S, &S) -> Result<(), E>,
        E: Display,
    {
        self.core.try_transition(key, to, action, reason)
    }

    /// Transition with an effect that is applied only if the commit wins.
    ///
    /// `prepare` runs unlocked like an action and returns the effect; the
    /// effect runs inside the key's exclusive section after conflict
    /// detection. The effect must not call back into this machine for the
    /// same key, or it will deadlock.
    ///
    /// # Example
    ///
    /// ```rust
    /// use keyed_fsm::machine::KeyedStateMachine;
    /// use std::convert::Infallible;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let machine = KeyedStateMachine::builder()
    ///     .transition("Idle", "Processing")
    ///     .auto_start_scanner(false)
    ///     .build()
    ///     .unwrap();
    /// machine.initialize_state("M", "Idle");
    ///
    /// let charged = AtomicUsize::new(0);
    /// let counter = &charged;
    /// let result = machine.try_transition_with_commit(
    ///     &"M",
    ///     "Processing",
    ///     move |_key: &&str, _from: &&str, _to: &&str| {
    ///         Ok::<_, Infallible>(move |_: &&str, _: &&str, _: &&str| {
    ///             counter.fetch_add(1, Ordering::SeqCst);
    ///         })
    ///     },
    ///     "charge",
    /// );
    ///
    /// assert!(result.is_ok());
    /// assert_eq!(charged.load(Ordering::SeqCst), 1);
    /// ```
    pub fn try_transition_with_commit<P, C, E>(
        &self,
        key: &K,
        to: S,
        prepare: P,
        reason: &str,
    ) -> Result<(), TransitionError>
    where
        P: FnOnce(&K, &S, &S) -> Result<C, E>,
        C: FnOnce(&K, &S, &S),
        E: Display,
    {
        self.core.try_transition_with_commit(key, to, prepare, reason)
    }

    /// Fall back to `fallback` whenever `key` stays `duration` without a
    /// committed transition.
    ///
    /// Replaces any previous timeout of the key. Fails with
    /// [`MachineError::InvalidTimeout`] if `duration` is too large to be
    /// scheduled; the previous timeout is then kept.
    pub fn set_timeout(
        &self,
        key: &K,
        duration: Duration,
        fallback: S,
    ) -> Result<(), MachineError> {
        self.core.set_timeout(key, duration, fallback)
    }

    /// Remove the timeout of `key`; pending tasks for it become stale.
    pub fn clear_timeout(&self, key: &K) -> Result<(), MachineError> {
        self.core.clear_timeout(key)
    }

    /// Current state of `key`, or `None` if it was never initialized.
    pub fn current_state(&self, key: &K) -> Option<S> {
        self.core.current_state(key)
    }

    /// Snapshot of the committed transitions of `key`, oldest first.
    pub fn state_history(&self, key: &K) -> Vec<HistoryEntry<S>> {
        self.core.state_history(key)
    }

    /// Snapshot of the audit trail, oldest first. Does not clear it.
    pub fn audit_logs(&self) -> Vec<AuditLogEntry<K, S>> {
        self.core.audit_logs()
    }

    /// Remove and return every audit entry, oldest first.
    pub fn drain_audit_logs(&self) -> Vec<AuditLogEntry<K, S>> {
        self.core.drain_audit_logs()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.core.contains_key(key)
    }

    pub fn keys(&self) -> Vec<K> {
        self.core.keys()
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics()
    }

    /// Number of queued timeout tasks, stale ones included.
    pub fn pending_timeouts(&self) -> usize {
        self.core.timeouts().len()
    }

    /// Start the timeout scanner if it is not already running.
    pub fn start_scanner(&self) -> Result<(), MachineError> {
        let mut scanner = self.scanner.lock();
        if scanner.as_ref().is_some_and(TimeoutScanner::is_running) {
            return Ok(());
        }

        let name = format!("fsm-timeouts-{}", self.core.id().simple());
        *scanner = Some(TimeoutScanner::spawn(
            name,
            Arc::clone(self.core.timeouts()),
            Arc::clone(&self.core),
            self.config.scan_interval(),
        )?);
        info!(machine = %self.core.id(), "timeout scanner running");
        Ok(())
    }

    /// Stop and join the timeout scanner. Transitions keep working; timeouts
    /// stop firing until [`start_scanner`](Self::start_scanner) is called.
    pub fn shutdown(&self) {
        let scanner = self.scanner.lock().take();
        if let Some(mut scanner) = scanner {
            scanner.stop();
        }
    }

    pub fn is_scanner_running(&self) -> bool {
        self.scanner
            .lock()
            .as_ref()
            .is_some_and(TimeoutScanner::is_running)
    }
}

impl<K: Key, S: State> Drop for KeyedStateMachine<K, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
