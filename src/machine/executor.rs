//! Shared machine state and the optimistic transition protocol.
//!
//! A transition runs in four phases:
//!
//! ```text
//! 1. probe   - read lock: capture current state and version, check the graph
//! 2. before  - before hook, no lock held
//! 3. action  - caller action, no lock held; errors and panics are captured
//! 4. commit  - write lock: compare-and-swap the version, apply, audit
//! ```
//!
//! The after hook runs once the write lock is released. Because the action
//! runs unlocked, two transitions probed from the same version may both run
//! their actions; only the first to commit wins, and the loser's action
//! effects are NOT rolled back. Use
//! [`try_transition_with_commit`](MachineCore::try_transition_with_commit) for
//! effects that must only happen on a successful commit.

use super::error::{MachineError, TransitionError};
use super::hooks::Hooks;
use crate::audit::{AuditLogEntry, AuditTrail};
use crate::config::MachineConfig;
use crate::core::{HistoryEntry, Key, State, TransitionGraph};
use crate::metrics::{MetricsCounters, MetricsSnapshot};
use crate::store::{KeySlot, KeyedStateStore, TimeoutConfig};
use crate::timeout::{panic_message, TimeoutHandler, TimeoutQueue, TimeoutTask, TIMEOUT_REASON};
use parking_lot::RwLock;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Everything shared between the public machine handle and its scanner.
pub(crate) struct MachineCore<K: Key, S: State> {
    id: Uuid,
    graph: RwLock<TransitionGraph<S>>,
    store: KeyedStateStore<K, S>,
    audit: AuditTrail<K, S>,
    metrics: MetricsCounters,
    timeouts: Arc<TimeoutQueue<K>>,
    hooks: Hooks<K, S>,
}

impl<K: Key, S: State> MachineCore<K, S> {
    pub(crate) fn new(
        config: &MachineConfig,
        graph: TransitionGraph<S>,
        hooks: Hooks<K, S>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            graph: RwLock::new(graph),
            store: KeyedStateStore::new(config.history_capacity),
            audit: AuditTrail::new(config.audit_capacity),
            metrics: MetricsCounters::new(),
            timeouts: Arc::new(TimeoutQueue::new()),
            hooks,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn timeouts(&self) -> &Arc<TimeoutQueue<K>> {
        &self.timeouts
    }

    pub(crate) fn initialize_state(&self, key: K, initial: S) -> bool {
        let created = self.store.initialize(key.clone(), initial);
        if created {
            trace!(machine = %self.id, ?key, "initialized key");
        }
        created
    }

    pub(crate) fn add_transition(&self, from: S, to: S) -> bool {
        self.graph.write().add(from, to)
    }

    pub(crate) fn is_legal(&self, from: &S, to: &S) -> bool {
        self.graph.read().is_legal(from, to)
    }

    pub(crate) fn try_transition<F, E>(
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
        self.execute(
            key,
            to,
            |key: &K, from: &S, to: &S| {
                action(key, from, to).map(|()| |_: &K, _: &S, _: &S| {})
            },
            reason,
        )
    }

    /// Like [`try_transition`](Self::try_transition), but `prepare` returns a
    /// commit effect that only runs if the commit wins, inside the key's
    /// exclusive section. The effect must not call back into this machine for
    /// the same key.
    pub(crate) fn try_transition_with_commit<P, C, E>(
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
        self.execute(key, to, prepare, reason)
    }

    fn execute<P, C, E>(
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
        self.metrics.record_attempt();

        let Some(slot) = self.store.slot(key) else {
            debug!(machine = %self.id, ?key, "transition on unknown key");
            return Err(TransitionError::UnknownKey {
                key: format!("{key:?}"),
            });
        };

        // Phase 1: probe.
        let (from, version) = {
            let context = slot.context().read();
            (context.current().clone(), slot.version())
        };
        if !self.is_legal(&from, &to) {
            let error = TransitionError::IllegalTransition {
                from: from.name().to_string(),
                to: to.name().to_string(),
            };
            return Err(self.reject(key, &from, &to, reason, error));
        }

        // Phase 2 and 3: hooks and action, unlocked.
        if let Err(panic_text) = guarded(|| self.hooks.before(key, &from, &to)) {
            let error =
                TransitionError::ActionFailed(format!("before hook panicked: {panic_text}"));
            return Err(self.reject(key, &from, &to, reason, error));
        }
        let commit_effect = match guarded(|| prepare(key, &from, &to)) {
            Ok(Ok(effect)) => effect,
            Ok(Err(error)) => {
                let error = TransitionError::ActionFailed(error.to_string());
                return Err(self.reject(key, &from, &to, reason, error));
            }
            Err(panic_text) => {
                let error = TransitionError::ActionFailed(panic_text);
                return Err(self.reject(key, &from, &to, reason, error));
            }
        };

        // Phase 4: commit.
        if let Err(error) = self.commit(key, &slot, version, &from, &to, commit_effect, reason) {
            return Err(self.reject(key, &from, &to, reason, error));
        }

        self.metrics.record_success();
        debug!(
            machine = %self.id,
            ?key,
            from = from.name(),
            to = to.name(),
            reason,
            "transition committed"
        );
        if let Err(panic_text) = guarded(|| self.hooks.after(key, &from, &to)) {
            warn!(
                machine = %self.id,
                ?key,
                from = from.name(),
                to = to.name(),
                panic = %panic_text,
                "after hook panicked; transition stays committed"
            );
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn commit<C>(
        &self,
        key: &K,
        slot: &KeySlot<S>,
        version: u64,
        from: &S,
        to: &S,
        commit_effect: C,
        reason: &str,
    ) -> Result<(), TransitionError>
    where
        C: FnOnce(&K, &S, &S),
    {
        let mut context = slot.context().write();
        if !slot.try_advance_version(version) {
            return Err(TransitionError::ConcurrentConflict {
                from: from.name().to_string(),
                to: to.name().to_string(),
            });
        }

        // The version already moved on; a panicking effect leaves the state
        // untouched and only invalidates concurrent probes.
        guarded(|| commit_effect(key, from, to)).map_err(TransitionError::ActionFailed)?;

        context.apply(to.clone(), reason);
        let expire_at = context
            .timeout()
            .and_then(|timeout| context.last_updated().checked_add(timeout.duration));
        if let Some(expire_at) = expire_at {
            let generation = slot.next_generation();
            self.timeouts.schedule(key.clone(), expire_at, generation);
        }
        self.audit.record(AuditLogEntry::succeeded(
            key.clone(),
            from.clone(),
            to.clone(),
            reason,
        ));
        Ok(())
    }

    /// Audit and report a failed attempt, returning the error for the caller.
    fn reject(
        &self,
        key: &K,
        from: &S,
        to: &S,
        reason: &str,
        error: TransitionError,
    ) -> TransitionError {
        self.audit.record(AuditLogEntry::failed(
            key.clone(),
            from.clone(),
            to.clone(),
            reason,
            error.to_string(),
        ));
        self.metrics.record_failure();
        warn!(
            machine = %self.id,
            ?key,
            from = from.name(),
            to = to.name(),
            %error,
            "transition rejected"
        );
        if let Err(panic_text) = guarded(|| self.hooks.failed(key, from, to, &error)) {
            warn!(machine = %self.id, ?key, panic = %panic_text, "failed hook panicked");
        }
        error
    }

    pub(crate) fn set_timeout(
        &self,
        key: &K,
        duration: Duration,
        fallback: S,
    ) -> Result<(), MachineError> {
        let slot = self.slot_or_err(key)?;
        let mut context = slot.context().write();
        let expire_at = Instant::now()
            .checked_add(duration)
            .ok_or(MachineError::InvalidTimeout { duration })?;
        context.set_timeout(Some(TimeoutConfig { duration, fallback }));
        let generation = slot.next_generation();
        self.timeouts.schedule(key.clone(), expire_at, generation);
        Ok(())
    }

    pub(crate) fn clear_timeout(&self, key: &K) -> Result<(), MachineError> {
        let slot = self.slot_or_err(key)?;
        let mut context = slot.context().write();
        context.set_timeout(None);
        slot.next_generation();
        Ok(())
    }

    fn slot_or_err(&self, key: &K) -> Result<Arc<KeySlot<S>>, MachineError> {
        self.store.slot(key).ok_or_else(|| MachineError::UnknownKey {
            key: format!("{key:?}"),
        })
    }

    pub(crate) fn current_state(&self, key: &K) -> Option<S> {
        self.store.current_state(key)
    }

    pub(crate) fn state_history(&self, key: &K) -> Vec<HistoryEntry<S>> {
        self.store.history(key)
    }

    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.store.contains_key(key)
    }

    pub(crate) fn keys(&self) -> Vec<K> {
        self.store.keys()
    }

    pub(crate) fn len(&self) -> usize {
        self.store.len()
    }

    pub(crate) fn audit_logs(&self) -> Vec<AuditLogEntry<K, S>> {
        self.audit.snapshot()
    }

    pub(crate) fn drain_audit_logs(&self) -> Vec<AuditLogEntry<K, S>> {
        self.audit.drain()
    }

    pub(crate) fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<K: Key, S: State> TimeoutHandler<K> for MachineCore<K, S> {
    fn handle_timeout(&self, task: &TimeoutTask<K>) {
        let Some(slot) = self.store.slot(&task.key) else {
            return;
        };
        if slot.generation() != task.generation {
            trace!(machine = %self.id, key = ?task.key, "discarding superseded timeout");
            return;
        }

        let fallback = {
            let context = slot.context().read();
            let Some(timeout) = context.timeout() else {
                return;
            };
            if context.idle_for() < timeout.duration {
                trace!(
                    machine = %self.id,
                    key = ?task.key,
                    "timeout refreshed by a later transition"
                );
                return;
            }
            // Already in the fallback, with no self-loop to record.
            let current = context.current();
            if *current == timeout.fallback && !self.is_legal(current, &timeout.fallback) {
                return;
            }
            timeout.fallback.clone()
        };

        debug!(
            machine = %self.id,
            key = ?task.key,
            fallback = fallback.name(),
            "state timed out"
        );
        // Outcome is audited and reported through the hooks.
        let _ = self.try_transition(&task.key, fallback, super::noop::<K, S>, TIMEOUT_REASON);
    }
}

/// Run `f`, turning a panic into its message.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}
