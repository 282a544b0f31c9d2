//! Transition callbacks.

use super::error::TransitionError;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with `(key, from, to)`.
pub type TransitionHook<K, S> = Arc<dyn Fn(&K, &S, &S) + Send + Sync>;

/// Callback invoked with `(key, from, to, error)`.
pub type FailureHook<K, S> = Arc<dyn Fn(&K, &S, &S, &TransitionError) + Send + Sync>;

/// Callbacks registered once, when the machine is built.
///
/// All hooks run on the thread performing the transition (the scanner thread
/// for timeout fallbacks) and never while a key lock is held, so a hook may
/// call back into the machine, including on the same key. The after hook runs
/// once the commit is visible; another transition on the same key may already
/// have committed by the time it observes the machine.
///
/// # Example
///
/// ```rust
/// use keyed_fsm::machine::Hooks;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let commits = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&commits);
/// let hooks = Hooks::<&str, &str>::new().on_after(move |_key, _from, _to| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
/// # let _ = hooks;
/// ```
pub struct Hooks<K, S> {
    before: Option<TransitionHook<K, S>>,
    after: Option<TransitionHook<K, S>>,
    failed: Option<FailureHook<K, S>>,
}

impl<K, S> Hooks<K, S> {
    pub fn new() -> Self {
        Self {
            before: None,
            after: None,
            failed: None,
        }
    }

    /// Called after the probe succeeds, before the action runs.
    pub fn on_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &S, &S) + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    /// Called after a transition commits.
    pub fn on_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &S, &S) + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }

    /// Called once for every audited failure.
    pub fn on_failed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &S, &S, &TransitionError) + Send + Sync + 'static,
    {
        self.failed = Some(Arc::new(hook));
        self
    }

    pub(crate) fn before(&self, key: &K, from: &S, to: &S) {
        if let Some(hook) = &self.before {
            hook(key, from, to);
        }
    }

    pub(crate) fn after(&self, key: &K, from: &S, to: &S) {
        if let Some(hook) = &self.after {
            hook(key, from, to);
        }
    }

    pub(crate) fn failed(&self, key: &K, from: &S, to: &S, error: &TransitionError) {
        if let Some(hook) = &self.failed {
            hook(key, from, to, error);
        }
    }
}

impl<K, S> Default for Hooks<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> Clone for Hooks<K, S> {
    fn clone(&self) -> Self {
        Self {
            before: self.before.clone(),
            after: self.after.clone(),
            failed: self.failed.clone(),
        }
    }
}

impl<K, S> fmt::Debug for Hooks<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("failed", &self.failed.is_some())
            .finish()
    }
}
