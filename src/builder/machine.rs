//! Builder for constructing keyed state machines.

use crate::builder::error::BuildError;
use crate::config::MachineConfig;
use crate::core::{Key, State, TransitionGraph};
use crate::logging;
use crate::machine::{Hooks, KeyedStateMachine, TransitionError};
use std::time::Duration;

/// Builder for constructing keyed state machines with a fluent API.
///
/// Everything set here is fixed before the machine is shared: the
/// configuration, the initial graph, initial keys and the hooks.
pub struct MachineBuilder<K: Key, S: State> {
    config: MachineConfig,
    graph: TransitionGraph<S>,
    initial: Vec<(K, S)>,
    hooks: Hooks<K, S>,
}

impl<K: Key, S: State> MachineBuilder<K, S> {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: MachineConfig::default(),
            graph: TransitionGraph::new(),
            initial: Vec::new(),
            hooks: Hooks::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how often the timeout scanner wakes up.
    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.config.scan_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    pub fn audit_capacity(mut self, capacity: usize) -> Self {
        self.config.audit_capacity = capacity;
        self
    }

    /// Whether `build` starts the timeout scanner (default `true`).
    pub fn auto_start_scanner(mut self, start: bool) -> Self {
        self.config.auto_start_scanner = start;
        self
    }

    /// Add a legal transition.
    pub fn transition(mut self, from: S, to: S) -> Self {
        self.graph.add(from, to);
        self
    }

    /// Add multiple legal transitions at once.
    pub fn transitions<I>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
    {
        for (from, to) in edges {
            self.graph.add(from, to);
        }
        self
    }

    /// Initialize `key` in `state` when the machine is built.
    pub fn initial(mut self, key: K, state: S) -> Self {
        self.initial.push((key, state));
        self
    }

    /// Replace all hooks at once.
    pub fn hooks(mut self, hooks: Hooks<K, S>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn on_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &S, &S) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_before(hook);
        self
    }

    pub fn on_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &S, &S) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_after(hook);
        self
    }

    pub fn on_failed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&K, &S, &S, &TransitionError) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_failed(hook);
        self
    }

    /// Forward every hook to `tracing`, replacing any registered hooks.
    pub fn with_tracing(mut self) -> Self {
        self.hooks = logging::tracing_hooks();
        self
    }

    /// Build the machine.
    /// Returns an error if the configuration is invalid or the scanner
    /// thread cannot be spawned.
    pub fn build(self) -> Result<KeyedStateMachine<K, S>, BuildError> {
        self.config.check().map_err(BuildError::InvalidConfig)?;

        let auto_start = self.config.auto_start_scanner;
        let machine = KeyedStateMachine::from_parts(self.config, self.graph, self.hooks);
        for (key, state) in self.initial {
            machine.initialize_state(key, state);
        }
        if auto_start {
            machine.start_scanner()?;
        }

        Ok(machine)
    }
}

impl<K: Key, S: State> Default for MachineBuilder<K, S> {
    fn default() -> Self {
        Self::new()
    }
}
