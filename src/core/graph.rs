//! Directed graph of legal state transitions.

use super::state::State;
use std::collections::{HashMap, HashSet};

/// Set of legal `(from, to)` edges shared by every key of one machine.
///
/// Edges are directed: adding `A -> B` says nothing about `B -> A`.
///
/// # Example
///
/// ```rust
/// use keyed_fsm::core::TransitionGraph;
///
/// let mut graph = TransitionGraph::new();
/// graph.add("Idle", "Processing");
///
/// assert!(graph.is_legal(&"Idle", &"Processing"));
/// assert!(!graph.is_legal(&"Processing", &"Idle"));
/// ```
#[derive(Clone, Debug)]
pub struct TransitionGraph<S: State> {
    edges: HashMap<S, HashSet<S>>,
}

impl<S: State> Default for TransitionGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> TransitionGraph<S> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }

    /// Insert the edge `from -> to`. Returns `false` if it already existed.
    pub fn add(&mut self, from: S, to: S) -> bool {
        self.edges.entry(from).or_default().insert(to)
    }

    /// Check whether `from -> to` is a legal edge.
    pub fn is_legal(&self, from: &S, to: &S) -> bool {
        self.edges
            .get(from)
            .is_some_and(|targets| targets.contains(to))
    }

    /// Legal successors of `from`, in no particular order.
    pub fn successors<'a>(&'a self, from: &S) -> impl Iterator<Item = &'a S> + 'a {
        self.edges.get(from).into_iter().flatten()
    }

    /// Whether `state` appears in the graph as a source or a target.
    pub fn contains_state(&self, state: &S) -> bool {
        self.edges.contains_key(state) || self.edges.values().any(|t| t.contains(state))
    }

    /// Total number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }
}
