//! Builder API for ergonomic keyed machine construction.
//!
//! This module provides a fluent builder and a macro for declaring state
//! enums with minimal boilerplate.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::MachineBuilder;

use crate::core::{Key, State};
use crate::machine::KeyedStateMachine;

/// Build a machine from a list of edges with the default configuration.
///
/// # Example
///
/// ```
/// use keyed_fsm::builder::from_edges;
/// use keyed_fsm::machine::noop;
///
/// let machine = from_edges([("Idle", "Processing"), ("Processing", "Idle")]).unwrap();
/// machine.initialize_state(7u32, "Idle");
///
/// assert!(machine.transition(&7, "Processing", noop, ""));
/// ```
pub fn from_edges<K, S, I>(edges: I) -> Result<KeyedStateMachine<K, S>, BuildError>
where
    K: Key,
    S: State,
    I: IntoIterator<Item = (S, S)>,
{
    MachineBuilder::new().transitions(edges).build()
}
