//! Bounds for the states and keys managed by a keyed machine.
//!
//! States and keys are plain values: they are cloned into history and audit
//! records, hashed into the transition graph and the key store, and shared
//! across the caller threads and the timeout scanner.

use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state machine states.
///
/// # Required Traits
///
/// - `Clone`: states are copied into history and audit records
/// - `Eq` + `Hash`: states are vertices of the transition graph
/// - `Debug`: states must be debuggable for diagnostics
/// - `Send` + `Sync` + `'static`: states cross into the scanner thread
///
/// # Example
///
/// ```rust
/// use keyed_fsm::core::State;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum DoorState {
///     Open,
///     Closed,
/// }
///
/// impl State for DoorState {
///     fn name(&self) -> &str {
///         match self {
///             Self::Open => "Open",
///             Self::Closed => "Closed",
///         }
///     }
/// }
///
/// assert_eq!(DoorState::Open.name(), "Open");
/// ```
pub trait State: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;
}

impl State for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

impl State for &'static str {
    fn name(&self) -> &str {
        self
    }
}

/// Trait for the keys addressing independent machines in the store.
///
/// Blanket-implemented for every type with the required bounds.
pub trait Key: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> Key for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}
