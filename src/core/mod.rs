//! Core value types of the keyed state machine.
//!
//! This module contains the lock-free building blocks shared by every key:
//! - State and key bounds via the `State` and `Key` traits
//! - The directed graph of legal transitions
//! - Bounded per-key transition history
//!
//! Nothing in this module synchronizes; the store and the executor decide
//! which lock protects each value.

mod graph;
mod history;
mod state;

pub use graph::TransitionGraph;
pub use history::{HistoryEntry, StateHistory, DEFAULT_HISTORY_CAPACITY};
pub use state::{Key, State};
