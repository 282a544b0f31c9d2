//! Errors reported by keyed machine operations.

use thiserror::Error;

/// Why a transition did not commit.
///
/// None of these are fatal to the machine; they are reported through the
/// failed hook, the audit trail and the `try_*` return values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Key '{key}' has not been initialized")]
    UnknownKey { key: String },

    #[error("No transition from '{from}' to '{to}'")]
    IllegalTransition { from: String, to: String },

    #[error("Transition from '{from}' to '{to}' lost to a concurrent transition")]
    ConcurrentConflict { from: String, to: String },

    #[error("Transition action failed: {0}")]
    ActionFailed(String),
}

/// Errors from machine operations other than transitions.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Key '{key}' has not been initialized")]
    UnknownKey { key: String },

    #[error("Timeout of {duration:?} cannot be scheduled")]
    InvalidTimeout { duration: std::time::Duration },

    #[error("Failed to spawn timeout scanner: {0}")]
    ScannerSpawn(#[from] std::io::Error),
}
