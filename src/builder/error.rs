//! Build errors for keyed state machines.

use crate::config::ConfigError;
use crate::machine::MachineError;
use thiserror::Error;

/// Errors that can occur when building a keyed state machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid configuration: {}", describe(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error(transparent)]
    Machine(#[from] MachineError),
}

fn describe(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
