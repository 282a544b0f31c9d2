//! Configuration errors.

use thiserror::Error;

/// Problems found while loading or validating a [`MachineConfig`](super::MachineConfig).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Scan interval must be greater than zero")]
    ZeroScanInterval,

    #[error("History capacity must be greater than zero")]
    ZeroHistoryCapacity,

    #[error("Audit capacity must be greater than zero")]
    ZeroAuditCapacity,

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}
