//! Machine configuration.
//!
//! Validation uses Stillwater's `Validation` so that every problem in a
//! configuration is reported at once instead of stopping at the first.
//!
//! # Example
//!
//! ```rust
//! use keyed_fsm::config::MachineConfig;
//!
//! let config = MachineConfig::from_json(r#"{ "scan_interval_ms": 50 }"#).unwrap();
//!
//! assert_eq!(config.scan_interval_ms, 50);
//! assert_eq!(config.history_capacity, 100);
//! assert!(config.validate().is_success());
//! ```

pub mod error;

pub use error::ConfigError;

use crate::audit::DEFAULT_AUDIT_CAPACITY;
use crate::core::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Default interval between timeout scans, in milliseconds.
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 1_000;

/// Tunables of a keyed state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// How often the timeout scanner wakes up
    pub scan_interval_ms: u64,
    /// Maximum history entries kept per key
    pub history_capacity: usize,
    /// Maximum entries kept in the audit trail
    pub audit_capacity: usize,
    /// Start the timeout scanner when the machine is built
    pub auto_start_scanner: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            auto_start_scanner: true,
        }
    }
}

impl MachineConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Check every field, accumulating ALL violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<ConfigError>> {
        let checks = vec![
            require(self.scan_interval_ms > 0, ConfigError::ZeroScanInterval),
            require(self.history_capacity > 0, ConfigError::ZeroHistoryCapacity),
            require(self.audit_capacity > 0, ConfigError::ZeroAuditCapacity),
        ];

        Validation::all_vec(checks).map(|_| ())
    }

    /// Validate, collecting the violations into a plain list on failure.
    pub fn check(&self) -> Result<(), Vec<ConfigError>> {
        match self.validate() {
            Validation::Success(()) => Ok(()),
            Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
        }
    }
}

fn require(condition: bool, error: ConfigError) -> Validation<(), NonEmptyVec<ConfigError>> {
    if condition {
        Validation::success(())
    } else {
        Validation::fail(error)
    }
}
