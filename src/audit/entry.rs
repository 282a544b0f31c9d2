//! Audit log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One transition attempt and its outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry<K, S> {
    pub timestamp: DateTime<Utc>,
    pub key: K,
    /// State observed when the attempt was probed
    pub from: S,
    /// Requested target state
    pub to: S,
    pub success: bool,
    pub reason: String,
    /// Failure description, `None` for successful attempts
    pub error: Option<String>,
}

impl<K, S> AuditLogEntry<K, S> {
    pub fn succeeded(key: K, from: S, to: S, reason: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            key,
            from,
            to,
            success: true,
            reason: reason.to_string(),
            error: None,
        }
    }

    pub fn failed(key: K, from: S, to: S, reason: &str, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            key,
            from,
            to,
            success: false,
            reason: reason.to_string(),
            error: Some(error.into()),
        }
    }
}
