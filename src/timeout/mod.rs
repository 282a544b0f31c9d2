//! Idle-timeout scheduling.
//!
//! Timeout tasks are pushed onto a min-heap whenever a key with a configured
//! timeout commits a transition. A background [`TimeoutScanner`] wakes on a
//! fixed interval, drains every expired task and hands it to a
//! [`TimeoutHandler`], which filters stale tasks and performs the fallback.

mod queue;
mod scanner;

pub use queue::{TimeoutQueue, TimeoutTask};
pub use scanner::{TimeoutHandler, TimeoutScanner};

pub(crate) use scanner::panic_message;

/// Reason recorded for transitions triggered by an elapsed timeout.
pub const TIMEOUT_REASON: &str = "State timeout";
