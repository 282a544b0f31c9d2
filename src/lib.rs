//! keyed-fsm: concurrent keyed state machines
//!
//! A single [`KeyedStateMachine`] manages any number of independent machines,
//! one per key, that share one graph of legal transitions. Transitions run a
//! caller-supplied action and commit optimistically; keys can fall back to a
//! designated state after an idle timeout, and every attempt is recorded in a
//! bounded audit trail.
//!
//! # Core Concepts
//!
//! - **State**: any value implementing the `State` trait (see [`state_enum!`])
//! - **Transition graph**: the set of legal `(from, to)` edges
//! - **History**: bounded per-key record of committed transitions
//! - **Audit trail**: bounded record of every attempt, successful or not
//! - **Timeouts**: idle fallbacks fired by a background scanner thread
//!
//! # Example
//!
//! ```rust
//! use keyed_fsm::{noop, state_enum, KeyedStateMachine};
//! use std::time::Duration;
//!
//! state_enum! {
//!     pub enum Job {
//!         Idle,
//!         Processing,
//!         Done,
//!     }
//! }
//!
//! let machine = KeyedStateMachine::builder()
//!     .transition(Job::Idle, Job::Processing)
//!     .transition(Job::Processing, Job::Done)
//!     .transition(Job::Processing, Job::Idle)
//!     .scan_interval(Duration::from_millis(100))
//!     .build()
//!     .unwrap();
//!
//! machine.initialize_state("job-1", Job::Idle);
//! assert!(machine.transition(&"job-1", Job::Processing, noop, "picked up"));
//! machine
//!     .set_timeout(&"job-1", Duration::from_secs(30), Job::Idle)
//!     .unwrap();
//! assert!(machine.transition(&"job-1", Job::Done, noop, "finished"));
//!
//! let history = machine.state_history(&"job-1");
//! assert_eq!(history.len(), 2);
//! assert_eq!(machine.audit_logs().len(), 2);
//! machine.shutdown();
//! ```

pub mod audit;
pub mod builder;
pub mod config;
pub mod core;
pub mod logging;
pub mod machine;
pub mod metrics;
pub mod store;
pub mod timeout;

// Re-export commonly used types
pub use audit::AuditLogEntry;
pub use builder::{BuildError, MachineBuilder};
pub use config::{ConfigError, MachineConfig};
pub use self::core::{HistoryEntry, Key, State};
pub use machine::{noop, Hooks, KeyedStateMachine, MachineError, TransitionError};
pub use metrics::MetricsSnapshot;
