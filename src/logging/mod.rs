//! Structured logging for keyed machines.
//!
//! The machine itself logs through `tracing` macros. This module adds a
//! [`Hooks`] value that reports every transition outcome as a `tracing`
//! event, and a helper that installs a console subscriber.

use crate::core::{Key, State};
use crate::machine::Hooks;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable read by [`init_tracing`] for the filter directives.
pub const LOG_ENV: &str = "KEYED_FSM_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

static SUBSCRIBER_INSTALLED: OnceLock<bool> = OnceLock::new();

/// Hooks forwarding every transition callback to `tracing`.
///
/// Attempts are logged at `trace`, commits at `info`, failures at `warn`.
pub fn tracing_hooks<K: Key, S: State>() -> Hooks<K, S> {
    Hooks::new()
        .on_before(|key: &K, from: &S, to: &S| {
            tracing::trace!(?key, from = from.name(), to = to.name(), "transition attempt");
        })
        .on_after(|key: &K, from: &S, to: &S| {
            tracing::info!(?key, from = from.name(), to = to.name(), "transition");
        })
        .on_failed(|key: &K, from: &S, to: &S, error| {
            tracing::warn!(
                ?key,
                from = from.name(),
                to = to.name(),
                %error,
                "transition failed"
            );
        })
}

/// Install a console subscriber filtered by [`LOG_ENV`] (default `info`).
///
/// Safe to call more than once. Returns `false` if another global subscriber
/// was already installed, in which case events go to that one.
pub fn init_tracing() -> bool {
    *SUBSCRIBER_INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        let installed = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_level(true),
            )
            .with(filter)
            .try_init()
            .is_ok();

        if !installed {
            tracing::debug!("global tracing subscriber already set, keeping it");
        }
        installed
    })
}
