//! Tracing subscriber installation for binaries and tests that embed the
//! gateway.
//!
//! The gateway itself only emits `tracing` spans and events; it never
//! installs a subscriber on its own.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::GatewayError;

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info"` or `"pubgate_gateway=debug"`) when the
/// variable is unset or invalid.
///
/// # Errors
///
/// Returns [`GatewayError::Configuration`] if the directive is invalid or a
/// global subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), GatewayError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|e| {
            GatewayError::Configuration(format!("invalid log directive '{default_directive}': {e}"))
        })?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| GatewayError::Configuration(format!("tracing already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test in this crate that installs a global subscriber, so the
    // first install is expected to succeed.
    #[test]
    fn installs_once_then_rejects() {
        init_tracing("warn").unwrap();
        tracing::info!("subscriber installed");

        let err = init_tracing("warn").unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(ref m) if m.contains("already")));
    }
}
