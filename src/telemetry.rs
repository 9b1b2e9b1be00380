//! Log output for the command-line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary embedding it.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install a stderr `fmt` subscriber. `RUST_LOG` takes precedence over the
/// configured level. Calling this twice is harmless.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Force navigator decisions on, whatever the configured level.
pub fn debug_directive() -> &'static str {
    "ubmod_dw::navigator=debug"
}
