//! Logging initialization

use crate::config::LogSettings;
use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber at the configured level.
///
/// `RUST_LOG` overrides the configured level. Returns `false` if a global
/// subscriber was already installed, which is not an error.
pub fn init_logging(settings: &LogSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
