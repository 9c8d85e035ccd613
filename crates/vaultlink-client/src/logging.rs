//! Opt-in logging initialization for binaries embedding the client.

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber from the logging config.
/// `RUST_LOG` wins over the configured level when set. Call at most once
/// per process.
pub fn init(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
