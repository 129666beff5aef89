//! Logging initialization.
//!
//! Deliberately minimal: a `tracing-subscriber` `EnvFilter` driven by
//! `LOG_LEVEL`, writing formatted lines to stdout. No span export, no
//! OpenTelemetry collector — this service's logs are consumed as plain
//! process output, not shipped anywhere.

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Call once, near the top of `main`.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
