//! Logging and tracing setup.
//!
//! Structured logging for all Integration Hub binaries, configured via the
//! `RUST_LOG` environment variable.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for interactive/development use: compact, colored,
/// human-readable lines.
///
/// ```text
/// RUST_LOG=debug cargo run            -> debug and higher
/// RUST_LOG=hub_core=trace cargo run   -> trace only for hub_core
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .compact(),
        )
        .init();
}

/// Initialize tracing with JSON output, for aggregation in production.
pub fn init_tracing_json() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_current_span(true),
        )
        .init();
}
