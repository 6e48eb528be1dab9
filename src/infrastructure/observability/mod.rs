//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a single
//! fmt layer, pretty for terminals or JSON for log shippers (Loki, Fluentd,
//! CloudWatch).

use crate::config::{LogFormat, ObservabilityEnvConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Installs the global subscriber.
///
/// Returns `false` when a subscriber was already installed (tests, embedding
/// applications); the existing one is left untouched.
pub fn init_tracing(config: &ObservabilityEnvConfig) -> bool {
    let filter = filter_for(&config.log_filter);

    let result = match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).pretty())
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            )
            .try_init(),
    };
    result.is_ok()
}

/// Parses filter directives, falling back to `info` when they are invalid.
fn filter_for(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}
