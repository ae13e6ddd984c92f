//! Structured logging via `tracing`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DebugConfig;

const DEFAULT_FILTER: &str = "info";

/// Install the console subscriber. `RUST_LOG` wins over the configured level.
///
/// Returns false when a global subscriber was already installed.
pub fn init_logging(config: &DebugConfig) -> bool {
    let filter_str = if config.log_level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else {
        config.log_level.clone()
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .is_ok()
}

pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
