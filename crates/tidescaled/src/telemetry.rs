//! Tracing subscriber setup.

use tidescale_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides `logging.filter`.
pub fn init(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.filter)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
