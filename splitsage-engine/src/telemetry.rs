use anyhow::{anyhow, Context, Result};
use splitsage_config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber described by `config`.
///
/// Fails if the level is not a valid filter directive or a subscriber is
/// already installed.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("invalid log filter '{}'", config.level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}
