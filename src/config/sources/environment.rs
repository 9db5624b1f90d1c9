//! Environment variable source: AGENTGRAPH__* with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub const ENV_PREFIX: &str = "AGENTGRAPH";

pub fn source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

/// Add environment variable overlay to builder.
///
/// `AGENTGRAPH__AGENTS__COMMAND_TIMEOUT_MS=5000` sets
/// `agents.command_timeout_ms`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(source()))
}
