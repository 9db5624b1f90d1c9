//! Built-in defaults, the lowest layer of every merge.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    ConfigBuilder::<DefaultState>::default()
        .set_default("storage.registry_path", "agent-registry.json")?
        .set_default("agents.command_timeout_ms", 30_000i64)?
        .set_default("agents.handshake_wait_ms", 2_000i64)?
        .set_default("catalog.agent_priority", 10i64)?
        .set_default("catalog.builtin_priority", 20i64)
}
