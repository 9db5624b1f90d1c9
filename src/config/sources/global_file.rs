//! Global config file: $XDG_CONFIG_HOME/agentgraph/config.toml

use crate::config::paths;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};

/// Add the global file if its location can be determined. Missing files are
/// skipped.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match paths::global_config_path() {
        Ok(path) => Ok(builder.add_source(File::from(path).required(false))),
        Err(e) => {
            tracing::debug!(error = %e, "No global config location");
            Ok(builder)
        }
    }
}
