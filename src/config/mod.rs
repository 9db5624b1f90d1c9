//! Configuration
//!
//! Layered settings (defaults, global file, workspace file, environment)
//! merged with the `config` crate into one `AgentGraphConfig`.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod workspace;

use crate::catalog::CatalogSettings;
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use facade::ConfigLoader;
pub use workspace::StorageConfig;

fn default_command_timeout_ms() -> u64 {
    30_000
}

fn default_handshake_wait_ms() -> u64 {
    2_000
}

/// Agent supervision settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// How long a command waits for its response
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// How long the CLI waits for auto-started agents to hand-shake
    #[serde(default = "default_handshake_wait_ms")]
    pub handshake_wait_ms: u64,
}

impl AgentsConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn handshake_wait(&self) -> Duration {
        Duration::from_millis(self.handshake_wait_ms)
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            handshake_wait_ms: default_handshake_wait_ms(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentGraphConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub agents: AgentsConfig,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgentGraphConfig {
    /// Reject settings that would make the runtime misbehave.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if self.agents.command_timeout_ms == 0 {
            errors.push("agents.command_timeout_ms must be greater than zero".to_string());
        }
        if self.storage.registry_path.as_os_str().is_empty() {
            errors.push("storage.registry_path cannot be empty".to_string());
        }
        if let Some(path) = &self.storage.snapshot_path {
            if path.as_os_str().is_empty() {
                errors.push("storage.snapshot_path cannot be empty".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ConfigError(errors.join("; ")))
        }
    }
}
