//! Error types for graph, agent, and catalog operations.

use thiserror::Error;

/// Persistence layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Public error for every operation exposed by the crate.
///
/// The boundary layer turns these into `{success: false, error}` envelopes;
/// nothing in the library panics on a caller-triggered failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Agent \"{0}\" not found or not running")]
    AgentNotFound(String),

    #[error("Agent \"{name}\" is not online (status: {status})")]
    AgentOffline { name: String, status: String },

    #[error("Failed to spawn agent \"{name}\": {reason}")]
    AgentSpawnFailed { name: String, reason: String },

    #[error("Command timeout for agent \"{agent}\" (request {request_id}, {timeout_ms}ms)")]
    CommandTimeout {
        agent: String,
        request_id: String,
        timeout_ms: u64,
    },

    #[error("Agent \"{agent}\" returned an error: {message}")]
    CommandFailed { agent: String, message: String },

    #[error("Failed to send command to agent \"{agent}\": {reason}")]
    CommandSendFailed { agent: String, reason: String },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::StorageError(StorageError::IoError(err))
    }
}

impl ApiError {
    /// Whether the failure came from the agent side of a command exchange
    /// rather than from local validation.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            ApiError::CommandTimeout { .. }
                | ApiError::CommandFailed { .. }
                | ApiError::CommandSendFailed { .. }
        )
    }
}
