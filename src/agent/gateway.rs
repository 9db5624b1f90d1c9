//! Agent gateway contract.
//!
//! The catalog and the tool dispatcher only need to see which agents are
//! online and to send them commands. `AgentRegistry` is the production
//! implementation.

use super::runtime::AgentRuntimeInfo;
use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Runtime info of every agent that has completed a handshake.
    fn list_agents(&self) -> Vec<AgentRuntimeInfo>;

    /// Send a command and wait for the correlated response.
    async fn send_command(
        &self,
        agent: &str,
        command: &str,
        args: Value,
    ) -> Result<Value, ApiError>;
}
