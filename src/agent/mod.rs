//! External Agents
//!
//! Long-lived child processes speaking line-delimited JSON over STDIO. The
//! registry launches them from a JSON registry file, records what each one
//! advertises in its handshake, and correlates commands with responses.

pub mod definition;
pub mod gateway;
pub mod process;
pub mod protocol;
mod registry;
pub mod runtime;

pub use definition::{load_registry_file, validate_agent_definition, AgentDefinition};
pub use gateway::AgentGateway;
pub use process::{AgentEvent, AgentProcess, LineBuffer};
pub use protocol::{AgentMessage, CommandResponse, Handshake, HostMessage, Inbound};
pub use registry::{AgentRegistry, DEFAULT_COMMAND_TIMEOUT};
pub use runtime::{AgentRuntimeInfo, AgentStatus, ToolDescriptor};
