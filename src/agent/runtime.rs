//! Live, handshake-derived state of a running agent.

use super::definition::AgentDefinition;
use super::protocol::{lenient, Handshake};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle status of a registered agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Exited,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Online => write!(f, "online"),
            AgentStatus::Exited => write!(f, "exited"),
        }
    }
}

/// One tool advertised by an agent during its handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub description: String,
    /// JSON schema for the tool's arguments, if the agent sent one.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::object_only"
    )]
    pub parameters: Option<Value>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
        }
    }
}

/// Runtime info recorded when an agent completes its handshake.
///
/// `name` is always the registry key so that routing never depends on what
/// the agent calls itself; the self-reported name lands in `display_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRuntimeInfo {
    pub name: String,
    pub display_name: String,
    pub capabilities: Vec<String>,
    pub tools: Vec<ToolDescriptor>,
    pub version: String,
    pub protocol: String,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Catalog priority override copied from the definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl AgentRuntimeInfo {
    pub fn from_handshake(
        definition: &AgentDefinition,
        handshake: Handshake,
        pid: Option<u32>,
    ) -> Self {
        let mut capabilities: Vec<String> = Vec::with_capacity(handshake.capabilities.len());
        for capability in handshake.capabilities {
            if !capabilities.contains(&capability) {
                capabilities.push(capability);
            }
        }

        Self {
            name: definition.name.clone(),
            display_name: handshake
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| definition.name.clone()),
            capabilities,
            tools: handshake.tools,
            version: handshake.version.unwrap_or_else(|| "unknown".to_string()),
            protocol: handshake.protocol.unwrap_or_else(|| "unknown".to_string()),
            status: AgentStatus::Online,
            pid,
            description: definition.description.clone(),
            priority: definition.priority,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == AgentStatus::Online
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_handshake_defaults_and_dedup() {
        let def = AgentDefinition::new("Sim", "agentgraph-sim");
        let handshake: Handshake = serde_json::from_value(json!({
            "capabilities": ["echo", "search", "echo"],
            "tools": [{ "name": "search" }]
        }))
        .unwrap();

        let info = AgentRuntimeInfo::from_handshake(&def, handshake, Some(42));
        assert_eq!(info.name, "Sim");
        assert_eq!(info.display_name, "Sim");
        assert_eq!(info.capabilities, vec!["echo", "search"]);
        assert_eq!(info.version, "unknown");
        assert_eq!(info.protocol, "unknown");
        assert_eq!(info.tools[0].description, "");
        assert!(info.tools[0].parameters.is_none());
        assert!(info.is_online());
        assert_eq!(info.pid, Some(42));
    }

    #[test]
    fn test_self_reported_name_does_not_replace_key() {
        let def = AgentDefinition::new("Sim", "agentgraph-sim");
        let handshake: Handshake =
            serde_json::from_value(json!({ "name": "Simulator", "version": "1.2.0" })).unwrap();
        let info = AgentRuntimeInfo::from_handshake(&def, handshake, None);
        assert_eq!(info.name, "Sim");
        assert_eq!(info.display_name, "Simulator");
        assert_eq!(info.version, "1.2.0");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(AgentStatus::Exited).unwrap(), json!("exited"));
        assert_eq!(AgentStatus::Online.to_string(), "online");
    }
}
