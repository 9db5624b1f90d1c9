//! Tool Catalog
//!
//! One flat, prioritized tool list merging the built-in graph tools with the
//! tools advertised by every online agent. Rebuilt on each request.

pub mod builtin;
pub mod dispatch;
pub mod tool_id;

use crate::agent::AgentRuntimeInfo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::warn;

pub use dispatch::{execute_graph_tool, route, Route};
pub use tool_id::{BuiltinTool, ToolId, ToolSource};

/// Priority tiers. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_agent_priority")]
    pub agent_priority: u32,
    #[serde(default = "default_builtin_priority")]
    pub builtin_priority: u32,
}

fn default_agent_priority() -> u32 {
    10
}

fn default_builtin_priority() -> u32 {
    20
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            agent_priority: default_agent_priority(),
            builtin_priority: default_builtin_priority(),
        }
    }
}

/// A tool descriptor together with where it routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    #[serde(skip)]
    pub id: ToolId,
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub priority: u32,
    pub source: ToolSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl CatalogEntry {
    /// OpenAI-style function definition.
    pub fn function_spec(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolCatalog {
    entries: Vec<CatalogEntry>,
}

impl ToolCatalog {
    /// Build the catalog from the agents currently known.
    ///
    /// Only online agents contribute tools. Agents are visited by name so
    /// that ties between equal priorities resolve the same way every time.
    pub fn build(agents: &[AgentRuntimeInfo], settings: &CatalogSettings) -> Self {
        let mut entries: Vec<CatalogEntry> = BuiltinTool::ALL
            .into_iter()
            .map(|tool| CatalogEntry {
                id: ToolId::Builtin(tool),
                name: tool.name().to_string(),
                description: builtin::description(tool).to_string(),
                parameters: builtin::parameters(tool),
                priority: settings.builtin_priority,
                source: ToolSource::Builtin,
                agent: None,
            })
            .collect();

        let mut online: Vec<&AgentRuntimeInfo> = agents.iter().filter(|a| a.is_online()).collect();
        online.sort_by(|a, b| a.name.cmp(&b.name));

        for agent in online {
            let priority = agent.priority.unwrap_or(settings.agent_priority);
            for tool in &agent.tools {
                let id = ToolId::agent(&agent.name, &tool.name);
                let description = if tool.description.is_empty() {
                    format!("{} tool provided by agent {}", tool.name, agent.display_name)
                } else {
                    tool.description.clone()
                };
                entries.push(CatalogEntry {
                    name: id.exposed_name(),
                    id,
                    description,
                    parameters: tool
                        .parameters
                        .clone()
                        .unwrap_or_else(builtin::empty_parameters),
                    priority,
                    source: ToolSource::Agent,
                    agent: Some(agent.name.clone()),
                });
            }
        }

        // Stable: equal priorities keep discovery order.
        entries.sort_by_key(|e| e.priority);
        let catalog = Self { entries };
        for name in catalog.duplicate_names() {
            warn!(tool = %name, "Duplicate exposed tool name; calls route to the first entry");
        }
        catalog
    }

    /// Exposed names carried by more than one entry, e.g. agent `a_b` with
    /// tool `c` and agent `a` with tool `b_c`.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for entry in &self.entries {
            let name = entry.name.as_str();
            if !seen.insert(name) && !duplicates.contains(&name) {
                duplicates.push(name);
            }
        }
        duplicates
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// First entry with the given name; with duplicate names the preferred
    /// one wins.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn function_specs(&self) -> Vec<Value> {
        self.entries.iter().map(CatalogEntry::function_spec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentStatus, ToolDescriptor};

    pub(crate) fn agent(name: &str, tools: &[&str], status: AgentStatus) -> AgentRuntimeInfo {
        AgentRuntimeInfo {
            name: name.to_string(),
            display_name: name.to_string(),
            capabilities: Vec::new(),
            tools: tools
                .iter()
                .map(|t| ToolDescriptor::new(*t, format!("{} tool", t)))
                .collect(),
            version: "1.0.0".to_string(),
            protocol: "stdio-json".to_string(),
            status,
            pid: None,
            description: None,
            priority: None,
        }
    }

    #[test]
    fn test_builtins_only_when_no_agents() {
        let catalog = ToolCatalog::build(&[], &CatalogSettings::default());
        assert_eq!(catalog.len(), BuiltinTool::ALL.len());
        assert_eq!(catalog.names()[0], "create_entities");
        assert!(catalog.get("agent_command").is_some());
    }

    #[test]
    fn test_agent_tools_sort_ahead_of_builtins() {
        let agents = vec![
            agent("Zed", &["z1"], AgentStatus::Online),
            agent("Sim", &["search", "echo"], AgentStatus::Online),
        ];
        let catalog = ToolCatalog::build(&agents, &CatalogSettings::default());
        let names = catalog.names();
        assert_eq!(
            &names[..3],
            &["agent_Sim_search", "agent_Sim_echo", "agent_Zed_z1"]
        );
        assert_eq!(names[3], "create_entities");

        let entry = catalog.get("agent_Sim_search").unwrap();
        assert_eq!(entry.id, ToolId::agent("Sim", "search"));
        assert_eq!(entry.agent.as_deref(), Some("Sim"));
        assert_eq!(entry.parameters, builtin::empty_parameters());
    }

    #[test]
    fn test_exited_agents_contribute_nothing() {
        let agents = vec![agent("Sim", &["search"], AgentStatus::Exited)];
        let catalog = ToolCatalog::build(&agents, &CatalogSettings::default());
        assert!(catalog.get("agent_Sim_search").is_none());
    }

    #[test]
    fn test_priority_override_and_settings() {
        let mut slow = agent("Slow", &["t"], AgentStatus::Online);
        slow.priority = Some(99);
        let settings = CatalogSettings {
            agent_priority: 10,
            builtin_priority: 5,
        };
        let catalog = ToolCatalog::build(&[slow], &settings);
        assert_eq!(catalog.names().last().copied(), Some("agent_Slow_t"));
        assert_eq!(catalog.entries()[0].priority, 5);
    }

    #[test]
    fn test_colliding_exposed_names_are_detected() {
        let agents = vec![
            agent("a_b", &["c"], AgentStatus::Online),
            agent("a", &["b_c"], AgentStatus::Online),
        ];
        let catalog = ToolCatalog::build(&agents, &CatalogSettings::default());
        assert_eq!(catalog.duplicate_names(), vec!["agent_a_b_c"]);
        // Agents are visited by name, so `a` wins the lookup.
        assert_eq!(catalog.get("agent_a_b_c").unwrap().agent.as_deref(), Some("a"));

        let clean = ToolCatalog::build(
            &[agent("Sim", &["search"], AgentStatus::Online)],
            &CatalogSettings::default(),
        );
        assert!(clean.duplicate_names().is_empty());
    }

    #[test]
    fn test_function_spec_shape() {
        let catalog = ToolCatalog::build(&[], &CatalogSettings::default());
        let spec = &catalog.function_specs()[0];
        assert_eq!(spec["type"], "function");
        assert_eq!(spec["function"]["name"], "create_entities");
        assert_eq!(spec["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_entry_serializes_source() {
        let agents = vec![agent("Sim", &["search"], AgentStatus::Online)];
        let catalog = ToolCatalog::build(&agents, &CatalogSettings::default());
        let value = serde_json::to_value(&catalog).unwrap();
        assert_eq!(value[0]["source"], "agent");
        assert_eq!(value[0]["agent"], "Sim");
        assert!(value[0].get("id").is_none());
    }
}
