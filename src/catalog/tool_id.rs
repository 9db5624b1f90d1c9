//! Tool identifiers resolved once when the catalog is built.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in tools backed by the graph store, plus the generic agent command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinTool {
    CreateEntities,
    ReadGraph,
    CreateRelations,
    AddObservations,
    QueryGraph,
    DeleteEntities,
    UpdateEntities,
    ListResources,
    GetResource,
    AgentCommand,
}

impl BuiltinTool {
    /// Catalog order of the built-in tools.
    pub const ALL: [BuiltinTool; 10] = [
        BuiltinTool::CreateEntities,
        BuiltinTool::ReadGraph,
        BuiltinTool::CreateRelations,
        BuiltinTool::AddObservations,
        BuiltinTool::QueryGraph,
        BuiltinTool::DeleteEntities,
        BuiltinTool::UpdateEntities,
        BuiltinTool::ListResources,
        BuiltinTool::GetResource,
        BuiltinTool::AgentCommand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinTool::CreateEntities => "create_entities",
            BuiltinTool::ReadGraph => "read_graph",
            BuiltinTool::CreateRelations => "create_relations",
            BuiltinTool::AddObservations => "add_observations",
            BuiltinTool::QueryGraph => "query_graph",
            BuiltinTool::DeleteEntities => "delete_entities",
            BuiltinTool::UpdateEntities => "update_entities",
            BuiltinTool::ListResources => "list_resources",
            BuiltinTool::GetResource => "get_resource",
            BuiltinTool::AgentCommand => "agent_command",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Whether the tool operates on the graph store.
    pub fn is_graph_tool(self) -> bool {
        !matches!(self, BuiltinTool::AgentCommand)
    }

    /// Whether a successful call changes the graph.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            BuiltinTool::CreateEntities
                | BuiltinTool::CreateRelations
                | BuiltinTool::AddObservations
                | BuiltinTool::DeleteEntities
                | BuiltinTool::UpdateEntities
        )
    }
}

impl fmt::Display for BuiltinTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a catalog entry routes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolId {
    Builtin(BuiltinTool),
    Agent { agent_name: String, tool_name: String },
}

impl ToolId {
    pub fn agent(agent_name: impl Into<String>, tool_name: impl Into<String>) -> Self {
        ToolId::Agent {
            agent_name: agent_name.into(),
            tool_name: tool_name.into(),
        }
    }

    /// Flat name presented to function-calling clients.
    pub fn exposed_name(&self) -> String {
        match self {
            ToolId::Builtin(tool) => tool.name().to_string(),
            ToolId::Agent {
                agent_name,
                tool_name,
            } => format!("agent_{}_{}", agent_name, tool_name),
        }
    }

    pub fn source(&self) -> ToolSource {
        match self {
            ToolId::Builtin(_) => ToolSource::Builtin,
            ToolId::Agent { .. } => ToolSource::Agent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    Builtin,
    Agent,
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolSource::Builtin => write!(f, "builtin"),
            ToolSource::Agent => write!(f, "agent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_round_trip() {
        for tool in BuiltinTool::ALL {
            assert_eq!(BuiltinTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(BuiltinTool::from_name("agent_Sim_search"), None);
    }

    #[test]
    fn test_agent_tool_name_is_namespaced() {
        let id = ToolId::agent("Sim", "search");
        assert_eq!(id.exposed_name(), "agent_Sim_search");
        assert_eq!(id.source(), ToolSource::Agent);
    }

    #[test]
    fn test_mutation_classification() {
        assert!(BuiltinTool::UpdateEntities.is_mutation());
        assert!(!BuiltinTool::QueryGraph.is_mutation());
        assert!(!BuiltinTool::AgentCommand.is_graph_tool());
    }
}
