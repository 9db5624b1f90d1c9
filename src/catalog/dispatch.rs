//! Routing of tool calls and execution of the built-in graph tools.

use super::tool_id::{BuiltinTool, ToolId};
use super::ToolCatalog;
use crate::error::ApiError;
use crate::graph::{
    EntityInput, EntityUpdate, GraphQuery, GraphStore, ObservationInput, RelationInput,
    ResourceKind,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Where a resolved tool call goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Graph { tool: BuiltinTool, body: Value },
    Agent {
        agent: String,
        command: String,
        args: Value,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentCommandArgs {
    agent_id: String,
    command: String,
    #[serde(default)]
    args: Value,
}

/// Resolve a tool call against the catalog.
pub fn route(catalog: &ToolCatalog, name: &str, args: Value) -> Result<Route, ApiError> {
    let entry = catalog
        .get(name)
        .ok_or_else(|| ApiError::UnknownTool(name.to_string()))?;

    match &entry.id {
        ToolId::Builtin(BuiltinTool::AgentCommand) => {
            let parsed: AgentCommandArgs = parse_args(BuiltinTool::AgentCommand.name(), args)?;
            Ok(Route::Agent {
                agent: parsed.agent_id,
                command: parsed.command,
                args: object_or_empty(parsed.args),
            })
        }
        ToolId::Builtin(tool) => Ok(Route::Graph {
            tool: *tool,
            body: args,
        }),
        ToolId::Agent {
            agent_name,
            tool_name,
        } => Ok(Route::Agent {
            agent: agent_name.clone(),
            command: tool_name.clone(),
            args: object_or_empty(args),
        }),
    }
}

fn object_or_empty(value: Value) -> Value {
    match value {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, body: Value) -> Result<T, ApiError> {
    serde_json::from_value(object_or_empty(body)).map_err(|e| ApiError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntitiesArgs {
    entities: Value,
}

impl EntitiesArgs {
    /// Each element is read on its own so one bad entry cannot sink the batch.
    fn into_inputs(self) -> Vec<EntityInput> {
        match self.entities {
            Value::Array(items) => items.iter().map(EntityInput::from_value).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ReadGraphArgs {
    limit: usize,
    offset: usize,
}

impl Default for ReadGraphArgs {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelationsArgs {
    relations: Vec<RelationInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ObservationsArgs {
    observations: Vec<ObservationInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DeleteArgs {
    entity_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateArgs {
    updates: Vec<EntityUpdate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListResourcesArgs {
    #[serde(rename = "type")]
    kind: ResourceKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetResourceArgs {
    resource_id: String,
}

/// Run one graph tool and build its `{success, ...}` envelope.
///
/// Read-only tools take the read lock; the rest take the write lock for the
/// duration of the store call only.
pub fn execute_graph_tool(
    graph: &RwLock<GraphStore>,
    tool: BuiltinTool,
    body: Value,
) -> Result<Value, ApiError> {
    let name = tool.name();
    let envelope = match tool {
        BuiltinTool::CreateEntities => {
            let args: EntitiesArgs = parse_args(name, body)?;
            let entities = graph.write().create_entities(args.into_inputs());
            json!({
                "success": true,
                "entities_created": entities.len(),
                "entities": entities,
            })
        }
        BuiltinTool::ReadGraph => {
            let args: ReadGraphArgs = parse_args(name, body)?;
            let page = graph.read().read_graph(args.limit, args.offset);
            json!({ "success": true, "graph": page })
        }
        BuiltinTool::CreateRelations => {
            let args: RelationsArgs = parse_args(name, body)?;
            let relations = graph.write().create_relations(args.relations);
            json!({
                "success": true,
                "relations_created": relations.len(),
                "relations": relations,
            })
        }
        BuiltinTool::AddObservations => {
            let args: ObservationsArgs = parse_args(name, body)?;
            let observations = graph.write().add_observations(args.observations);
            json!({
                "success": true,
                "observations_added": observations.len(),
                "observations": observations,
            })
        }
        BuiltinTool::QueryGraph => {
            let query: GraphQuery = parse_args(name, body)?;
            let results = graph.read().query_graph(&query);
            json!({
                "success": true,
                "query": query.query,
                "results": results,
                "total_found": results.len(),
            })
        }
        BuiltinTool::DeleteEntities => {
            let args: DeleteArgs = parse_args(name, body)?;
            let deleted = graph.write().delete_entities(&args.entity_ids);
            json!({
                "success": true,
                "entities_deleted": deleted.len(),
                "deleted_entities": deleted,
            })
        }
        BuiltinTool::UpdateEntities => {
            let args: UpdateArgs = parse_args(name, body)?;
            let entities = graph.write().update_entities(args.updates);
            json!({
                "success": true,
                "entities_updated": entities.len(),
                "entities": entities,
            })
        }
        BuiltinTool::ListResources => {
            let args: ListResourcesArgs = parse_args(name, body)?;
            let resources = graph.read().list_resources(args.kind);
            json!({
                "success": true,
                "total": resources.len(),
                "resources": resources,
            })
        }
        BuiltinTool::GetResource => {
            let args: GetResourceArgs = parse_args(name, body)?;
            match graph.read().get_resource(&args.resource_id) {
                Some(resource) => json!({ "success": true, "resource": resource }),
                None => json!({ "success": false, "error": "Resource not found" }),
            }
        }
        BuiltinTool::AgentCommand => {
            return Err(ApiError::InvalidArguments {
                tool: name.to_string(),
                reason: "agent_command is routed to the agent registry".to_string(),
            })
        }
    };
    Ok(envelope)
}
