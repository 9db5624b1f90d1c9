//! Descriptions and argument schemas of the built-in tools.

use super::tool_id::BuiltinTool;
use serde_json::{json, Value};

pub fn description(tool: BuiltinTool) -> &'static str {
    match tool {
        BuiltinTool::CreateEntities => {
            "Create new entities in the knowledge graph. Use this to store new information, notes, or concepts."
        }
        BuiltinTool::ReadGraph => "Read a page of entities and relations from the knowledge graph.",
        BuiltinTool::CreateRelations => "Create directed relations between entities, referenced by name.",
        BuiltinTool::AddObservations => {
            "Add observations or notes to existing entities in the knowledge graph."
        }
        BuiltinTool::QueryGraph => {
            "Search entities and observations by case-insensitive substring, optionally filtered by entity type."
        }
        BuiltinTool::DeleteEntities => "Delete entities by id. Relations and observations are kept.",
        BuiltinTool::UpdateEntities => "Merge field changes into existing entities, addressed by id.",
        BuiltinTool::ListResources => "List graph resources (entities, relations, or both) by type, name and id.",
        BuiltinTool::GetResource => "Fetch a single entity, relation, or observation by id.",
        BuiltinTool::AgentCommand => {
            "Send a command to a discovered agent. Use this to interact with external tools, services, or specialized agents."
        }
    }
}

pub fn parameters(tool: BuiltinTool) -> Value {
    match tool {
        BuiltinTool::CreateEntities => json!({
            "type": "object",
            "properties": {
                "entities": {
                    "type": "array",
                    "description": "Array of entities to create",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "description": "Name of the entity" },
                            "entityType": {
                                "type": "string",
                                "description": "Type of entity (e.g., \"note\", \"concept\", \"project\")"
                            },
                            "observations": {
                                "type": "array",
                                "description": "Array of observation strings about this entity",
                                "items": { "type": "string" }
                            },
                            "metadata": { "type": "object", "description": "Free-form metadata" }
                        },
                        "required": ["name", "entityType", "observations"]
                    }
                }
            },
            "required": ["entities"]
        }),
        BuiltinTool::ReadGraph => json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "minimum": 0, "default": 100, "description": "Page size" },
                "offset": { "type": "integer", "minimum": 0, "default": 0, "description": "Records to skip" }
            }
        }),
        BuiltinTool::CreateRelations => json!({
            "type": "object",
            "properties": {
                "relations": {
                    "type": "array",
                    "description": "Array of relations to create",
                    "items": {
                        "type": "object",
                        "properties": {
                            "from": { "type": "string", "description": "Source entity name" },
                            "to": { "type": "string", "description": "Target entity name" },
                            "relationType": { "type": "string", "description": "Kind of relation, in active voice" },
                            "properties": { "type": "object", "description": "Free-form relation properties" }
                        },
                        "required": ["from", "to", "relationType"]
                    }
                }
            },
            "required": ["relations"]
        }),
        BuiltinTool::AddObservations => json!({
            "type": "object",
            "properties": {
                "observations": {
                    "type": "array",
                    "description": "Array of observations to add",
                    "items": {
                        "type": "object",
                        "properties": {
                            "entityName": { "type": "string", "description": "Name of the entity to add observations to" },
                            "contents": {
                                "type": "array",
                                "description": "Array of observation content strings",
                                "items": { "type": "string" }
                            }
                        },
                        "required": ["entityName", "contents"]
                    }
                }
            },
            "required": ["observations"]
        }),
        BuiltinTool::QueryGraph => json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Text to look for; empty matches everything" },
                "entityType": { "type": "string", "description": "Only return entities of this exact type" },
                "limit": { "type": "integer", "minimum": 0, "default": 50, "description": "Maximum results" },
                "includeObservations": {
                    "type": "boolean",
                    "default": true,
                    "description": "Also search standalone observations"
                }
            },
            "required": ["query"]
        }),
        BuiltinTool::DeleteEntities => json!({
            "type": "object",
            "properties": {
                "entityIds": {
                    "type": "array",
                    "description": "Ids of the entities to delete",
                    "items": { "type": "string" }
                }
            },
            "required": ["entityIds"]
        }),
        BuiltinTool::UpdateEntities => json!({
            "type": "object",
            "properties": {
                "updates": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "entityId": { "type": "string", "description": "Id of the entity to update" },
                            "changes": { "type": "object", "description": "Fields to overwrite" }
                        },
                        "required": ["entityId", "changes"]
                    }
                }
            },
            "required": ["updates"]
        }),
        BuiltinTool::ListResources => json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["all", "entities", "relations"],
                    "default": "all",
                    "description": "Which collections to list"
                }
            }
        }),
        BuiltinTool::GetResource => json!({
            "type": "object",
            "properties": {
                "resourceId": { "type": "string", "description": "Id of an entity, relation, or observation" }
            },
            "required": ["resourceId"]
        }),
        BuiltinTool::AgentCommand => json!({
            "type": "object",
            "properties": {
                "agentId": {
                    "type": "string",
                    "description": "The ID or name of the agent to send the command to"
                },
                "command": { "type": "string", "description": "The command to execute on the agent" },
                "args": { "type": "object", "description": "Arguments for the command" }
            },
            "required": ["agentId", "command"]
        }),
    }
}

/// Schema used for agent tools that did not advertise one.
pub fn empty_parameters() -> Value {
    json!({ "type": "object", "properties": {} })
}
