//! Knowledge graph records and the request shapes that create or query them.
//!
//! Field names serialize in camelCase because the same JSON crosses the tool
//! boundary to LLM function calls and lands in the snapshot file.

use crate::types::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A named node of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<String>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Keys merged in by `update_entities` that are not first-class fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Directed edge between two entity names. `from`/`to` are weak references:
/// nothing checks that an entity with that name exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub relation_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub created_at: Timestamp,
}

/// Standalone observation record; entities with a matching name also receive
/// a copy of `contents` in their own `observations` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    #[serde(default)]
    pub entity_name: String,
    #[serde(default)]
    pub contents: Vec<String>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityInput {
    pub name: Option<String>,
    pub entity_type: Option<String>,
    pub observations: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

impl EntityInput {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            entity_type: Some(entity_type.into()),
            ..Self::default()
        }
    }

    pub fn with_observations<I, S>(mut self, observations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observations = Some(observations.into_iter().map(Into::into).collect());
        self
    }

    /// Build an input from arbitrary JSON, field by field.
    ///
    /// Never fails: a missing or wrongly-typed field is left unset, and
    /// non-string observation items are dropped.
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| value.get(key);
        Self {
            name: field("name").and_then(Value::as_str).map(str::to_string),
            entity_type: field("entityType")
                .and_then(Value::as_str)
                .map(str::to_string),
            observations: field("observations").and_then(Value::as_array).map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            }),
            metadata: field("metadata").and_then(Value::as_object).cloned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationInput {
    pub from: Option<String>,
    pub to: Option<String>,
    pub relation_type: Option<String>,
    pub properties: Option<Map<String, Value>>,
}

impl RelationInput {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
            relation_type: Some(relation_type.into()),
            properties: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObservationInput {
    pub entity_name: Option<String>,
    pub contents: Option<Vec<String>>,
}

impl ObservationInput {
    pub fn new<I, S>(entity_name: impl Into<String>, contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity_name: Some(entity_name.into()),
            contents: Some(contents.into_iter().map(Into::into).collect()),
        }
    }
}

/// Shallow merge request for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityUpdate {
    pub entity_id: String,
    #[serde(default)]
    pub changes: Map<String, Value>,
}

fn default_query_limit() -> usize {
    50
}

fn default_true() -> bool {
    true
}

/// A non-string `query` searches for the empty string.
fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_str()
        .map(str::to_string)
        .unwrap_or_default())
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_str()
        .map(str::to_string))
}

/// Parameters for `GraphStore::query_graph`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQuery {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub query: String,
    #[serde(default, deserialize_with = "string_or_none")]
    pub entity_type: Option<String>,
    #[serde(default = "default_query_limit")]
    pub limit: usize,
    #[serde(default = "default_true")]
    pub include_observations: bool,
}

impl GraphQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            entity_type: None,
            limit: default_query_limit(),
            include_observations: true,
        }
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn without_observations(mut self) -> Self {
        self.include_observations = false;
        self
    }
}

/// One search hit, tagged with `resultType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resultType", rename_all = "lowercase")]
pub enum QueryHit {
    Entity(Entity),
    Observation(Observation),
}

impl QueryHit {
    pub fn id(&self) -> &str {
        match self {
            QueryHit::Entity(e) => &e.id,
            QueryHit::Observation(o) => &o.id,
        }
    }
}

/// Paginated graph window returned by `read_graph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPage {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub total_entities: usize,
    pub total_relations: usize,
}

/// Filter for `list_resources`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    All,
    Entities,
    Relations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub id: String,
}

/// Any record addressable by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphResource {
    Entity(Entity),
    Relation(Relation),
    Observation(Observation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub entities: usize,
    pub relations: usize,
    pub observations: usize,
}

/// Plain-array dump of the whole graph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphExport {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub observations: Vec<Observation>,
    pub exported_at: Timestamp,
}
