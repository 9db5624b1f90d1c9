//! In-memory knowledge graph.
//!
//! Three insertion-ordered collections (entities, relations, standalone
//! observations). Every operation runs to completion under the caller's lock,
//! so readers never see a half-applied batch.

use super::model::{
    Entity, EntityInput, EntityUpdate, GraphExport, GraphPage, GraphQuery, GraphResource,
    GraphStatistics, Observation, ObservationInput, QueryHit, Relation, RelationInput,
    ResourceEntry, ResourceKind,
};
use crate::types::{generate_id, now};
use serde_json::Value;
use tracing::{debug, warn};

/// Fields `update_entities` never overwrites.
const IMMUTABLE_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStore {
    pub(crate) entities: Vec<Entity>,
    pub(crate) relations: Vec<Relation>,
    pub(crate) observations: Vec<Observation>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create entities, defaulting absent collections to empty.
    pub fn create_entities(&mut self, inputs: Vec<EntityInput>) -> Vec<Entity> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let name = input.name.unwrap_or_default();
            let prefix = if name.is_empty() { "entity" } else { name.as_str() };
            let entity = Entity {
                id: generate_id(prefix),
                name: name.clone(),
                entity_type: input.entity_type.unwrap_or_default(),
                observations: input.observations.unwrap_or_default(),
                created_at: now(),
                updated_at: None,
                metadata: input.metadata.unwrap_or_default(),
                extra: Default::default(),
            };
            debug!(entity = %entity.name, id = %entity.id, "Entity created");
            self.entities.push(entity.clone());
            created.push(entity);
        }
        created
    }

    /// Insertion-order window `[offset, offset + limit)` applied to entities
    /// and relations independently.
    pub fn read_graph(&self, limit: usize, offset: usize) -> GraphPage {
        GraphPage {
            entities: window(&self.entities, offset, limit),
            relations: window(&self.relations, offset, limit),
            total_entities: self.entities.len(),
            total_relations: self.relations.len(),
        }
    }

    /// Case-insensitive substring search.
    ///
    /// Entities are scanned first in insertion order, then (if capacity remains
    /// and `include_observations` is set) standalone observations. Scanning stops
    /// as soon as `limit` hits are collected.
    pub fn query_graph(&self, query: &GraphQuery) -> Vec<QueryHit> {
        let needle = query.query.to_lowercase();
        let type_filter = query.entity_type.as_deref().filter(|t| !t.is_empty());
        let mut hits = Vec::new();
        if query.limit == 0 {
            return hits;
        }

        for entity in &self.entities {
            if let Some(wanted) = type_filter {
                if entity.entity_type != wanted {
                    continue;
                }
            }
            if entity_matches(entity, &needle) {
                hits.push(QueryHit::Entity(entity.clone()));
                if hits.len() >= query.limit {
                    return hits;
                }
            }
        }

        if !query.include_observations {
            return hits;
        }

        for observation in &self.observations {
            // Observations carry no type of their own; under a type filter they
            // count only when their entity name resolves to an entity of that type.
            if let Some(wanted) = type_filter {
                let typed = self
                    .entities
                    .iter()
                    .any(|e| e.name == observation.entity_name && e.entity_type == wanted);
                if !typed {
                    continue;
                }
            }
            if observation_matches(observation, &needle) {
                hits.push(QueryHit::Observation(observation.clone()));
                if hits.len() >= query.limit {
                    break;
                }
            }
        }
        hits
    }

    /// Record one standalone observation per input and append its contents to
    /// every entity whose name matches. Never creates entities.
    pub fn add_observations(&mut self, inputs: Vec<ObservationInput>) -> Vec<Observation> {
        let mut added = Vec::with_capacity(inputs.len());
        for input in inputs {
            let entity_name = input.entity_name.unwrap_or_default();
            let contents = input.contents.unwrap_or_default();

            let mut matched = 0usize;
            for entity in self.entities.iter_mut().filter(|e| e.name == entity_name) {
                entity.observations.extend(contents.iter().cloned());
                matched += 1;
            }

            let observation = Observation {
                id: generate_id("obs"),
                entity_name,
                contents,
                timestamp: now(),
            };
            debug!(
                entity = %observation.entity_name,
                id = %observation.id,
                matched_entities = matched,
                "Observation added"
            );
            self.observations.push(observation.clone());
            added.push(observation);
        }
        added
    }

    /// Create relations without checking that either endpoint exists.
    pub fn create_relations(&mut self, inputs: Vec<RelationInput>) -> Vec<Relation> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let relation = Relation {
                id: generate_id("rel"),
                from: input.from.unwrap_or_default(),
                to: input.to.unwrap_or_default(),
                relation_type: input.relation_type.unwrap_or_default(),
                properties: input.properties.unwrap_or_default(),
                created_at: now(),
            };
            debug!(from = %relation.from, to = %relation.to, "Relation created");
            self.relations.push(relation.clone());
            created.push(relation);
        }
        created
    }

    pub fn list_resources(&self, kind: ResourceKind) -> Vec<ResourceEntry> {
        let mut resources = Vec::new();
        if matches!(kind, ResourceKind::All | ResourceKind::Entities) {
            resources.extend(self.entities.iter().map(|e| ResourceEntry {
                kind: "entity".to_string(),
                name: e.name.clone(),
                id: e.id.clone(),
            }));
        }
        if matches!(kind, ResourceKind::All | ResourceKind::Relations) {
            resources.extend(self.relations.iter().map(|r| ResourceEntry {
                kind: "relation".to_string(),
                name: format!("{} -> {}", r.from, r.to),
                id: r.id.clone(),
            }));
        }
        resources
    }

    /// Delete entities by id, returning the names removed. Relations and
    /// observations that mention those names are left in place.
    pub fn delete_entities(&mut self, ids: &[String]) -> Vec<String> {
        let mut deleted = Vec::new();
        for id in ids {
            if let Some(pos) = self.entities.iter().position(|e| &e.id == id) {
                let entity = self.entities.remove(pos);
                debug!(entity = %entity.name, id = %entity.id, "Entity deleted");
                deleted.push(entity.name);
            }
        }
        deleted
    }

    /// Shallow-merge `changes` onto each matched entity and stamp `updatedAt`.
    /// Unknown ids are skipped.
    pub fn update_entities(&mut self, updates: Vec<EntityUpdate>) -> Vec<Entity> {
        let mut updated = Vec::new();
        for update in updates {
            let Some(entity) = self.entities.iter_mut().find(|e| e.id == update.entity_id) else {
                debug!(id = %update.entity_id, "Update skipped, entity not found");
                continue;
            };
            for (key, value) in update.changes {
                apply_change(entity, key, value);
            }
            entity.updated_at = Some(now());
            updated.push(entity.clone());
        }
        updated
    }

    /// Look an id up in entities, then relations, then observations.
    pub fn get_resource(&self, id: &str) -> Option<GraphResource> {
        if let Some(e) = self.entities.iter().find(|e| e.id == id) {
            return Some(GraphResource::Entity(e.clone()));
        }
        if let Some(r) = self.relations.iter().find(|r| r.id == id) {
            return Some(GraphResource::Relation(r.clone()));
        }
        self.observations
            .iter()
            .find(|o| o.id == id)
            .map(|o| GraphResource::Observation(o.clone()))
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn statistics(&self) -> GraphStatistics {
        GraphStatistics {
            entities: self.entities.len(),
            relations: self.relations.len(),
            observations: self.observations.len(),
        }
    }

    pub fn export(&self) -> GraphExport {
        GraphExport {
            entities: self.entities.clone(),
            relations: self.relations.clone(),
            observations: self.observations.clone(),
            exported_at: now(),
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.relations.clear();
        self.observations.clear();
    }
}

fn window<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    items.iter().skip(offset).take(limit).cloned().collect()
}

fn entity_matches(entity: &Entity, needle: &str) -> bool {
    entity.name.to_lowercase().contains(needle)
        || entity
            .observations
            .iter()
            .any(|o| o.to_lowercase().contains(needle))
}

fn observation_matches(observation: &Observation, needle: &str) -> bool {
    observation.entity_name.to_lowercase().contains(needle)
        || observation
            .contents
            .iter()
            .any(|c| c.to_lowercase().contains(needle))
}

fn apply_change(entity: &mut Entity, key: String, value: Value) {
    if IMMUTABLE_FIELDS.contains(&key.as_str()) {
        warn!(id = %entity.id, field = %key, "Ignoring change to immutable entity field");
        return;
    }
    match key.as_str() {
        "name" | "entityType" => match value {
            Value::String(s) if key == "name" => entity.name = s,
            Value::String(s) => entity.entity_type = s,
            other => warn!(id = %entity.id, field = %key, value = %other, "Expected string"),
        },
        "observations" => match serde_json::from_value::<Vec<String>>(value) {
            Ok(list) => entity.observations = list,
            Err(e) => warn!(id = %entity.id, error = %e, "Expected string array for observations"),
        },
        "metadata" => match value {
            Value::Object(map) => entity.metadata = map,
            other => warn!(id = %entity.id, value = %other, "Expected object for metadata"),
        },
        _ => {
            entity.extra.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn seeded() -> GraphStore {
        let mut store = GraphStore::new();
        store.create_entities(vec![
            EntityInput::new("Note1", "note").with_observations(["hello world"]),
            EntityInput::new("Project Atlas", "project").with_observations(["uses Rust"]),
            EntityInput::new("Note2", "note"),
        ]);
        store
    }

    #[test]
    fn test_create_entities_distinct_ids_and_defaults() {
        let mut store = GraphStore::new();
        let created = store.create_entities(vec![
            EntityInput::new("A", "t"),
            EntityInput::new("A", "t"),
            EntityInput::default(),
        ]);
        let ids: HashSet<_> = created.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert!(created[2].id.starts_with("entity_"));
        assert!(created[2].observations.is_empty());
        assert!(created[2].metadata.is_empty());
        assert_eq!(store.read_graph(100, 0).total_entities, 3);
    }

    #[test]
    fn test_created_entity_immediately_queryable() {
        let mut store = GraphStore::new();
        store.create_entities(vec![
            EntityInput::new("Note1", "note").with_observations(["hello"]),
        ]);
        let hits = store.query_graph(&GraphQuery::new("hello"));
        assert_eq!(hits.len(), 1);
        match &hits[0] {
            QueryHit::Entity(e) => assert_eq!(e.name, "Note1"),
            other => panic!("unexpected hit {:?}", other),
        }
    }

    #[test]
    fn test_read_graph_windows_collections_independently() {
        let mut store = seeded();
        store.create_relations(vec![RelationInput::new("Note1", "Note2", "links")]);
        let page = store.read_graph(2, 1);
        assert_eq!(page.entities.len(), 2);
        assert_eq!(page.entities[0].name, "Project Atlas");
        assert!(page.relations.is_empty());
        assert_eq!(page.total_entities, 3);
        assert_eq!(page.total_relations, 1);
    }

    #[test]
    fn test_query_is_case_insensitive_and_type_filtered() {
        let store = seeded();
        let hits = store.query_graph(&GraphQuery::new("NOTE"));
        assert_eq!(hits.len(), 2);

        let hits = store.query_graph(&GraphQuery::new("rust").with_entity_type("note"));
        assert!(hits.is_empty());

        let hits = store.query_graph(&GraphQuery::new("rust").with_entity_type("project"));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_query_stops_at_limit_before_observations() {
        let mut store = seeded();
        store.add_observations(vec![ObservationInput::new("Note2", ["note about notes"])]);
        let hits = store.query_graph(&GraphQuery::new("note").with_limit(2));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| matches!(h, QueryHit::Entity(_))));
    }

    #[test]
    fn test_query_appends_observations_after_entities() {
        let mut store = seeded();
        store.add_observations(vec![ObservationInput::new("Note2", ["hello again"])]);
        let hits = store.query_graph(&GraphQuery::new("hello"));
        // Note1 (own observation), Note2 (copied observation), then the standalone record.
        assert_eq!(hits.len(), 3);
        assert!(matches!(hits[2], QueryHit::Observation(_)));

        let hits = store.query_graph(&GraphQuery::new("hello").without_observations());
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_add_observations_updates_all_same_named_entities_once() {
        let mut store = GraphStore::new();
        store.create_entities(vec![EntityInput::new("Dup", "a"), EntityInput::new("Dup", "b")]);
        let added = store.add_observations(vec![ObservationInput::new("Dup", ["x", "y"])]);
        assert_eq!(added.len(), 1);
        assert_eq!(store.observations().len(), 1);
        for entity in store.entities() {
            assert_eq!(entity.observations, vec!["x".to_string(), "y".to_string()]);
        }
    }

    #[test]
    fn test_add_observations_never_creates_entities() {
        let mut store = GraphStore::new();
        store.add_observations(vec![ObservationInput::new("Ghost", ["boo"])]);
        assert!(store.entities().is_empty());
        assert_eq!(store.observations().len(), 1);
    }

    #[test]
    fn test_relations_allow_dangling_endpoints() {
        let mut store = GraphStore::new();
        let created = store.create_relations(vec![RelationInput::new("Nobody", "Nowhere", "x")]);
        assert!(created[0].id.starts_with("rel_"));
        let resources = store.list_resources(ResourceKind::Relations);
        assert_eq!(resources[0].name, "Nobody -> Nowhere");
        assert_eq!(resources[0].kind, "relation");
    }

    #[test]
    fn test_list_resources_filters() {
        let mut store = seeded();
        store.create_relations(vec![RelationInput::new("Note1", "Note2", "links")]);
        assert_eq!(store.list_resources(ResourceKind::All).len(), 4);
        assert_eq!(store.list_resources(ResourceKind::Entities).len(), 3);
        assert_eq!(store.list_resources(ResourceKind::Relations).len(), 1);
    }

    #[test]
    fn test_delete_entities_does_not_cascade() {
        let mut store = seeded();
        store.create_relations(vec![RelationInput::new("Note1", "Note2", "links")]);
        store.add_observations(vec![ObservationInput::new("Note1", ["later"])]);
        let id = store.entities()[0].id.clone();

        let deleted = store.delete_entities(&[id.clone(), "missing".to_string()]);
        assert_eq!(deleted, vec!["Note1".to_string()]);
        assert_eq!(store.entities().len(), 2);
        assert_eq!(store.relations().len(), 1);
        assert_eq!(store.observations().len(), 1);
        assert!(store.get_resource(&id).is_none());
    }

    #[test]
    fn test_update_entities_shallow_merge() {
        let mut store = seeded();
        let id = store.entities()[0].id.clone();
        let created_at = store.entities()[0].created_at;
        let changes = json!({
            "name": "Renamed",
            "id": "hijack",
            "priority": 3,
            "metadata": { "k": "v" }
        });
        let updated = store.update_entities(vec![EntityUpdate {
            entity_id: id.clone(),
            changes: changes.as_object().unwrap().clone(),
        }]);
        assert_eq!(updated.len(), 1);
        let entity = &updated[0];
        assert_eq!(entity.id, id);
        assert_eq!(entity.name, "Renamed");
        assert_eq!(entity.created_at, created_at);
        assert!(entity.updated_at.is_some());
        assert_eq!(entity.extra.get("priority"), Some(&json!(3)));
        assert_eq!(entity.metadata.get("k"), Some(&json!("v")));
        assert_eq!(entity.observations, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_update_unknown_entity_is_skipped() {
        let mut store = seeded();
        let updated = store.update_entities(vec![EntityUpdate {
            entity_id: "nope".to_string(),
            changes: Default::default(),
        }]);
        assert!(updated.is_empty());
    }

    #[test]
    fn test_get_resource_searches_all_collections() {
        let mut store = seeded();
        let rel = store.create_relations(vec![RelationInput::new("a", "b", "c")]);
        let obs = store.add_observations(vec![ObservationInput::new("a", ["z"])]);
        assert!(matches!(store.get_resource(&rel[0].id), Some(GraphResource::Relation(_))));
        assert!(matches!(store.get_resource(&obs[0].id), Some(GraphResource::Observation(_))));
        assert!(store.get_resource("missing").is_none());
    }

    #[test]
    fn test_statistics_and_clear() {
        let mut store = seeded();
        store.add_observations(vec![ObservationInput::new("Note1", ["x"])]);
        let stats = store.statistics();
        assert_eq!((stats.entities, stats.relations, stats.observations), (3, 0, 1));
        store.clear();
        assert_eq!(store.statistics().entities, 0);
        assert!(store.export().observations.is_empty());
    }

    proptest! {
        #[test]
        fn prop_query_is_deterministic(names in proptest::collection::vec("[a-c]{1,4}", 0..20), needle in "[a-c]{0,2}") {
            let mut store = GraphStore::new();
            store.create_entities(names.iter().map(|n| EntityInput::new(n.clone(), "t")).collect());
            store.add_observations(names.iter().map(|n| ObservationInput::new(n.clone(), [n.clone()])).collect());
            let query = GraphQuery::new(needle).with_limit(7);
            let first = store.query_graph(&query);
            let second = store.query_graph(&query);
            prop_assert_eq!(first.len(), second.len());
            prop_assert!(first.len() <= 7);
            prop_assert!(first.iter().zip(second.iter()).all(|(a, b)| a == b));
        }
    }
}
