//! JSON snapshot file for the graph.
//!
//! Collections are written as `[id, record]` pair lists so that reload keeps
//! both the keys and the insertion order.

use super::model::{Entity, Observation, Relation};
use super::store::GraphStore;
use crate::error::StorageError;
use crate::types::{now, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub entities: Vec<(String, Entity)>,
    #[serde(default)]
    pub relations: Vec<(String, Relation)>,
    #[serde(default)]
    pub observations: Vec<(String, Observation)>,
    pub timestamp: Timestamp,
}

impl GraphSnapshot {
    pub fn capture(store: &GraphStore) -> Self {
        Self {
            entities: store
                .entities
                .iter()
                .map(|e| (e.id.clone(), e.clone()))
                .collect(),
            relations: store
                .relations
                .iter()
                .map(|r| (r.id.clone(), r.clone()))
                .collect(),
            observations: store
                .observations
                .iter()
                .map(|o| (o.id.clone(), o.clone()))
                .collect(),
            timestamp: now(),
        }
    }

    /// Rebuild a store; the pair key is authoritative for the record id.
    pub fn restore(self) -> GraphStore {
        fn keyed<T>(pairs: Vec<(String, T)>, set_id: impl Fn(&mut T, String)) -> Vec<T> {
            pairs
                .into_iter()
                .map(|(key, mut record)| {
                    set_id(&mut record, key);
                    record
                })
                .collect()
        }
        GraphStore {
            entities: keyed(self.entities, |e, k| e.id = k),
            relations: keyed(self.relations, |r, k| r.id = k),
            observations: keyed(self.observations, |o, k| o.id = k),
        }
    }
}

/// Snapshot file location plus load/save policy.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the snapshot through a sibling temp file and rename into place.
    pub fn save(&self, store: &GraphStore) -> Result<(), StorageError> {
        let snapshot = GraphSnapshot::capture(store);
        let body = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| StorageError::InvalidPath(self.path.display().to_string()))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp_path, body)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!(
            path = %self.path.display(),
            entities = snapshot.entities.len(),
            relations = snapshot.relations.len(),
            observations = snapshot.observations.len(),
            "Graph snapshot saved"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<GraphStore, StorageError> {
        let raw = std::fs::read(&self.path)?;
        let snapshot: GraphSnapshot = serde_json::from_slice(&raw)?;
        Ok(snapshot.restore())
    }

    /// Save, logging instead of propagating failures. The in-memory graph stays
    /// authoritative whether or not the write lands.
    pub fn save_best_effort(&self, store: &GraphStore) {
        if let Err(e) = self.save(store) {
            error!(path = %self.path.display(), error = %e, "Failed to save graph snapshot");
        }
    }

    /// Load into `store`, leaving it untouched on any read or parse failure.
    pub fn load_into(&self, store: &mut GraphStore) -> bool {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No graph snapshot found, starting empty");
            return false;
        }
        match self.load() {
            Ok(loaded) => {
                *store = loaded;
                let stats = store.statistics();
                info!(
                    path = %self.path.display(),
                    entities = stats.entities,
                    relations = stats.relations,
                    observations = stats.observations,
                    "Loaded graph snapshot"
                );
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to load graph snapshot");
                false
            }
        }
    }
}
