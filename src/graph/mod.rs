//! Knowledge Graph Store
//!
//! Mutable entity/relation/observation graph with substring search, paginated
//! reads, and a JSON snapshot on disk.

pub mod model;
pub mod persistence;
mod store;

pub use model::{
    Entity, EntityInput, EntityUpdate, GraphExport, GraphPage, GraphQuery, GraphResource,
    GraphStatistics, Observation, ObservationInput, QueryHit, Relation, RelationInput,
    ResourceEntry, ResourceKind,
};
pub use persistence::{GraphSnapshot, SnapshotStore};
pub use store::GraphStore;
