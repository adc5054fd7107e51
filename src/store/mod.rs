//! Store interface driven by the benchmark cases. Every access happens inside a
//! [`UnitOfWork`]; committing publishes the changes, rolling back (or dropping the
//! unit of work without committing) discards them. [`SqliteStore`] is the bundled
//! implementation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GraphBenchError;

pub mod index;
pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, SqliteUnitOfWork};

/// Name of the secondary index used for entity properties.
pub const ENTITY_INDEX: &str = "nodes";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle {
    id: i64,
}

impl EntityHandle {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub from_id: i64,
    pub to_id: i64,
    pub rel_type: String,
}

impl Relationship {
    /// The endpoint that is not `handle`.
    pub fn other(&self, handle: EntityHandle) -> EntityHandle {
        if self.from_id == handle.id() {
            EntityHandle::new(self.to_id)
        } else {
            EntityHandle::new(self.from_id)
        }
    }
}

pub trait Store: Send + Sync {
    type UnitOfWork<'a>: UnitOfWork
    where
        Self: 'a;

    fn begin_unit_of_work(&self) -> Result<Self::UnitOfWork<'_>, GraphBenchError>;
}

pub trait UnitOfWork {
    fn create_entity(&self) -> Result<EntityHandle, GraphBenchError>;
    /// Fails while the entity still has relationships.
    fn delete_entity(&self, handle: EntityHandle) -> Result<(), GraphBenchError>;
    fn get_entity(&self, id: i64) -> Result<EntityHandle, GraphBenchError>;
    fn relationships(&self, handle: EntityHandle) -> Result<Vec<Relationship>, GraphBenchError>;
    fn create_relationship(
        &self,
        from: EntityHandle,
        to: EntityHandle,
        rel_type: &str,
    ) -> Result<i64, GraphBenchError>;
    fn delete_relationship(&self, id: i64) -> Result<(), GraphBenchError>;
    fn properties(&self, handle: EntityHandle) -> Result<Vec<(String, Value)>, GraphBenchError>;
    fn set_property(
        &self,
        handle: EntityHandle,
        key: &str,
        value: Value,
    ) -> Result<(), GraphBenchError>;
    fn index_add(
        &self,
        index: &str,
        handle: EntityHandle,
        key: &str,
        value: &Value,
    ) -> Result<(), GraphBenchError>;
    fn index_lookup(
        &self,
        index: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<EntityHandle>, GraphBenchError>;
    /// Entities with an id greater than `after`, in id order.
    fn entity_ids(&self, after: i64, limit: usize) -> Result<Vec<EntityHandle>, GraphBenchError>;
    fn commit(self) -> Result<(), GraphBenchError>;
    fn rollback(self) -> Result<(), GraphBenchError>;
}
