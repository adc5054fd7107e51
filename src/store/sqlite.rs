use std::{
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};

use crate::{
    errors::GraphBenchError,
    store::{
        EntityHandle, Relationship, Store, UnitOfWork, index,
        schema::{ensure_schema, tune_file_store},
    },
};

/// How long a connection waits on another connection's lock before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed graph store over a fixed set of connections. A unit of work holds
/// one connection for its whole lifetime. In-memory stores have a single
/// connection, so their units of work are serialized; file-backed stores opened
/// with several connections run units of work side by side and contend on
/// SQLite's own WAL locking.
pub struct SqliteStore {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GraphBenchError> {
        Self::open_with_connections(path, 1)
    }

    /// File-backed store with `connections` connections (at least one).
    pub fn open_with_connections<P: AsRef<Path>>(
        path: P,
        connections: usize,
    ) -> Result<Self, GraphBenchError> {
        let path = path.as_ref();
        let first = open_connection(path)?;
        tune_file_store(&first)?;
        ensure_schema(&first)?;
        let mut opened = vec![first];
        for _ in 1..connections.max(1) {
            let conn = open_connection(path)?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(|e| GraphBenchError::connection(e.to_string()))?;
            opened.push(conn);
        }
        Ok(Self::from_connections(opened))
    }

    pub fn open_in_memory() -> Result<Self, GraphBenchError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GraphBenchError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connections(vec![conn]))
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn from_connections(connections: Vec<Connection>) -> Self {
        Self {
            connections: connections.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    /// First idle connection, scanning round-robin; waits on the starting one when
    /// every connection is busy.
    fn acquire(&self) -> MutexGuard<'_, Connection> {
        let count = self.connections.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % count;
        (0..count)
            .find_map(|offset| self.connections[(start + offset) % count].try_lock())
            .unwrap_or_else(|| self.connections[start].lock())
    }
}

fn open_connection(path: &Path) -> Result<Connection, GraphBenchError> {
    let conn = Connection::open(path).map_err(|e| GraphBenchError::connection(e.to_string()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| GraphBenchError::connection(e.to_string()))?;
    Ok(conn)
}

impl Store for SqliteStore {
    type UnitOfWork<'a> = SqliteUnitOfWork<'a>;

    fn begin_unit_of_work(&self) -> Result<SqliteUnitOfWork<'_>, GraphBenchError> {
        let conn = self.acquire();
        conn.execute_batch("BEGIN")
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        Ok(SqliteUnitOfWork { conn, open: true })
    }
}

pub struct SqliteUnitOfWork<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl SqliteUnitOfWork<'_> {
    fn entity_exists(&self, id: i64) -> Result<bool, GraphBenchError> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM graph_entities WHERE id=?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        Ok(exists.is_some())
    }

    fn load_properties(&self, id: i64) -> Result<Map<String, Value>, GraphBenchError> {
        let raw: String = self
            .conn
            .query_row(
                "SELECT properties FROM graph_entities WHERE id=?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => {
                    GraphBenchError::not_found(format!("entity {id}"))
                }
                other => GraphBenchError::query(other.to_string()),
            })?;
        match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(GraphBenchError::query(format!(
                "entity {id} properties are not an object: {other}"
            ))),
            Err(e) => Err(GraphBenchError::query(e.to_string())),
        }
    }

    fn finish(&mut self, statement: &str) -> Result<(), GraphBenchError> {
        self.conn
            .execute_batch(statement)
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        self.open = false;
        Ok(())
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn create_entity(&self) -> Result<EntityHandle, GraphBenchError> {
        self.conn
            .execute("INSERT INTO graph_entities(properties) VALUES('{}')", [])
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        Ok(EntityHandle::new(self.conn.last_insert_rowid()))
    }

    fn delete_entity(&self, handle: EntityHandle) -> Result<(), GraphBenchError> {
        let attached: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM graph_relationships WHERE from_id=?1 OR to_id=?1",
                params![handle.id()],
                |row| row.get(0),
            )
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        if attached > 0 {
            return Err(GraphBenchError::invalid_input(format!(
                "entity {} still has {attached} relationships",
                handle.id()
            )));
        }
        index::remove_entity(&self.conn, handle)?;
        let affected = self
            .conn
            .execute("DELETE FROM graph_entities WHERE id=?1", params![handle.id()])
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        if affected == 0 {
            return Err(GraphBenchError::not_found(format!("entity {}", handle.id())));
        }
        Ok(())
    }

    fn get_entity(&self, id: i64) -> Result<EntityHandle, GraphBenchError> {
        if self.entity_exists(id)? {
            Ok(EntityHandle::new(id))
        } else {
            Err(GraphBenchError::not_found(format!("entity {id}")))
        }
    }

    fn relationships(&self, handle: EntityHandle) -> Result<Vec<Relationship>, GraphBenchError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, from_id, to_id, rel_type FROM graph_relationships \
                 WHERE from_id=?1 OR to_id=?1 ORDER BY id",
            )
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![handle.id()], |row| {
                Ok(Relationship {
                    id: row.get(0)?,
                    from_id: row.get(1)?,
                    to_id: row.get(2)?,
                    rel_type: row.get(3)?,
                })
            })
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        let mut rels = Vec::new();
        for rel in rows {
            rels.push(rel.map_err(|e| GraphBenchError::query(e.to_string()))?);
        }
        Ok(rels)
    }

    fn create_relationship(
        &self,
        from: EntityHandle,
        to: EntityHandle,
        rel_type: &str,
    ) -> Result<i64, GraphBenchError> {
        if rel_type.trim().is_empty() {
            return Err(GraphBenchError::invalid_input("relationship type must be set"));
        }
        if from == to {
            return Err(GraphBenchError::invalid_input(
                "self loops are not supported",
            ));
        }
        if !self.entity_exists(from.id())? || !self.entity_exists(to.id())? {
            return Err(GraphBenchError::invalid_input(
                "relationship endpoints must reference existing entities",
            ));
        }
        self.conn
            .execute(
                "INSERT INTO graph_relationships(from_id, to_id, rel_type) VALUES(?1, ?2, ?3)",
                params![from.id(), to.id(), rel_type],
            )
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete_relationship(&self, id: i64) -> Result<(), GraphBenchError> {
        let affected = self
            .conn
            .execute("DELETE FROM graph_relationships WHERE id=?1", params![id])
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        if affected == 0 {
            return Err(GraphBenchError::not_found(format!("relationship {id}")));
        }
        Ok(())
    }

    fn properties(&self, handle: EntityHandle) -> Result<Vec<(String, Value)>, GraphBenchError> {
        Ok(self.load_properties(handle.id())?.into_iter().collect())
    }

    fn set_property(
        &self,
        handle: EntityHandle,
        key: &str,
        value: Value,
    ) -> Result<(), GraphBenchError> {
        if key.is_empty() {
            return Err(GraphBenchError::invalid_input("property key must be set"));
        }
        let mut props = self.load_properties(handle.id())?;
        props.insert(key.to_string(), value);
        let encoded = serde_json::to_string(&props)
            .map_err(|e| GraphBenchError::invalid_input(e.to_string()))?;
        self.conn
            .execute(
                "UPDATE graph_entities SET properties=?1 WHERE id=?2",
                params![encoded, handle.id()],
            )
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        Ok(())
    }

    fn index_add(
        &self,
        index: &str,
        handle: EntityHandle,
        key: &str,
        value: &Value,
    ) -> Result<(), GraphBenchError> {
        index::add_entry(&self.conn, index, handle, key, value)
    }

    fn index_lookup(
        &self,
        index: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<EntityHandle>, GraphBenchError> {
        index::lookup(&self.conn, index, key, value)
    }

    fn entity_ids(&self, after: i64, limit: usize) -> Result<Vec<EntityHandle>, GraphBenchError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM graph_entities WHERE id > ?1 ORDER BY id LIMIT ?2")
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![after, limit], |row| row.get(0))
            .map_err(|e| GraphBenchError::query(e.to_string()))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(EntityHandle::new(
                id.map_err(|e| GraphBenchError::query(e.to_string()))?,
            ));
        }
        Ok(ids)
    }

    fn commit(mut self) -> Result<(), GraphBenchError> {
        self.finish("COMMIT")
    }

    fn rollback(mut self) -> Result<(), GraphBenchError> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteUnitOfWork<'_> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
