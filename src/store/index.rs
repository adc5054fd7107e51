use rusqlite::{Connection, params};
use serde_json::Value;

use crate::{errors::GraphBenchError, store::EntityHandle};

pub fn add_entry(
    conn: &Connection,
    index: &str,
    handle: EntityHandle,
    key: &str,
    value: &Value,
) -> Result<(), GraphBenchError> {
    let encoded = encode_value(value)?;
    conn.prepare_cached(
        "INSERT INTO graph_index_entries(index_name, entity_id, key, value) VALUES(?1, ?2, ?3, ?4)",
    )
    .and_then(|mut stmt| stmt.execute(params![index, handle.id(), key, encoded]))
    .map_err(|e| GraphBenchError::query(e.to_string()))?;
    Ok(())
}

pub fn lookup(
    conn: &Connection,
    index: &str,
    key: &str,
    value: &Value,
) -> Result<Vec<EntityHandle>, GraphBenchError> {
    let encoded = encode_value(value)?;
    let mut stmt = conn
        .prepare_cached(
            "SELECT entity_id FROM graph_index_entries \
             WHERE index_name=?1 AND key=?2 AND value=?3 ORDER BY entity_id",
        )
        .map_err(|e| GraphBenchError::query(e.to_string()))?;
    let rows = stmt
        .query_map(params![index, key, encoded], |row| row.get(0))
        .map_err(|e| GraphBenchError::query(e.to_string()))?;
    let mut handles = Vec::new();
    for row in rows {
        handles.push(EntityHandle::new(
            row.map_err(|e| GraphBenchError::query(e.to_string()))?,
        ));
    }
    Ok(handles)
}

pub fn remove_entity(conn: &Connection, handle: EntityHandle) -> Result<(), GraphBenchError> {
    conn.prepare_cached("DELETE FROM graph_index_entries WHERE entity_id=?1")
        .and_then(|mut stmt| stmt.execute(params![handle.id()]))
        .map_err(|e| GraphBenchError::query(e.to_string()))?;
    Ok(())
}

fn encode_value(value: &Value) -> Result<String, GraphBenchError> {
    serde_json::to_string(value).map_err(|e| GraphBenchError::invalid_input(e.to_string()))
}
