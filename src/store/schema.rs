use rusqlite::Connection;

use crate::errors::GraphBenchError;

pub fn ensure_schema(conn: &Connection) -> Result<(), GraphBenchError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS graph_entities (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            properties TEXT NOT NULL DEFAULT '{}'
        );
        CREATE TABLE IF NOT EXISTS graph_relationships (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            from_id  INTEGER NOT NULL,
            to_id    INTEGER NOT NULL,
            rel_type TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS graph_index_entries (
            index_name TEXT NOT NULL,
            entity_id  INTEGER NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_rels_from ON graph_relationships(from_id);
        CREATE INDEX IF NOT EXISTS idx_rels_to ON graph_relationships(to_id);
        CREATE INDEX IF NOT EXISTS idx_index_lookup ON graph_index_entries(index_name, key, value);
        CREATE INDEX IF NOT EXISTS idx_index_entity ON graph_index_entries(entity_id);
        "#,
    )
    .map_err(|e| GraphBenchError::schema(e.to_string()))?;
    Ok(())
}

/// WAL journaling with relaxed sync for file-backed stores.
pub fn tune_file_store(conn: &Connection) -> Result<(), GraphBenchError> {
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| GraphBenchError::schema(e.to_string()))?;
    if !mode.eq_ignore_ascii_case("wal") {
        return Err(GraphBenchError::schema(format!(
            "journal_mode stayed {mode}"
        )));
    }
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|e| GraphBenchError::schema(e.to_string()))?;
    Ok(())
}
