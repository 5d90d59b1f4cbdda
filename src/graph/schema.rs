//! Schema bootstrap and engine capability probes.

use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{GraphError, Result};

/// Node bodies are opaque JSON text; the identity column is derived from
/// `$.id`, indexed, and unique graph-wide. Edge identity is the full
/// (source, target, properties) triple with replace-on-conflict, and
/// both endpoints are enforced foreign keys into the node identity.
///
/// The identity columns carry no declared type: a declared TEXT affinity
/// would coerce integer ids to text on the way through edge storage, and
/// they would decode back as a different id than the caller wrote.
const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS nodes (
    body TEXT,
    id   GENERATED ALWAYS AS (json_extract(body, '$.id')) VIRTUAL NOT NULL UNIQUE
);
CREATE INDEX IF NOT EXISTS idx_nodes_id ON nodes(id);
CREATE TABLE IF NOT EXISTS edges (
    source,
    target,
    properties TEXT,
    UNIQUE(source, target, properties) ON CONFLICT REPLACE,
    FOREIGN KEY(source) REFERENCES nodes(id),
    FOREIGN KEY(target) REFERENCES nodes(id)
);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
";

/// Open a file-backed database, bootstrapping the schema.
pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path.as_ref()).map_err(GraphError::from)?;
    // WAL only applies to file-backed databases.
    conn.pragma_update(None, "journal_mode", "wal")
        .map_err(GraphError::from)?;
    init(conn)
}

/// Open an ephemeral in-memory database, bootstrapping the schema.
pub(crate) fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(GraphError::from)?;
    init(conn)
}

fn init(conn: Connection) -> Result<Connection> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(GraphError::from)?;
    probe_capabilities(&conn)?;
    conn.execute_batch(SCHEMA).map_err(GraphError::from)?;
    debug!("graph schema ready");
    Ok(conn)
}

/// The generated queries assume JSON1, `json_tree` enumeration,
/// recursive CTEs and enforced foreign keys. A build of the engine
/// missing any of these must fail at open, not mid-operation.
fn probe_capabilities(conn: &Connection) -> Result<()> {
    conn.query_row("SELECT json_extract('{\"k\":1}', '$.k')", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| GraphError::Database(format!("engine lacks JSON path extraction: {e}")))?;

    conn.query_row("SELECT count(*) FROM json_tree('{\"k\":[1,2]}')", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| GraphError::Database(format!("engine lacks JSON tree enumeration: {e}")))?;

    conn.query_row(
        "WITH RECURSIVE seq(n) AS (SELECT 1 UNION SELECT n + 1 FROM seq WHERE n < 3) \
         SELECT max(n) FROM seq",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map_err(|e| GraphError::Database(format!("engine lacks recursive queries: {e}")))?;

    let fk: i64 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .map_err(GraphError::from)?;
    if fk != 1 {
        return Err(GraphError::Database(
            "engine does not enforce foreign keys".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_bootstrap_succeeds() {
        let conn = open_in_memory().unwrap();
        // Both relations exist and are empty.
        let nodes: i64 = conn
            .query_row("SELECT count(*) FROM nodes", [], |r| r.get(0))
            .unwrap();
        let edges: i64 = conn
            .query_row("SELECT count(*) FROM edges", [], |r| r.get(0))
            .unwrap();
        assert_eq!((nodes, edges), (0, 0));
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        drop(open(&path).unwrap());
        drop(open(&path).unwrap());
    }

    #[test]
    fn identity_column_is_derived_from_body() {
        let conn = open_in_memory().unwrap();
        conn.execute("INSERT INTO nodes(body) VALUES (json('{\"id\":\"a\"}'))", [])
            .unwrap();
        let id: String = conn
            .query_row("SELECT id FROM nodes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(id, "a");
    }
}
