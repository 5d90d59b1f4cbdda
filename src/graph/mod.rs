//! Graph store: node/edge lifecycle over the SQLite-backed relations.

mod decode;
mod dot;
mod schema;

pub use dot::DotOptions;

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::model::{Edge, NodeId, TraversalStep};
use crate::query::{ResultColumn, SearchQuery, TraversalQuery};

/// Graph store over one exclusively-owned engine connection.
///
/// All operations are synchronous and run to completion. Multi-row
/// operations execute inside one transaction each: either every
/// constituent statement commits or none do. Single-row operations are
/// atomic at the statement level. Instances never share a connection;
/// cross-handle races (including `upsert_node`'s read-then-write) are
/// governed by the engine's own concurrency control, not by this layer.
pub struct Graph {
    conn: Connection,
}

// ── Constructors ────────────────────────────────────────────────────

impl Graph {
    /// Open (or create) a file-backed graph database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Graph> {
        Ok(Graph {
            conn: schema::open(path)?,
        })
    }

    /// Open an ephemeral in-memory graph database.
    pub fn in_memory() -> Result<Graph> {
        Ok(Graph {
            conn: schema::open_in_memory()?,
        })
    }
}

// ── Node operations ─────────────────────────────────────────────────

impl Graph {
    /// Insert one node. An explicit `id` wins over `body.id` and is
    /// written into the stored body. Fails with a validation error when
    /// no id resolves, and a constraint error when the id exists.
    pub fn add_node(&mut self, body: Value, id: Option<NodeId>) -> Result<NodeId> {
        let (id, text) = prepare_body(body, id)?;
        self.conn
            .prepare_cached("INSERT INTO nodes(body) VALUES (json(?1))")?
            .execute(params![text])?;
        debug!(%id, "node added");
        Ok(id)
    }

    /// Insert a batch of nodes in one transaction. `ids`, when supplied,
    /// must match `bodies` in length. If any insertion fails, none of
    /// the batch is persisted.
    pub fn add_nodes(&mut self, bodies: Vec<Value>, ids: Option<Vec<NodeId>>) -> Result<Vec<NodeId>> {
        if let Some(ref ids) = ids {
            if ids.len() != bodies.len() {
                return Err(GraphError::Validation(format!(
                    "ids/bodies length mismatch: {} vs {}",
                    ids.len(),
                    bodies.len()
                )));
            }
        }

        // Resolve every id before touching the engine.
        let mut prepared = Vec::with_capacity(bodies.len());
        match ids {
            Some(ids) => {
                for (body, id) in bodies.into_iter().zip(ids) {
                    prepared.push(prepare_body(body, Some(id))?);
                }
            }
            None => {
                for body in bodies {
                    prepared.push(prepare_body(body, None)?);
                }
            }
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("INSERT INTO nodes(body) VALUES (json(?1))")?;
            for (_, text) in &prepared {
                stmt.execute(params![text])?;
            }
        }
        tx.commit()?;
        debug!(count = prepared.len(), "node batch added");
        Ok(prepared.into_iter().map(|(id, _)| id).collect())
    }

    /// Fetch a node body by id. Absence is `None`, never an error.
    pub fn find_node(&self, id: &NodeId) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .prepare_cached("SELECT body FROM nodes WHERE id = ?1")?
            .query_row(params![id], |row| row.get(0))
            .optional()?;
        raw.as_deref().map(decode::body).transpose()
    }

    /// Replace a node body wholesale. The id is written into the new
    /// body; a zero-row update is a not-found error.
    pub fn update_node_body(&mut self, id: &NodeId, body: Value) -> Result<()> {
        let (_, text) = prepare_body(body, Some(id.clone()))?;
        let changed = self
            .conn
            .prepare_cached("UPDATE nodes SET body = json(?1) WHERE id = ?2")?
            .execute(params![text, id])?;
        if changed == 0 {
            return Err(GraphError::NotFound(format!("node {id}")));
        }
        Ok(())
    }

    /// Insert the node if absent, otherwise overlay `body` onto the
    /// existing record with [`shallow_merge`] and write the result.
    ///
    /// The merge is shallow: top-level keys in `body` overwrite, keys
    /// absent from it are preserved, nested objects are replaced
    /// wholesale. The read-then-write is not atomic against concurrent
    /// writers on other handles.
    pub fn upsert_node(&mut self, id: &NodeId, body: Value) -> Result<()> {
        if !body.is_object() {
            return Err(GraphError::Validation(
                "node body must be a JSON object".to_string(),
            ));
        }
        match self.find_node(id)? {
            None => {
                self.add_node(body, Some(id.clone()))?;
                Ok(())
            }
            Some(existing) => self.update_node_body(id, shallow_merge(existing, body)),
        }
    }

    /// Remove a node and every edge touching it, atomically. Fails with
    /// a not-found error if the node row did not exist.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.prepare_cached("DELETE FROM edges WHERE source = ?1 OR target = ?1")?
            .execute(params![id])?;
        let changed = tx
            .prepare_cached("DELETE FROM nodes WHERE id = ?1")?
            .execute(params![id])?;
        if changed == 0 {
            return Err(GraphError::NotFound(format!("node {id}")));
        }
        tx.commit()?;
        debug!(%id, "node removed");
        Ok(())
    }

    /// Remove a batch of nodes and their edges in one transaction.
    /// Absent ids are skipped; the batch is all-or-nothing.
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut edges = tx.prepare_cached("DELETE FROM edges WHERE source = ?1 OR target = ?1")?;
            let mut nodes = tx.prepare_cached("DELETE FROM nodes WHERE id = ?1")?;
            for id in ids {
                edges.execute(params![id])?;
                nodes.execute(params![id])?;
            }
        }
        tx.commit()?;
        debug!(count = ids.len(), "node batch removed");
        Ok(())
    }
}

// ── Edge operations ─────────────────────────────────────────────────

impl Graph {
    /// Connect two nodes with empty properties.
    pub fn connect_nodes(&mut self, source: &NodeId, target: &NodeId) -> Result<()> {
        self.connect_nodes_with_properties(source, target, Value::Object(serde_json::Map::new()))
    }

    /// Connect two nodes with a JSON annotation. Re-inserting an
    /// identical (source, target, properties) triple replaces the prior
    /// row; a differing-properties insert is a second, distinct edge.
    /// A missing endpoint is a constraint error.
    pub fn connect_nodes_with_properties(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        properties: Value,
    ) -> Result<()> {
        validate_endpoint(source)?;
        validate_endpoint(target)?;
        let props = serde_json::to_string(&properties).map_err(GraphError::invalid_json)?;
        self.conn
            .prepare_cached("INSERT INTO edges(source, target, properties) VALUES (?1, ?2, json(?3))")?
            .execute(params![source, target, props])?;
        Ok(())
    }

    /// Connect parallel arrays of endpoints with empty properties, in
    /// one transaction.
    pub fn bulk_connect_nodes(&mut self, sources: &[NodeId], targets: &[NodeId]) -> Result<()> {
        let empty: Vec<Value> = vec![Value::Object(serde_json::Map::new()); sources.len()];
        self.bulk_connect_nodes_with_properties(sources, targets, &empty)
    }

    /// Connect parallel arrays of endpoints and annotations in one
    /// transaction. Any length mismatch is a validation error; any
    /// referential violation rolls back the whole batch.
    pub fn bulk_connect_nodes_with_properties(
        &mut self,
        sources: &[NodeId],
        targets: &[NodeId],
        properties: &[Value],
    ) -> Result<()> {
        if sources.len() != targets.len() || sources.len() != properties.len() {
            return Err(GraphError::Validation(format!(
                "sources/targets/properties length mismatch: {}/{}/{}",
                sources.len(),
                targets.len(),
                properties.len()
            )));
        }
        for id in sources.iter().chain(targets) {
            validate_endpoint(id)?;
        }
        let mut serialized = Vec::with_capacity(properties.len());
        for props in properties {
            serialized.push(serde_json::to_string(props).map_err(GraphError::invalid_json)?);
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO edges(source, target, properties) VALUES (?1, ?2, json(?3))",
            )?;
            for ((source, target), props) in sources.iter().zip(targets).zip(&serialized) {
                stmt.execute(params![source, target, props])?;
            }
        }
        tx.commit()?;
        debug!(count = sources.len(), "edge batch added");
        Ok(())
    }

    /// Every edge touching a node, either direction.
    pub fn connections(&self, id: &NodeId) -> Result<Vec<Edge>> {
        self.edges_where(
            "SELECT source, target, properties FROM edges WHERE source = ?1 \
             UNION SELECT source, target, properties FROM edges WHERE target = ?1",
            id,
        )
    }

    /// Edges arriving at a node.
    pub fn connections_in(&self, id: &NodeId) -> Result<Vec<Edge>> {
        self.edges_where(
            "SELECT source, target, properties FROM edges WHERE target = ?1",
            id,
        )
    }

    /// Edges leaving a node.
    pub fn connections_out(&self, id: &NodeId) -> Result<Vec<Edge>> {
        self.edges_where(
            "SELECT source, target, properties FROM edges WHERE source = ?1",
            id,
        )
    }

    fn edges_where(&self, sql: &str, id: &NodeId) -> Result<Vec<Edge>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((
                row.get::<_, NodeId>(0)?,
                row.get::<_, NodeId>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        let mut edges = Vec::new();
        for row in rows {
            let (source, target, props) = row?;
            edges.push(Edge {
                source,
                target,
                properties: decode::properties(props.as_deref())?,
            });
        }
        Ok(edges)
    }
}

// ── Search and traversal ────────────────────────────────────────────

impl Graph {
    /// Run a declarative node search, binding `args` positionally to the
    /// query's placeholders. Rows decode per the requested result
    /// column: parsed bodies for a body search, bare id values for an id
    /// search.
    pub fn find_nodes(&self, search: &SearchQuery, args: &[Value]) -> Result<Vec<Value>> {
        let sql = search.render();
        debug!(%sql, "node search");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let bound = args.iter().map(bind_arg).collect::<Vec<_>>();

        match search.column() {
            ResultColumn::Body => {
                let rows = stmt.query_map(rusqlite::params_from_iter(bound), |row| {
                    row.get::<_, String>(0)
                })?;
                let mut bodies = Vec::new();
                for raw in rows {
                    bodies.push(decode::body(&raw?)?);
                }
                Ok(bodies)
            }
            ResultColumn::Id => {
                let rows = stmt.query_map(rusqlite::params_from_iter(bound), |row| {
                    row.get::<_, NodeId>(0)
                })?;
                let mut ids = Vec::new();
                for id in rows {
                    ids.push(id?.to_json());
                }
                Ok(ids)
            }
        }
    }

    /// Expand breadth-first from a seed node per the traversal
    /// configuration. The seed itself is always reported at depth 0 when
    /// it exists; an unknown seed yields an empty result.
    pub fn traverse(&self, seed: &NodeId, config: &TraversalQuery) -> Result<Vec<TraversalStep>> {
        let sql = config.render();
        debug!(%seed, %sql, "traversal");
        let mut stmt = self.conn.prepare_cached(&sql)?;

        // ?1 is the seed; ?2 bounds the expansion rounds. When the
        // caller configured no bound, the node count stands in: no walk
        // needs more rounds than there are nodes, so the recursion stays
        // finite on cycles without cutting any reachable row.
        let mut args = vec![bind_arg(&seed.to_json())];
        if config.follows_edges() {
            let bound = match config.depth_bound() {
                Some(bound) => i64::from(bound),
                None => self.node_count()? as i64,
            };
            args.push(rusqlite::types::Value::Integer(bound));
        }

        if config.carries_bodies() {
            let rows = stmt.query_map(rusqlite::params_from_iter(args), |row| {
                Ok(decode::RawStep {
                    reached: row.get(0)?,
                    kind: row.get(1)?,
                    source: row.get(2)?,
                    target: row.get(3)?,
                    payload: row.get(4)?,
                    depth: row.get(5)?,
                })
            })?;
            let mut raw = Vec::new();
            for row in rows {
                raw.push(row?);
            }
            decode::traversal_steps(raw)
        } else {
            let rows = stmt.query_map(rusqlite::params_from_iter(args), |row| {
                Ok((row.get::<_, NodeId>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut raw = Vec::new();
            for row in rows {
                raw.push(row?);
            }
            decode::traversal_ids(raw)
        }
    }
}

// ── Stats ───────────────────────────────────────────────────────────

impl Graph {
    /// Number of stored nodes.
    pub fn node_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Number of stored edges.
    pub fn edge_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Overlay `patch` onto `base`, top-level keys only.
///
/// Keys present in `patch` overwrite; keys only in `base` are preserved;
/// nested objects are replaced wholesale, never merged recursively.
/// Non-object inputs yield the patch.
pub fn shallow_merge(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (key, value) in patch {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, patch) => patch,
    }
}

/// Resolve a node's identity and serialize its body for storage.
///
/// An explicit id wins over `body.id` and is written into the body, so
/// the stored document always carries its own identity.
fn prepare_body(body: Value, id: Option<NodeId>) -> Result<(NodeId, String)> {
    let mut map = match body {
        Value::Object(map) => map,
        _ => {
            return Err(GraphError::Validation(
                "node body must be a JSON object".to_string(),
            ))
        }
    };

    let id = match id {
        Some(id) => {
            validate_endpoint(&id)?;
            map.insert("id".to_string(), id.to_json());
            id
        }
        None => match map.get("id").and_then(NodeId::from_json) {
            Some(id) => id,
            None => {
                return Err(GraphError::Validation(
                    "node body has no usable id (string or integer)".to_string(),
                ))
            }
        },
    };

    let text = serde_json::to_string(&Value::Object(map)).map_err(GraphError::invalid_json)?;
    Ok((id, text))
}

/// Reject structurally unusable ids before they reach the engine.
fn validate_endpoint(id: &NodeId) -> Result<()> {
    match id {
        NodeId::Text(s) if s.is_empty() => {
            Err(GraphError::Validation("empty node id".to_string()))
        }
        _ => Ok(()),
    }
}

/// Convert a JSON argument to an engine-bindable scalar. Scalars bind
/// natively; arrays and objects bind as their JSON text.
fn bind_arg(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => Sql::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shallow_merge_overwrites_top_level_only() {
        let base = json!({"id": "a", "name": "old", "keep": 1, "nested": {"x": 1, "y": 2}});
        let patch = json!({"name": "new", "nested": {"x": 9}});
        let merged = shallow_merge(base, patch);
        assert_eq!(
            merged,
            json!({"id": "a", "name": "new", "keep": 1, "nested": {"x": 9}})
        );
    }

    #[test]
    fn prepare_body_prefers_explicit_id() {
        let (id, text) = prepare_body(json!({"id": "inner", "k": 1}), Some("outer".into())).unwrap();
        assert_eq!(id, NodeId::from("outer"));
        let stored: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(stored["id"], json!("outer"));
    }

    #[test]
    fn prepare_body_extracts_body_id() {
        let (id, _) = prepare_body(json!({"id": 7}), None).unwrap();
        assert_eq!(id, NodeId::Int(7));
    }

    #[test]
    fn prepare_body_rejects_missing_or_unusable_ids() {
        assert!(prepare_body(json!({"name": "x"}), None).is_err());
        assert!(prepare_body(json!({"id": [1, 2]}), None).is_err());
        assert!(prepare_body(json!("not an object"), None).is_err());
        assert!(prepare_body(json!({"k": 1}), Some("".into())).is_err());
    }

    #[test]
    fn bind_arg_scalars() {
        use rusqlite::types::Value as Sql;
        assert_eq!(bind_arg(&json!("s")), Sql::Text("s".into()));
        assert_eq!(bind_arg(&json!(3)), Sql::Integer(3));
        assert_eq!(bind_arg(&json!(true)), Sql::Integer(1));
        assert_eq!(bind_arg(&json!(null)), Sql::Null);
        assert_eq!(bind_arg(&json!([1, 2])), Sql::Text("[1,2]".into()));
    }
}
