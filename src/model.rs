//! Record types shared across the store and query layers.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node identifier: a JSON string or integer, unique graph-wide and
/// immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Text(String),
}

impl NodeId {
    /// Extract an id from a JSON value. Only strings and integers are
    /// usable identities.
    pub fn from_json(value: &Value) -> Option<NodeId> {
        match value {
            Value::String(s) => Some(NodeId::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(NodeId::Int),
            _ => None,
        }
    }

    /// The id as a JSON value, for writing back into a node body.
    pub fn to_json(&self) -> Value {
        match self {
            NodeId::Int(n) => Value::from(*n),
            NodeId::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(n) => write!(f, "{n}"),
            NodeId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::Text(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId::Text(s)
    }
}

impl From<i64> for NodeId {
    fn from(n: i64) -> Self {
        NodeId::Int(n)
    }
}

impl ToSql for NodeId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            NodeId::Int(n) => Ok(ToSqlOutput::from(*n)),
            NodeId::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

impl FromSql for NodeId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(n) => Ok(NodeId::Int(n)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| NodeId::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// Directed edge between two node ids.
///
/// Identity is the full (source, target, properties) triple — the same
/// pair with different properties is a distinct edge. Endpoints are weak
/// references by id into the node set, enforced by the storage engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    /// Arbitrary JSON annotation; `{}` when nothing was stored.
    pub properties: Value,
}

/// One decoded row of a traversal result.
///
/// Edge steps carry the edge's own source/target pair verbatim from the
/// expansion step: an edge reached inbound has its source as the newly
/// discovered node and its target as the already-known one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraversalStep {
    Node {
        id: NodeId,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        depth: u32,
    },
    Edge {
        source: NodeId,
        target: NodeId,
        properties: Value,
        depth: u32,
    },
}

impl TraversalStep {
    /// Expansion round at which this row was admitted (seed is 0).
    pub fn depth(&self) -> u32 {
        match self {
            TraversalStep::Node { depth, .. } | TraversalStep::Edge { depth, .. } => *depth,
        }
    }

    /// Reached node id for node steps, `None` for edge steps.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            TraversalStep::Node { id, .. } => Some(id),
            TraversalStep::Edge { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_from_json_accepts_strings_and_integers() {
        assert_eq!(NodeId::from_json(&json!("a")), Some(NodeId::Text("a".into())));
        assert_eq!(NodeId::from_json(&json!(42)), Some(NodeId::Int(42)));
        assert_eq!(NodeId::from_json(&json!(1.5)), None);
        assert_eq!(NodeId::from_json(&json!({"nested": true})), None);
        assert_eq!(NodeId::from_json(&json!(null)), None);
    }

    #[test]
    fn id_round_trips_through_json() {
        for id in [NodeId::from("alpha"), NodeId::from(7)] {
            assert_eq!(NodeId::from_json(&id.to_json()), Some(id));
        }
    }

    #[test]
    fn traversal_step_accessors() {
        let node = TraversalStep::Node {
            id: "a".into(),
            body: None,
            depth: 2,
        };
        assert_eq!(node.depth(), 2);
        assert_eq!(node.node_id(), Some(&NodeId::from("a")));

        let edge = TraversalStep::Edge {
            source: "a".into(),
            target: "b".into(),
            properties: json!({}),
            depth: 1,
        };
        assert_eq!(edge.depth(), 1);
        assert_eq!(edge.node_id(), None);
    }
}
