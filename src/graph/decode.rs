//! Row decoding: raw engine rows back into typed graph records.

use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::model::{NodeId, TraversalStep};

/// Parse a stored node body.
///
/// A stored row that fails to parse is storage corruption, not caller
/// error, and is classified as a database failure.
pub(crate) fn body(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(GraphError::corrupted)
}

/// Parse a stored edge properties column, defaulting to `{}` when the
/// column is NULL or empty.
pub(crate) fn properties(raw: Option<&str>) -> Result<Value> {
    match raw {
        None | Some("") => Ok(Value::Object(serde_json::Map::new())),
        Some(text) => serde_json::from_str(text).map_err(GraphError::corrupted),
    }
}

/// One undecoded traversal row, as produced by the recursive query.
pub(crate) struct RawStep {
    pub kind: String,
    pub reached: NodeId,
    pub source: Option<NodeId>,
    pub target: Option<NodeId>,
    pub payload: Option<String>,
    pub depth: i64,
}

impl RawStep {
    /// Identity key for duplicate suppression. The same node can surface
    /// at several depths (the fixed point dedups whole rows, not
    /// identities); the first occurrence wins.
    fn identity(&self) -> String {
        match self.kind.as_str() {
            "node" => format!("n\u{1}{}", self.reached),
            _ => format!(
                "e\u{1}{}\u{1}{}\u{1}{}",
                self.source.as_ref().map(ToString::to_string).unwrap_or_default(),
                self.target.as_ref().map(ToString::to_string).unwrap_or_default(),
                self.payload.as_deref().unwrap_or_default()
            ),
        }
    }

    fn decode(self) -> Result<TraversalStep> {
        let depth = u32::try_from(self.depth)
            .map_err(|_| GraphError::corrupted(format!("negative depth {}", self.depth)))?;
        match self.kind.as_str() {
            "node" => Ok(TraversalStep::Node {
                id: self.reached,
                body: self.payload.as_deref().map(body).transpose()?,
                depth,
            }),
            "edge" => {
                let (source, target) = match (self.source, self.target) {
                    (Some(s), Some(t)) => (s, t),
                    _ => {
                        return Err(GraphError::corrupted("edge row missing endpoints"));
                    }
                };
                Ok(TraversalStep::Edge {
                    source,
                    target,
                    properties: properties(self.payload.as_deref())?,
                    depth,
                })
            }
            other => Err(GraphError::corrupted(format!("unknown row kind {other:?}"))),
        }
    }
}

/// Decode tagged traversal rows, suppressing repeat sightings of the
/// same node id or edge triple while preserving first-seen order.
pub(crate) fn traversal_steps(raw: Vec<RawStep>) -> Result<Vec<TraversalStep>> {
    let mut seen = std::collections::HashSet::new();
    let mut steps = Vec::new();
    for row in raw {
        if seen.insert(row.identity()) {
            steps.push(row.decode()?);
        }
    }
    Ok(steps)
}

/// Decode bodiless traversal rows into first-seen-ordered node steps.
pub(crate) fn traversal_ids(raw: Vec<(NodeId, i64)>) -> Result<Vec<TraversalStep>> {
    let mut seen = std::collections::HashSet::new();
    let mut steps = Vec::new();
    for (id, depth) in raw {
        if seen.insert(id.clone()) {
            let depth = u32::try_from(depth)
                .map_err(|_| GraphError::corrupted(format!("negative depth {depth}")))?;
            steps.push(TraversalStep::Node {
                id,
                body: None,
                depth,
            });
        }
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_parse_failure_is_a_database_error() {
        let err = body("{not json").unwrap_err();
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert!(err.to_string().contains("corrupted"));
    }

    #[test]
    fn empty_properties_default_to_an_object() {
        assert_eq!(properties(None).unwrap(), json!({}));
        assert_eq!(properties(Some("")).unwrap(), json!({}));
        assert_eq!(properties(Some("{\"w\":1}")).unwrap(), json!({"w": 1}));
    }

    #[test]
    fn duplicate_nodes_keep_first_occurrence() {
        let rows = vec![
            RawStep {
                kind: "node".into(),
                reached: "a".into(),
                source: None,
                target: None,
                payload: Some("{\"id\":\"a\"}".into()),
                depth: 0,
            },
            RawStep {
                kind: "node".into(),
                reached: "a".into(),
                source: None,
                target: None,
                payload: Some("{\"id\":\"a\"}".into()),
                depth: 2,
            },
        ];
        let steps = traversal_steps(rows).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].depth(), 0);
    }

    #[test]
    fn unknown_kind_is_corruption() {
        let rows = vec![RawStep {
            kind: "link".into(),
            reached: "a".into(),
            source: None,
            target: None,
            payload: None,
            depth: 0,
        }];
        assert!(traversal_steps(rows).is_err());
    }

    #[test]
    fn bodiless_ids_dedup_in_order() {
        let rows = vec![
            (NodeId::from("a"), 0),
            (NodeId::from("b"), 1),
            (NodeId::from("a"), 2),
            (NodeId::from("c"), 1),
        ];
        let steps = traversal_ids(rows).unwrap();
        let ids: Vec<NodeId> = steps
            .iter()
            .filter_map(TraversalStep::node_id)
            .cloned()
            .collect();
        assert_eq!(ids, vec!["a".into(), "b".into(), "c".into()] as Vec<NodeId>);
    }
}
