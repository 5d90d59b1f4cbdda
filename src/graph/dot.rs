//! Graphviz DOT export.

use serde_json::Value;

use crate::error::Result;
use crate::model::NodeId;

use super::{decode, Graph};

/// Options for DOT rendering.
#[derive(Debug, Clone, Default)]
pub struct DotOptions {
    /// Top-level body key used for node labels; the id when absent or
    /// the key is missing from a body.
    pub node_label: Option<String>,
    /// Top-level properties key used for edge labels; edges are
    /// unlabeled when absent.
    pub edge_label: Option<String>,
}

impl Graph {
    /// Render the whole graph as a Graphviz `digraph`. Pure string
    /// output; writing it anywhere is the caller's business.
    pub fn to_dot(&self, options: &DotOptions) -> Result<String> {
        let mut out = String::from("digraph {\n");

        let mut stmt = self.conn.prepare_cached("SELECT body FROM nodes ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for raw in rows {
            let body = decode::body(&raw?)?;
            let id = body
                .get("id")
                .and_then(NodeId::from_json)
                .map(|id| id.to_string())
                .unwrap_or_default();
            let label = options
                .node_label
                .as_deref()
                .and_then(|key| body.get(key))
                .map(label_text)
                .unwrap_or_else(|| id.clone());
            out.push_str(&format!(
                "    \"{}\" [label=\"{}\"];\n",
                escape(&id),
                escape(&label)
            ));
        }

        let mut stmt = self
            .conn
            .prepare_cached("SELECT source, target, properties FROM edges ORDER BY source, target")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, NodeId>(0)?,
                row.get::<_, NodeId>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        for row in rows {
            let (source, target, props) = row?;
            let props = decode::properties(props.as_deref())?;
            let label = options
                .edge_label
                .as_deref()
                .and_then(|key| props.get(key))
                .map(label_text);
            match label {
                Some(label) => out.push_str(&format!(
                    "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
                    escape(&source.to_string()),
                    escape(&target.to_string()),
                    escape(&label)
                )),
                None => out.push_str(&format!(
                    "    \"{}\" -> \"{}\";\n",
                    escape(&source.to_string()),
                    escape(&target.to_string())
                )),
            }
        }

        out.push_str("}\n");
        Ok(out)
    }
}

/// JSON scalars label as their bare text, everything else as JSON.
fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nodes_and_edges() {
        let mut graph = Graph::in_memory().unwrap();
        graph.add_node(json!({"id": "a", "name": "Alice"}), None).unwrap();
        graph.add_node(json!({"id": "b", "name": "Bob"}), None).unwrap();
        graph
            .connect_nodes_with_properties(&"a".into(), &"b".into(), json!({"rel": "knows"}))
            .unwrap();

        let dot = graph
            .to_dot(&DotOptions {
                node_label: Some("name".to_string()),
                edge_label: Some("rel".to_string()),
            })
            .unwrap();

        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.contains("\"a\" [label=\"Alice\"];"));
        assert!(dot.contains("\"b\" [label=\"Bob\"];"));
        assert!(dot.contains("\"a\" -> \"b\" [label=\"knows\"];"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn defaults_to_id_labels_and_bare_edges() {
        let mut graph = Graph::in_memory().unwrap();
        graph.add_node(json!({"id": "x"}), None).unwrap();
        graph.add_node(json!({"id": "y"}), None).unwrap();
        graph.connect_nodes(&"x".into(), &"y".into()).unwrap();

        let dot = graph.to_dot(&DotOptions::default()).unwrap();
        assert!(dot.contains("\"x\" [label=\"x\"];"));
        assert!(dot.contains("\"x\" -> \"y\";"));
    }

    #[test]
    fn quotes_are_escaped() {
        let mut graph = Graph::in_memory().unwrap();
        graph
            .add_node(json!({"id": "q", "name": "say \"hi\""}), None)
            .unwrap();
        let dot = graph
            .to_dot(&DotOptions {
                node_label: Some("name".to_string()),
                edge_label: None,
            })
            .unwrap();
        assert!(dot.contains("label=\"say \\\"hi\\\"\""));
    }
}
