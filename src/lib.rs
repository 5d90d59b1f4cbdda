//! relgraph — a graph-shaped access layer over a SQLite JSON-document
//! store.
//!
//! Nodes are JSON documents keyed by a unique `id`; edges are directed,
//! JSON-annotated relationships between node ids with enforced
//! referential integrity. Searches and traversals are modelled as small
//! query ASTs rendered to parameterized SQL; traversal expands
//! breadth-first through a recursive fixed-point query.
//!
//! ```no_run
//! use relgraph::{Graph, Predicate, SearchQuery, TraversalQuery, Comparison};
//! use serde_json::json;
//!
//! # fn main() -> relgraph::Result<()> {
//! let mut graph = Graph::in_memory()?;
//! graph.add_node(json!({"id": "a", "name": "Alice"}), None)?;
//! graph.add_node(json!({"id": "b", "name": "Bob"}), None)?;
//! graph.connect_nodes_with_properties(&"a".into(), &"b".into(), json!({"rel": "knows"}))?;
//!
//! let found = graph.find_nodes(
//!     &SearchQuery::new().filter(Predicate::key("name", Comparison::Like)?),
//!     &[json!("Al%")],
//! )?;
//! assert_eq!(found.len(), 1);
//!
//! let reached = graph.traverse(&"a".into(), &TraversalQuery::new().with_bodies())?;
//! assert!(!reached.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod model;
pub mod query;

pub use error::{GraphError, Result};
pub use graph::{shallow_merge, DotOptions, Graph};
pub use model::{Edge, NodeId, TraversalStep};
pub use query::{Comparison, Connector, Predicate, ResultColumn, SearchQuery, TraversalQuery};
