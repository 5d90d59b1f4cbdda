//! Search query construction over the node relation.

use crate::error::Result;

use super::predicate::Predicate;
use super::validate_path;

/// Which column a search returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultColumn {
    /// Bare node identities.
    Id,
    /// Full node bodies.
    #[default]
    Body,
}

/// JSON-tree enumeration joined next to the node relation, for
/// predicates over values nested anywhere in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeExpansion {
    /// Enumerate the whole body tree.
    WholeBody,
    /// Enumerate only the tree under one top-level key.
    Key(String),
}

/// One declarative node search.
///
/// Pure value type: `render()` produces the same text for the same
/// configuration, with no engine access. Predicate fragments are
/// concatenated in insertion order with no automatic connectors — the
/// caller supplies interstitial `AND`/`OR`/`NOT` on the fragments
/// themselves. An empty fragment list is an unfiltered full scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchQuery {
    column: ResultColumn,
    tree: Option<TreeExpansion>,
    predicates: Vec<Predicate>,
}

impl SearchQuery {
    pub fn new() -> SearchQuery {
        SearchQuery::default()
    }

    /// Select which column result rows carry (default: body).
    pub fn returning(mut self, column: ResultColumn) -> SearchQuery {
        self.column = column;
        self
    }

    /// Join a whole-body `json_tree` enumeration.
    pub fn with_tree(mut self) -> SearchQuery {
        self.tree = Some(TreeExpansion::WholeBody);
        self
    }

    /// Join a `json_tree` enumeration scoped to one top-level key.
    ///
    /// The key is interpolated into path syntax and validated like any
    /// JSON path segment.
    pub fn with_tree_at(mut self, key: impl Into<String>) -> Result<SearchQuery> {
        let key = key.into();
        validate_path(&key)?;
        self.tree = Some(TreeExpansion::Key(key));
        Ok(self)
    }

    /// Append one predicate fragment.
    pub fn filter(mut self, predicate: Predicate) -> SearchQuery {
        self.predicates.push(predicate);
        self
    }

    /// Requested result column, for row decoding.
    pub fn column(&self) -> ResultColumn {
        self.column
    }

    /// Render the full selection statement.
    pub fn render(&self) -> String {
        let mut sql = String::from("SELECT ");
        sql.push_str(match self.column {
            ResultColumn::Id => "id",
            ResultColumn::Body => "body",
        });
        sql.push_str(" FROM nodes");
        match &self.tree {
            Some(TreeExpansion::WholeBody) => sql.push_str(", json_tree(body)"),
            Some(TreeExpansion::Key(key)) => {
                sql.push_str(", json_tree(body, '$.");
                sql.push_str(key);
                sql.push_str("')");
            }
            None => {}
        }
        if !self.predicates.is_empty() {
            sql.push_str(" WHERE ");
            let fragments: Vec<String> = self.predicates.iter().map(Predicate::render).collect();
            sql.push_str(&fragments.join(" "));
        }
        sql
    }
}
