//! Declarative SQL construction.
//!
//! Queries are modelled as small ASTs and rendered to deterministic text
//! by `render()` methods — never ad hoc concatenation at call sites.
//! Rendered text carries positional `?` placeholders only; values are
//! bound separately at execution time. The one piece of caller text that
//! cannot be bound is a JSON path segment inside `json_extract`/`json_tree`
//! syntax, so those are validated against a safe-identifier allow-list
//! before interpolation.

pub mod predicate;
pub mod search;
pub mod traverse;

pub use predicate::{Comparison, Connector, Predicate};
pub use search::{ResultColumn, SearchQuery, TreeExpansion};
pub use traverse::TraversalQuery;

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::{GraphError, Result};

fn safe_path() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[A-Za-z0-9_.]+$").unwrap())
}

/// Validate a caller-supplied JSON path segment before it is
/// interpolated into generated SQL. Letters, digits, underscore and dot
/// only — anything else is rejected up front.
pub(crate) fn validate_path(segment: &str) -> Result<()> {
    if safe_path().is_match(segment) {
        Ok(())
    } else {
        Err(GraphError::Validation(format!(
            "unsafe JSON path segment: {segment:?}"
        )))
    }
}
