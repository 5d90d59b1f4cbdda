//! Predicate fragments for node searches.

use crate::error::Result;

use super::validate_path;

/// Logical connector prefixed to a fragment when it is combined with
/// others. Placement is the caller's responsibility — fragments are
/// concatenated in the order given, joined by single spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
    Not,
}

impl Connector {
    fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
            Connector::Not => "NOT",
        }
    }
}

/// Comparison between an extracted value and a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    #[default]
    Eq,
    Like,
    Gt,
    Lt,
}

impl Comparison {
    fn as_sql(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Like => "LIKE",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PredicateKind {
    /// Equality on the node identity column.
    Id,
    /// Comparison against a JSON path extracted from the body.
    KeyValue { path: String, op: Comparison },
    /// Comparison against any value enumerated from the body's JSON
    /// tree. Reaches values nested in arrays and sub-objects that
    /// key-value extraction cannot.
    Tree { op: Comparison },
}

/// One boolean fragment of a search WHERE clause.
///
/// Renders to placeholder-bearing SQL; the matching value is bound
/// positionally at execution time. The JSON path in a key-value
/// predicate is the only untrusted text that reaches the rendered SQL,
/// and it is validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    connector: Option<Connector>,
    kind: PredicateKind,
}

impl Predicate {
    /// `id = ?`
    pub fn id() -> Predicate {
        Predicate {
            connector: None,
            kind: PredicateKind::Id,
        }
    }

    /// `json_extract(body, '$.<path>') <op> ?`
    ///
    /// Fails with a validation error if `path` is not a safe identifier
    /// (letters, digits, underscore, dot).
    pub fn key(path: impl Into<String>, op: Comparison) -> Result<Predicate> {
        let path = path.into();
        validate_path(&path)?;
        Ok(Predicate {
            connector: None,
            kind: PredicateKind::KeyValue { path, op },
        })
    }

    /// `json_tree.value <op> ?`
    ///
    /// Only meaningful when the enclosing search enables tree expansion
    /// (see [`super::SearchQuery::with_tree`]).
    pub fn tree(op: Comparison) -> Predicate {
        Predicate {
            connector: None,
            kind: PredicateKind::Tree { op },
        }
    }

    /// Prefix this fragment with `AND`.
    pub fn and(self) -> Predicate {
        self.connected(Connector::And)
    }

    /// Prefix this fragment with `OR`.
    pub fn or(self) -> Predicate {
        self.connected(Connector::Or)
    }

    /// Prefix this fragment with `NOT`.
    pub fn negated(self) -> Predicate {
        self.connected(Connector::Not)
    }

    fn connected(mut self, connector: Connector) -> Predicate {
        self.connector = Some(connector);
        self
    }

    /// Render this fragment to SQL text.
    pub fn render(&self) -> String {
        let fragment = match &self.kind {
            PredicateKind::Id => "id = ?".to_string(),
            PredicateKind::KeyValue { path, op } => {
                format!("json_extract(body, '$.{}') {} ?", path, op.as_sql())
            }
            PredicateKind::Tree { op } => format!("json_tree.value {} ?", op.as_sql()),
        };
        match self.connector {
            Some(connector) => format!("{} {}", connector.as_sql(), fragment),
            None => fragment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_fragment() {
        assert_eq!(Predicate::id().render(), "id = ?");
    }

    #[test]
    fn key_value_fragment_with_default_op() {
        let p = Predicate::key("name", Comparison::default()).unwrap();
        assert_eq!(p.render(), "json_extract(body, '$.name') = ?");
    }

    #[test]
    fn key_value_fragment_with_like_and_dotted_path() {
        let p = Predicate::key("address.city", Comparison::Like).unwrap();
        assert_eq!(p.render(), "json_extract(body, '$.address.city') LIKE ?");
    }

    #[test]
    fn tree_fragment() {
        assert_eq!(Predicate::tree(Comparison::Gt).render(), "json_tree.value > ?");
    }

    #[test]
    fn connectors_prefix_the_fragment() {
        let p = Predicate::key("age", Comparison::Lt).unwrap().and();
        assert_eq!(p.render(), "AND json_extract(body, '$.age') < ?");
        assert_eq!(Predicate::id().or().render(), "OR id = ?");
        assert_eq!(Predicate::id().negated().render(), "NOT id = ?");
    }

    #[test]
    fn hostile_path_is_rejected_at_construction() {
        let err = Predicate::key("name') OR 1=1 --", Comparison::Eq).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
