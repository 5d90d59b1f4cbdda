//! Error types for the graph store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Failure taxonomy for graph operations.
///
/// The four kinds are disjoint and exhaustive:
/// - `Validation` — caller-supplied input is structurally invalid and is
///   rejected before any engine call.
/// - `Constraint` — a write would violate a uniqueness or
///   referential-integrity rule; detected by the engine.
/// - `NotFound` — a targeted mutation matched zero existing rows.
/// - `Database` — engine-level failure unrelated to caller input,
///   including corrupted stored data encountered on read.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),
}

impl GraphError {
    /// Stable error code for callers that dispatch on kind.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::Validation(_) => "VALIDATION_ERROR",
            GraphError::Constraint(_) => "CONSTRAINT_ERROR",
            GraphError::NotFound(_) => "NOT_FOUND",
            GraphError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Malformed JSON supplied by the caller for a write.
    pub(crate) fn invalid_json(err: serde_json::Error) -> Self {
        GraphError::Validation(format!("invalid JSON data: {err}"))
    }

    /// Malformed JSON read back from a stored row. Storage corruption,
    /// not caller error — non-recoverable for that row.
    pub(crate) fn corrupted(detail: impl std::fmt::Display) -> Self {
        GraphError::Database(format!("corrupted stored data: {detail}"))
    }
}

/// Classify engine failures into the domain taxonomy.
///
/// SQLite extended result codes distinguish the two constraint cases:
/// a UNIQUE/PRIMARY KEY hit on the node identity column is a duplicate
/// id, a FOREIGN KEY hit on edge insert is a missing endpoint. Anything
/// else propagates unclassified.
impl From<rusqlite::Error> for GraphError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        match &err {
            rusqlite::Error::SqliteFailure(cause, _)
                if cause.code == ffi::ErrorCode::ConstraintViolation =>
            {
                match cause.extended_code {
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        GraphError::Constraint("endpoint node does not exist".to_string())
                    }
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        GraphError::Constraint("duplicate node id".to_string())
                    }
                    _ => GraphError::Database(err.to_string()),
                }
            }
            _ => GraphError::Database(err.to_string()),
        }
    }
}
