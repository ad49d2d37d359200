//! Error types for expression building, lookup resolution and node compilation.
//!
//! Every variant here is raised while a statement is being *built*, so none of
//! them can occur after SQL has reached storage.

use thiserror::Error;

/// Construction-time errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A column or table name is empty, malformed or an SQL keyword.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A filter key names an operator or column that does not exist.
    #[error("unknown lookup: '{token}' in '{key}'")]
    UnknownLookup {
        /// The offending token.
        token: String,
        /// The full filter key it was found in.
        key: String,
    },

    /// Two expressions or a value and a field type cannot be combined.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A relationship between a table and itself needs an explicit name.
    #[error("relationship between '{0}' and itself requires a related name")]
    RelationshipNameRequired(String),

    /// The table is not registered.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A node was built from structurally invalid input.
    #[error("invalid structure: {0}")]
    Structure(String),
}

impl CoreError {
    pub(crate) fn unknown_lookup(token: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownLookup {
            token: token.into(),
            key: key.into(),
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
