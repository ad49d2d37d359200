//! Error types for the executor and result sets.

use oxide_lite_core::CoreError;
use thiserror::Error;

/// Errors raised while running statements.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The statement could not be built.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The engine rejected a statement.
    #[error("database error ({context}): {source}")]
    Database {
        /// The table and statement kind that failed.
        context: String,
        /// The engine error.
        #[source]
        source: sqlx::Error,
    },

    /// A write statement was run a second time.
    #[error("{0} statement on '{1}' was already executed")]
    AlreadyExecuted(String, String),

    /// No object found matching the query.
    #[error("no row of '{0}' matches the query")]
    NotFound(String),

    /// Multiple objects found when exactly one was expected.
    #[error("{1} rows of '{0}' returned when one was expected")]
    MultipleObjectsReturned(String, usize),

    /// A row cannot take part in the requested operation.
    #[error("validation error: {0}")]
    Validation(String),
}

impl OrmError {
    pub(crate) fn database(context: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Database {
            context: context.into(),
            source,
        }
    }
}

impl From<sqlx::Error> for OrmError {
    fn from(source: sqlx::Error) -> Self {
        Self::database("connection", source)
    }
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;
