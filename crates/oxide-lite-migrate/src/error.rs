//! Error types for the migration engine.

use std::path::PathBuf;

use oxide_lite_core::CoreError;

/// Errors that can occur while snapshotting, diffing or applying a schema.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The declared schema is invalid.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error during migration execution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading snapshot or schema files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A schema change SQLite's ALTER TABLE cannot express.
    #[error("Unsupported migration on '{table}': {detail}")]
    UnsupportedMigration {
        /// The table being changed.
        table: String,
        /// What the change was.
        detail: String,
    },

    /// The migration ran but its snapshot could not be written.
    #[error("Failed to persist snapshot: {0}")]
    SnapshotPersistence(String),

    /// Failed to parse a declared-schema file.
    #[error("Failed to parse schema file '{path}': {message}")]
    ParseError {
        /// Path to the schema file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// An engine operation was called out of order.
    #[error("Invalid migration state: {0}")]
    InvalidState(String),
}

impl MigrateError {
    pub(crate) fn unsupported(table: &str, detail: impl Into<String>) -> Self {
        Self::UnsupportedMigration {
            table: table.to_string(),
            detail: detail.into(),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
