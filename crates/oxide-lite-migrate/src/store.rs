//! Snapshot persistence.
//!
//! The last applied snapshot lives either in a JSON file next to the
//! database (`migrations.json`) or in the `oxide_lite_migrations` table of
//! the database itself. Either way a missing snapshot means an empty schema.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{MigrateError, Result};
use crate::snapshot::Snapshot;

/// SQL to create the snapshot history table (SQLite).
pub const CREATE_SNAPSHOT_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS oxide_lite_migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    number INTEGER NOT NULL UNIQUE,
    snapshot TEXT NOT NULL,
    applied TEXT NOT NULL DEFAULT (datetime('now'))
)
"#;

/// Where snapshots are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStore {
    /// A JSON document holding the latest snapshot.
    File(PathBuf),
    /// One row per applied snapshot in `oxide_lite_migrations`.
    Table,
}

impl SnapshotStore {
    /// A file store at `path`.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    /// Creates the history table for the table store.
    pub async fn ensure(&self, pool: &SqlitePool) -> Result<()> {
        if matches!(self, Self::Table) {
            sqlx::query(CREATE_SNAPSHOT_TABLE_SQL).execute(pool).await?;
        }
        Ok(())
    }

    /// Loads the latest snapshot, `None` when nothing was ever applied.
    pub async fn load(&self, pool: &SqlitePool) -> Result<Option<Snapshot>> {
        match self {
            Self::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(json) => Ok(Some(Snapshot::from_json(&json)?)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "no snapshot file");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            },
            Self::Table => {
                self.ensure(pool).await?;
                let json: Option<String> = sqlx::query_scalar(
                    "SELECT snapshot FROM oxide_lite_migrations ORDER BY number DESC LIMIT 1",
                )
                .fetch_optional(pool)
                .await?;
                json.map(|json| Snapshot::from_json(&json))
                    .transpose()
                    .map_err(Into::into)
            }
        }
    }

    /// Records a snapshot in the history table on `conn`, normally inside
    /// the migration's transaction. Does nothing for the file store.
    pub(crate) async fn record(&self, conn: &mut SqliteConnection, snapshot: &Snapshot) -> Result<()> {
        if let Self::Table = self {
            let json = snapshot.to_json()?;
            sqlx::query("INSERT INTO oxide_lite_migrations (number, snapshot) VALUES (?, ?)")
                .bind(i64::try_from(snapshot.number).unwrap_or(i64::MAX))
                .bind(json)
                .execute(conn)
                .await
                .map_err(|e| MigrateError::SnapshotPersistence(e.to_string()))?;
        }
        Ok(())
    }

    /// Writes a snapshot file after the migration committed. The document
    /// is written to a sibling temporary file first and renamed over the
    /// previous one. Does nothing for the table store.
    pub(crate) async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let Self::File(path) = self else {
            return Ok(());
        };
        let json = snapshot.to_json()?;
        let mut temporary = path.clone().into_os_string();
        temporary.push(".tmp");
        let temporary = PathBuf::from(temporary);

        let persist = async {
            tokio::fs::write(&temporary, json.as_bytes()).await?;
            tokio::fs::rename(&temporary, path).await
        };
        persist.await.map_err(|e| {
            MigrateError::SnapshotPersistence(format!("{}: {e}", path.display()))
        })?;
        info!(path = %path.display(), number = snapshot.number, "snapshot written");
        Ok(())
    }
}
