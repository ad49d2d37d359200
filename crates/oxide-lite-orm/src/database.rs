//! Connection configuration and the database handle.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use oxide_lite_core::backend::{Backend, SqliteBackend};
use oxide_lite_core::Registry;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::error::{OrmError, Result};
use crate::manager::Manager;

/// Connection settings for a SQLite database.
///
/// ```
/// use oxide_lite_orm::DatabaseConfig;
///
/// let config = DatabaseConfig::file("app.sqlite3").max_connections(2);
/// assert_eq!(config.url(), "sqlite:app.sqlite3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    url: String,
    max_connections: u32,
    create_if_missing: bool,
    regexp: bool,
}

impl DatabaseConfig {
    /// Creates a configuration from a connection URL such as
    /// `sqlite:db.sqlite3` or `sqlite::memory:`.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 1,
            create_if_missing: true,
            regexp: true,
        }
    }

    /// A private in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self::new("sqlite::memory:")
    }

    /// A database stored in `path`.
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(&format!("sqlite:{}", path.as_ref().display()))
    }

    /// Sets the pool size. Defaults to 1.
    #[must_use]
    pub const fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Creates the file when it does not exist. Defaults to `true`.
    #[must_use]
    pub const fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Registers the `REGEXP` function on every connection. Defaults to `true`.
    #[must_use]
    pub const fn regexp(mut self, enabled: bool) -> Self {
        self.regexp = enabled;
        self
    }

    /// Returns the connection URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns whether the configuration points at an in-memory database.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:")
    }

    /// Opens a connection pool.
    pub async fn connect(&self) -> Result<SqlitePool> {
        let mut options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|e| OrmError::database(format!("options for '{}'", self.url), e))?
            .create_if_missing(self.create_if_missing)
            .foreign_keys(true);
        if self.regexp {
            options = options.with_regexp();
        }

        let mut pool = SqlitePoolOptions::new().max_connections(self.max_connections);
        if self.is_memory() {
            // Each connection to :memory: is its own database.
            pool = pool.max_connections(1).idle_timeout(None).max_lifetime(None);
        }
        let pool = pool
            .connect_with(options)
            .await
            .map_err(|e| OrmError::database(format!("connect to '{}'", self.url), e))?;
        info!(url = %self.url, "database connected");
        Ok(pool)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("sqlite:db.sqlite3")
    }
}

/// A connection pool together with the registry of declared tables.
///
/// Cloning is cheap; clones share the pool, the registry and the write lock.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    registry: Arc<Registry>,
    backend: SqliteBackend,
    writes: Arc<Mutex<()>>,
}

impl Database {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool, registry: Registry) -> Self {
        Self {
            pool,
            registry: Arc::new(registry),
            backend: SqliteBackend::new(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Opens a pool from `config`.
    pub async fn connect(config: &DatabaseConfig, registry: Registry) -> Result<Self> {
        Ok(Self::new(config.connect().await?, registry))
    }

    /// Returns the pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the rendering backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        &self.backend
    }

    /// Returns the manager of `table`.
    pub fn objects(&self, table: &str) -> Result<Manager> {
        self.registry.table(table)?;
        Ok(Manager::new(self.clone(), table))
    }

    /// Serializes writes issued through this handle and its clones.
    pub(crate) async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
