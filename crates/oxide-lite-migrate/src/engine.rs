//! The migration engine.
//!
//! [`Migrations`] walks `Unsnapshotted → Diffed → Applied`:
//! [`Migrations::make_migrations`] snapshots the registry and diffs it against
//! the last persisted snapshot, [`Migrations::migrate`] runs the plan in one
//! transaction and persists the new snapshot only once the plan succeeded.

use std::sync::{Arc, OnceLock};

use oxide_lite_core::backend::{Backend, SqliteBackend};
use oxide_lite_core::Registry;
use sqlx::sqlite::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::diff::{diff, MigrationPlan};
use crate::error::{MigrateError, Result};
use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;

/// Serializes `migrate` across every engine of the process.
fn migrate_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// No snapshot of the declared schema was taken yet.
    Unsnapshotted,
    /// A plan was computed and not applied.
    Diffed,
    /// The plan ran and its snapshot was persisted.
    Applied,
}

/// What a call to [`Migrations::migrate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Number of the snapshot storage now matches.
    pub number: u64,
    /// Statements executed.
    pub statements: Vec<String>,
}

impl MigrationReport {
    /// Returns `true` when nothing had to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Snapshots, diffs and applies a declared schema.
pub struct Migrations {
    pool: SqlitePool,
    registry: Arc<Registry>,
    store: SnapshotStore,
    backend: SqliteBackend,
    state: MigrationState,
    previous: Option<Snapshot>,
    current: Option<Snapshot>,
    plan: Option<MigrationPlan>,
}

impl Migrations {
    /// Creates an engine for `registry` over `pool`.
    pub fn new(pool: SqlitePool, registry: impl Into<Arc<Registry>>, store: SnapshotStore) -> Self {
        Self {
            pool,
            registry: registry.into(),
            store,
            backend: SqliteBackend::new(),
            state: MigrationState::Unsnapshotted,
            previous: None,
            current: None,
            plan: None,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> MigrationState {
        self.state
    }

    /// Returns the snapshot store.
    #[must_use]
    pub const fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Returns the rendering backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        &self.backend
    }

    /// Returns the last persisted snapshot, or an empty one numbered 0.
    pub async fn latest(&self) -> Result<Snapshot> {
        Ok(self
            .store
            .load(&self.pool)
            .await?
            .unwrap_or_else(Snapshot::empty))
    }

    /// Snapshots the declared schema and diffs it against the last
    /// persisted snapshot.
    pub async fn make_migrations(&mut self) -> Result<&MigrationPlan> {
        let previous = self.latest().await?;
        let current = Snapshot::from_registry(&self.registry, &self.backend);
        info!(
            tables = current.tables.len(),
            previous = previous.number,
            "schema snapshot built"
        );

        let plan = diff(&previous, &current)?;
        if plan.is_empty() {
            warn!("no changes detected");
        } else {
            info!(operations = plan.len(), "migration computed");
        }

        self.previous = Some(previous);
        self.current = Some(current);
        self.state = MigrationState::Diffed;
        Ok(self.plan.insert(plan))
    }

    /// Returns the script `migrate` would run, without running it.
    pub async fn sql_migrate(&mut self) -> Result<Vec<String>> {
        if self.state != MigrationState::Diffed {
            self.make_migrations().await?;
        }
        Ok(self
            .plan
            .as_ref()
            .map(|plan| plan.statements(&self.backend))
            .unwrap_or_default())
    }

    /// Applies the pending plan, computing it first when needed.
    ///
    /// Statements run in one transaction. The new snapshot is written to the
    /// table store inside that transaction, or to the file store after it
    /// commits. A failing statement rolls everything back and leaves the
    /// previous snapshot in place.
    pub async fn migrate(&mut self) -> Result<MigrationReport> {
        let _guard = migrate_lock().lock().await;

        // Another engine may have migrated since the plan was made.
        self.make_migrations().await?;
        let (Some(previous), Some(current), Some(plan)) =
            (&self.previous, &self.current, &self.plan)
        else {
            return Err(MigrateError::InvalidState(String::from(
                "no migration was computed",
            )));
        };

        if plan.is_empty() {
            self.state = MigrationState::Applied;
            return Ok(MigrationReport {
                number: previous.number,
                statements: Vec::new(),
            });
        }

        let statements = plan.statements(&self.backend);
        let next = current.numbered(previous.number + 1);
        self.store.ensure(&self.pool).await?;

        let mut tx = self.pool.begin().await?;
        for sql in &statements {
            debug!(sql = %sql, "Executing SQL");
            sqlx::query(sql).execute(&mut *tx).await?;
        }
        self.store.record(&mut tx, &next).await?;
        tx.commit().await?;
        info!(number = next.number, statements = statements.len(), "migration applied");

        self.store.write(&next).await?;

        self.previous = Some(next.clone());
        self.current = Some(next.clone());
        self.plan = Some(MigrationPlan::default());
        self.state = MigrationState::Applied;
        Ok(MigrationReport {
            number: next.number,
            statements,
        })
    }
}
