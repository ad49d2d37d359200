//! Snapshot-based migrations for oxide-lite schemas.
//!
//! Instead of hand-written migration files, the engine keeps a JSON snapshot
//! of the schema it last applied and derives each migration by diffing that
//! snapshot against the tables declared in a [`Registry`]:
//!
//! - **Snapshot** - the persisted schema description (`migrations.json` or
//!   the `oxide_lite_migrations` table)
//! - **Diff** - ordered `CREATE`/`ALTER`/`DROP` operations between two
//!   snapshots
//! - **Engine** - `make_migrations`, `migrate` and `sql_migrate`
//! - **Declared** - JSON schema files for the command-line tool
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_lite_core::prelude::*;
//! use oxide_lite_migrate::prelude::*;
//!
//! let mut registry = Registry::new();
//! registry.declare(TableBuilder::new("celebrities").field(Field::text("name")))?;
//!
//! let mut migrations = Migrations::new(pool, registry, SnapshotStore::file("migrations.json"));
//! let plan = migrations.make_migrations().await?;
//! assert_eq!(plan.len(), 1);
//! let report = migrations.migrate().await?;
//! assert_eq!(report.number, 1);
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the changes between the schema file and the last snapshot
//! oxide-lite-migrate --schema schema.json makemigrations
//!
//! # Apply them
//! oxide-lite-migrate --schema schema.json migrate
//!
//! # Show the last applied snapshot
//! oxide-lite-migrate showmigrations
//!
//! # Print the SQL without running it
//! oxide-lite-migrate --schema schema.json sqlmigrate
//! ```
//!
//! [`Registry`]: oxide_lite_core::Registry

pub mod declared;
pub mod diff;
pub mod engine;
pub mod error;
pub mod snapshot;
pub mod store;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::declared::SchemaSpec;
    pub use crate::diff::{diff, MigrationPlan, Operation};
    pub use crate::engine::{MigrationReport, MigrationState, Migrations};
    pub use crate::error::{MigrateError, Result};
    pub use crate::snapshot::{FieldSnapshot, IndexSnapshot, Snapshot, TableSnapshot};
    pub use crate::store::SnapshotStore;
}
