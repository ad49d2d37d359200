//! # oxide-lite-orm
//!
//! Runs statements compiled by `oxide-lite-core` against SQLite through
//! `sqlx`.
//!
//! This crate provides:
//! - `Query`, the executor: reads may re-run, writes run exactly once
//! - `QuerySet`, lazy and chainable, caching its rows on first use
//! - `Row`, an ordered name → value mapping that can be saved, deleted and
//!   followed across relationships
//! - `Manager`, the per-table entry point returned by `Database::objects`
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_lite_core::prelude::*;
//! use oxide_lite_orm::{Database, DatabaseConfig};
//!
//! let mut registry = Registry::new();
//! registry.declare(TableBuilder::new("celebrity").field(Field::char("name", 100)))?;
//!
//! let db = Database::connect(&DatabaseConfig::memory(), registry).await?;
//! let celebrities = db.objects("celebrity")?;
//! celebrities.create(&[("name", "Kendall".into())]).await?;
//!
//! let k = celebrities.filter(Q::lookup("name__startswith", "K"))?;
//! assert_eq!(k.count().await?, 1);
//! ```

mod database;
mod error;
mod manager;
pub mod query;
mod queryset;
mod row;

pub use database::{Database, DatabaseConfig};
pub use error::{OrmError, Result};
pub use manager::Manager;
pub use query::{Query, QueryState};
pub use queryset::QuerySet;
pub use row::Row;

// Re-export commonly used types from oxide-lite-core
pub use oxide_lite_core::prelude::{Aggregate, Expr, Q};
pub use oxide_lite_core::{Registry, SqlValue, ToSqlValue};
