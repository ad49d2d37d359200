//! # oxide-lite-core
//!
//! Expression model, lookup resolver and SQL node compiler for embedded
//! SQLite schemas.
//!
//! This crate provides:
//! - Column references, typed literals, `Case`/`When` and arithmetic
//! - Scalar text functions and window functions for annotations
//! - `field__lookup` filter resolution into condition trees, with joins for
//!   relationship traversal
//! - Declared tables and relationships held in an explicit [`Registry`]
//! - Composable nodes that render SELECT, INSERT, UPDATE, DELETE and DDL text
//!
//! Nothing here touches storage. Every error is raised while a statement is
//! being built.
//!
//! ## Filters
//!
//! ```rust
//! use oxide_lite_core::prelude::*;
//!
//! let backend = SqliteBackend::new();
//! let q = Q::new().add("age__gt", 20).add("age__lt", 30);
//! let resolved = Resolver::detached().resolve(&!q).unwrap();
//! let sql = resolved.condition.unwrap().to_sql(&backend);
//! assert_eq!(sql, "NOT (age > 20 AND age < 30)");
//! ```
//!
//! ## Relationships
//!
//! ```rust
//! use oxide_lite_core::prelude::*;
//!
//! let mut registry = Registry::new();
//! registry
//!     .declare(TableBuilder::new("author").field(Field::char("name", 100)))
//!     .unwrap();
//! registry
//!     .declare(TableBuilder::new("book").field(Field::char("title", 200)))
//!     .unwrap();
//! registry.relate(Relationship::foreign_key("author", "book")).unwrap();
//!
//! let resolved = Resolver::new(&registry, "book")
//!     .unwrap()
//!     .resolve(&Q::lookup("author__name", "Victor Hugo"))
//!     .unwrap();
//! assert_eq!(resolved.joins.len(), 1);
//! ```

pub mod aggregate;
pub mod backend;
pub mod condition;
mod error;
pub mod expression;
pub mod lookup;
pub mod nodes;
pub mod registry;
pub mod relationship;
pub mod resolver;
pub mod schema;
pub mod value;
pub mod window;

pub use error::{CoreError, Result};
pub use registry::Registry;
pub use value::{OutputType, SqlValue, ToSqlValue};

/// Commonly used types.
pub mod prelude {
    pub use crate::aggregate::{Aggregate, AggregateFunc};
    pub use crate::backend::{Backend, DatePart, SqliteBackend};
    pub use crate::condition::{Combined, Q};
    pub use crate::error::{CoreError, Result};
    pub use crate::expression::{
        abs, col, concat, extract, length, lower, ltrim, rtrim, substr, trim, upper, Case, Column,
        Expr, Value, When,
    };
    pub use crate::lookup::{Condition, Lookup, Operand};
    pub use crate::nodes::{ComplexNode, Node, SelectMap};
    pub use crate::registry::Registry;
    pub use crate::relationship::{Direction, OnDelete, Relationship, RelationshipKind};
    pub use crate::resolver::{Resolved, Resolver};
    pub use crate::schema::{Constraint, Field, FieldType, Index, Table, TableBuilder};
    pub use crate::value::{OutputType, SqlValue, ToSqlValue};
    pub use crate::window::{
        cume_dist, dense_rank, first_value, lag, last_value, lead, nth_value, ntile, percent_rank,
        rank, row_number, Window, WindowFunc,
    };
}
