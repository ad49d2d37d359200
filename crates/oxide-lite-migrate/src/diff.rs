//! Snapshot diffing.
//!
//! Compares the last persisted snapshot with the current one and produces
//! the ordered operations that bring storage from one to the other:
//!
//! 1. `CREATE TABLE`, referenced tables first
//! 2. `CREATE INDEX` on new tables and for new indexes of existing tables
//! 3. `ALTER TABLE ... ADD COLUMN`, then indexes over the added columns
//! 4. `DROP INDEX`
//! 5. `DROP TABLE`, referencing tables first
//!
//! SQLite cannot drop or redefine a column through `ALTER TABLE`, so those
//! changes fail with [`MigrateError::UnsupportedMigration`].

use std::collections::BTreeSet;
use std::fmt;

use oxide_lite_core::backend::Backend;
use oxide_lite_core::nodes::{AddColumnNode, CreateIndexNode, DropIndexNode, DropTableNode, Node};
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};
use crate::snapshot::{FieldSnapshot, IndexSnapshot, Snapshot, TableSnapshot};

/// One schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a table.
    CreateTable(TableSnapshot),
    /// Create an index.
    CreateIndex {
        /// Table the index belongs to.
        table: String,
        /// Full index name.
        name: String,
        /// Index definition.
        index: IndexSnapshot,
    },
    /// Add a column to an existing table.
    AddColumn {
        /// Table to alter.
        table: String,
        /// The new column.
        field: FieldSnapshot,
    },
    /// Drop an index.
    DropIndex {
        /// Table the index belonged to.
        table: String,
        /// Full index name.
        name: String,
    },
    /// Drop a table.
    DropTable(String),
}

impl Operation {
    /// Returns the node that performs the operation.
    #[must_use]
    pub fn node(&self) -> Node {
        match self {
            Self::CreateTable(table) => Node::from(table.create_node()),
            Self::CreateIndex { table, name, index } => Node::from(CreateIndexNode::new(
                name,
                table,
                index.fields.clone(),
                index.condition.clone(),
            )),
            Self::AddColumn { table, field } => {
                Node::from(AddColumnNode::new(table, field.definition()))
            }
            Self::DropIndex { name, .. } => Node::from(DropIndexNode::new(name)),
            Self::DropTable(table) => Node::from(DropTableNode::new(table)),
        }
    }

    /// Renders the operation.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        self.node().to_sql(backend)
    }

    /// Returns `true` for drops.
    #[must_use]
    pub const fn is_destructive(&self) -> bool {
        matches!(self, Self::DropIndex { .. } | Self::DropTable(_))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable(table) => write!(f, "Create table {}", table.name),
            Self::CreateIndex { table, name, .. } => write!(f, "Create index {name} on {table}"),
            Self::AddColumn { table, field } => write!(f, "Add column {} to {table}", field.name),
            Self::DropIndex { table, name } => write!(f, "Drop index {name} on {table}"),
            Self::DropTable(table) => write!(f, "Drop table {table}"),
        }
    }
}

/// The ordered operations of one migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    operations: Vec<Operation>,
}

impl MigrationPlan {
    /// Creates a plan from already ordered operations.
    #[must_use]
    pub const fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Returns the operations in execution order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns `true` when there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Renders every operation, one statement each.
    #[must_use]
    pub fn statements(&self, backend: &dyn Backend) -> Vec<String> {
        self.operations.iter().map(|op| op.to_sql(backend)).collect()
    }

    /// Renders the plan as a script of `;`-terminated lines.
    #[must_use]
    pub fn script(&self, backend: &dyn Backend) -> String {
        self.statements(backend)
            .into_iter()
            .map(|sql| format!("{sql};\n"))
            .collect()
    }
}

/// Orders tables so that each comes after the tables it references within
/// the same set. Cycles fall back to name order.
fn dependency_order<'a>(tables: &[&'a TableSnapshot]) -> Vec<&'a TableSnapshot> {
    let names: BTreeSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut ordered = Vec::with_capacity(tables.len());
    let mut pending: Vec<&TableSnapshot> = tables.to_vec();

    while !pending.is_empty() {
        let (ready, waiting): (Vec<_>, Vec<_>) = pending.into_iter().partition(|table| {
            table
                .dependencies()
                .iter()
                .all(|dep| !names.contains(dep.as_str()) || placed.contains(dep))
        });
        if ready.is_empty() {
            debug!(tables = waiting.len(), "circular table references");
            ordered.extend(waiting);
            break;
        }
        for table in ready {
            placed.insert(table.name.clone());
            ordered.push(table);
        }
        pending = waiting;
    }
    ordered
}

fn create_index(table: &TableSnapshot, name: &str, index: &IndexSnapshot) -> Operation {
    Operation::CreateIndex {
        table: table.name.clone(),
        name: name.to_string(),
        index: index.clone(),
    }
}

/// Computes the operations that turn `previous` into `current`.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Result<MigrationPlan> {
    let mut created = Vec::new();
    let mut common = Vec::new();
    for table in &current.tables {
        match previous.table(&table.name) {
            Some(before) => common.push((before, table)),
            None => created.push(table),
        }
    }
    let dropped: Vec<&TableSnapshot> = previous
        .tables
        .iter()
        .filter(|table| current.table(&table.name).is_none())
        .collect();

    let mut create_tables = Vec::new();
    let mut create_indexes = Vec::new();
    let mut add_columns = Vec::new();
    let mut late_indexes = Vec::new();
    let mut drop_indexes = Vec::new();

    for table in dependency_order(&created) {
        create_tables.push(Operation::CreateTable(table.clone()));
        for (name, index) in &table.indexes {
            create_indexes.push(create_index(table, name, index));
        }
    }

    for (before, after) in common {
        for field in &before.fields {
            match after.field(&field.name) {
                None => {
                    return Err(MigrateError::unsupported(
                        &after.name,
                        format!("column '{}' cannot be removed", field.name),
                    ))
                }
                Some(now) if now.params != field.params => {
                    return Err(MigrateError::unsupported(
                        &after.name,
                        format!(
                            "column '{}' changed from [{}] to [{}]",
                            field.name,
                            field.params.join(" "),
                            now.params.join(" ")
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
        if before.constraints != after.constraints {
            return Err(MigrateError::unsupported(
                &after.name,
                "table constraints cannot be changed",
            ));
        }

        let mut added = BTreeSet::new();
        for field in &after.fields {
            if before.field(&field.name).is_some() {
                continue;
            }
            if !field.definition().can_be_added() {
                return Err(MigrateError::unsupported(
                    &after.name,
                    format!(
                        "column '{}' is NOT NULL without a default, UNIQUE or a primary key",
                        field.name
                    ),
                ));
            }
            added.insert(field.name.as_str());
            add_columns.push(Operation::AddColumn {
                table: after.name.clone(),
                field: field.clone(),
            });
        }

        for (name, index) in &after.indexes {
            match before.indexes.get(name) {
                Some(old) if old == index => continue,
                Some(_) => {
                    // Redefined in place: drop before re-creating under the same name.
                    create_indexes.push(Operation::DropIndex {
                        table: after.name.clone(),
                        name: name.clone(),
                    });
                }
                None => {}
            }
            if index.fields.iter().any(|f| added.contains(f.as_str())) {
                late_indexes.push(create_index(after, name, index));
            } else {
                create_indexes.push(create_index(after, name, index));
            }
        }
        for name in before.indexes.keys() {
            if !after.indexes.contains_key(name) {
                warn!(table = %after.name, index = %name, "index will be dropped");
                drop_indexes.push(Operation::DropIndex {
                    table: after.name.clone(),
                    name: name.clone(),
                });
            }
        }
    }

    let mut drop_tables: Vec<Operation> = dependency_order(&dropped)
        .into_iter()
        .rev()
        .map(|table| {
            warn!(table = %table.name, "table will be dropped");
            Operation::DropTable(table.name.clone())
        })
        .collect();

    let mut operations = create_tables;
    operations.append(&mut create_indexes);
    operations.append(&mut add_columns);
    operations.append(&mut late_indexes);
    operations.append(&mut drop_indexes);
    operations.append(&mut drop_tables);
    Ok(MigrationPlan::new(operations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_lite_core::prelude::*;

    fn snapshot(registry: &Registry) -> Snapshot {
        Snapshot::from_registry(registry, &SqliteBackend::new())
    }

    fn celebrities() -> Registry {
        let mut registry = Registry::new();
        registry
            .declare(TableBuilder::new("celebrities").field(Field::text("name")))
            .unwrap();
        registry
    }

    #[test]
    fn test_create_from_empty() {
        let plan = diff(&Snapshot::empty(), &snapshot(&celebrities())).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan.statements(&SqliteBackend::new()),
            vec![String::from(
                "CREATE TABLE IF NOT EXISTS \"celebrities\" (\"id\" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, \
                 \"name\" TEXT NOT NULL)"
            )]
        );
    }

    #[test]
    fn test_identical_snapshots_give_empty_plan() {
        let current = snapshot(&celebrities());
        let plan = diff(&current.numbered(1), &current).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.script(&SqliteBackend::new()), "");
    }

    #[test]
    fn test_referenced_tables_are_created_first() {
        let mut registry = Registry::new();
        registry
            .declare(TableBuilder::new("album").field(Field::text("title")))
            .unwrap();
        registry
            .declare(TableBuilder::new("zoo_artist").field(Field::text("name")))
            .unwrap();
        registry
            .relate(Relationship::foreign_key("zoo_artist", "album"))
            .unwrap();

        let plan = diff(&Snapshot::empty(), &snapshot(&registry)).unwrap();
        let order: Vec<String> = plan.operations().iter().map(ToString::to_string).collect();
        assert_eq!(
            order,
            vec![
                String::from("Create table zoo_artist"),
                String::from("Create table album"),
            ]
        );

        let dropped = diff(&snapshot(&registry), &Snapshot::empty()).unwrap();
        let order: Vec<String> = dropped.operations().iter().map(ToString::to_string).collect();
        assert_eq!(
            order,
            vec![String::from("Drop table album"), String::from("Drop table zoo_artist")]
        );
    }

    #[test]
    fn test_added_column_and_index_order() {
        let before = snapshot(&celebrities());
        let mut registry = Registry::new();
        registry
            .declare(
                TableBuilder::new("celebrities")
                    .field(Field::text("name"))
                    .field(Field::integer("height").null(true))
                    .index(Index::new("by_name", &["name"]))
                    .index(Index::new("by_height", &["height"])),
            )
            .unwrap();
        registry
            .declare(TableBuilder::new("agency").field(Field::text("title")))
            .unwrap();

        let plan = diff(&before, &snapshot(&registry)).unwrap();
        let order: Vec<String> = plan.operations().iter().map(ToString::to_string).collect();
        assert_eq!(
            order,
            vec![
                String::from("Create table agency"),
                String::from("Create index idx_celebrities_by_name on celebrities"),
                String::from("Add column height to celebrities"),
                String::from("Create index idx_celebrities_by_height on celebrities"),
            ]
        );
        assert_eq!(
            plan.statements(&SqliteBackend::new())[2],
            "ALTER TABLE \"celebrities\" ADD COLUMN \"height\" INTEGER NULL"
        );
    }

    #[test]
    fn test_removed_column_is_unsupported() {
        let mut registry = Registry::new();
        registry
            .declare(TableBuilder::new("celebrities").field(Field::text("nickname")))
            .unwrap();
        let result = diff(&snapshot(&celebrities()), &snapshot(&registry));
        assert!(matches!(
            result,
            Err(MigrateError::UnsupportedMigration { table, .. }) if table == "celebrities"
        ));
    }

    #[test]
    fn test_changed_column_is_unsupported() {
        let mut registry = Registry::new();
        registry
            .declare(TableBuilder::new("celebrities").field(Field::text("name").null(true)))
            .unwrap();
        assert!(matches!(
            diff(&snapshot(&celebrities()), &snapshot(&registry)),
            Err(MigrateError::UnsupportedMigration { .. })
        ));
    }

    #[test]
    fn test_not_null_column_without_default_is_unsupported() {
        let mut registry = Registry::new();
        registry
            .declare(
                TableBuilder::new("celebrities")
                    .field(Field::text("name"))
                    .field(Field::integer("height")),
            )
            .unwrap();
        assert!(matches!(
            diff(&snapshot(&celebrities()), &snapshot(&registry)),
            Err(MigrateError::UnsupportedMigration { .. })
        ));

        let mut defaulted = Registry::new();
        defaulted
            .declare(
                TableBuilder::new("celebrities")
                    .field(Field::text("name"))
                    .field(Field::integer("height").default(170)),
            )
            .unwrap();
        assert_eq!(
            diff(&snapshot(&celebrities()), &snapshot(&defaulted))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_removed_index_is_dropped_last() {
        let mut registry = Registry::new();
        registry
            .declare(
                TableBuilder::new("celebrities")
                    .field(Field::text("name"))
                    .index(Index::new("by_name", &["name"])),
            )
            .unwrap();
        let plan = diff(&snapshot(&registry), &snapshot(&celebrities())).unwrap();
        assert_eq!(
            plan.statements(&SqliteBackend::new()),
            vec![String::from("DROP INDEX IF EXISTS \"idx_celebrities_by_name\"")]
        );
        assert!(plan.operations()[0].is_destructive());
    }
}
