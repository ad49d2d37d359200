//! Schema snapshots.
//!
//! A snapshot is the persisted description of the schema the engine believes
//! storage has. It is a pretty-printed JSON document:
//!
//! ```json
//! {
//!   "id": "9f2c41ab07",
//!   "date": "2026-10-18T09:12:44.518Z",
//!   "number": 1,
//!   "indexes": ["idx_celebrity_by_name"],
//!   "tables": [
//!     {
//!       "name": "celebrity",
//!       "fields": [
//!         { "name": "id", "params": ["INTEGER", "NOT NULL", "PRIMARY KEY", "AUTOINCREMENT"] },
//!         { "name": "name", "params": ["TEXT", "NOT NULL"] }
//!       ],
//!       "indexes": { "idx_celebrity_by_name": { "fields": ["name"] } }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use oxide_lite_core::backend::Backend;
use oxide_lite_core::nodes::{ColumnDefinition, CreateIndexNode, CreateTableNode};
use oxide_lite_core::prelude::Table;
use oxide_lite_core::Registry;
use rand::RngExt;
use serde::{Deserialize, Serialize};

/// A column and its ordered DDL tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Column name.
    pub name: String,
    /// DDL tokens in emission order.
    pub params: Vec<String>,
}

impl FieldSnapshot {
    /// Returns the column definition.
    #[must_use]
    pub fn definition(&self) -> ColumnDefinition {
        ColumnDefinition::new(&self.name, self.params.clone())
    }
}

/// The fields and optional predicate of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Indexed columns.
    pub fields: Vec<String>,
    /// Rendered partial-index predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// One table of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub fields: Vec<FieldSnapshot>,
    /// Indexes by full name.
    #[serde(default)]
    pub indexes: BTreeMap<String, IndexSnapshot>,
    /// Rendered table constraints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
}

impl TableSnapshot {
    /// Snapshots a declared table.
    #[must_use]
    pub fn from_table(table: &Table, backend: &dyn Backend) -> Self {
        let create = CreateTableNode::from_table(table, backend);
        let fields = create
            .columns()
            .iter()
            .map(|column| FieldSnapshot {
                name: column.name.clone(),
                params: column.params.clone(),
            })
            .collect();
        let indexes = table
            .indexes()
            .iter()
            .map(|index| {
                let node = CreateIndexNode::from_index(table.name(), index, backend);
                (
                    node.name().to_string(),
                    IndexSnapshot {
                        fields: index.fields().to_vec(),
                        condition: index.where_condition().map(|c| c.to_sql(backend)),
                    },
                )
            })
            .collect();
        let constraints = table
            .constraints()
            .iter()
            .map(|constraint| constraint.to_sql(backend))
            .collect();
        Self {
            name: table.name().to_string(),
            fields,
            indexes,
            constraints,
        }
    }

    /// Returns a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSnapshot> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns the `CREATE TABLE` node for this table.
    #[must_use]
    pub fn create_node(&self) -> CreateTableNode {
        CreateTableNode::new(
            &self.name,
            self.fields.iter().map(FieldSnapshot::definition).collect(),
            self.constraints.clone(),
        )
    }

    /// Returns the other tables this one references.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        self.create_node().dependencies()
    }
}

/// A versioned schema description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Random identifier, 10 hex characters.
    pub id: String,
    /// Creation time.
    pub date: DateTime<Utc>,
    /// Monotonic migration number; 0 means nothing was ever applied.
    pub number: u64,
    /// Full names of every index, sorted.
    #[serde(default)]
    pub indexes: Vec<String>,
    /// Tables sorted by name.
    pub tables: Vec<TableSnapshot>,
}

/// Generates a snapshot id: 5 random bytes as lowercase hex.
fn generate_id() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 5];
    rng.fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl Snapshot {
    /// The snapshot of an empty schema, numbered 0.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: generate_id(),
            date: Utc::now(),
            number: 0,
            indexes: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Snapshots every table of `registry`. The number is 0 until the
    /// snapshot is persisted.
    #[must_use]
    pub fn from_registry(registry: &Registry, backend: &dyn Backend) -> Self {
        let mut tables: Vec<TableSnapshot> = registry
            .tables()
            .map(|table| TableSnapshot::from_table(table, backend))
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        let mut indexes: Vec<String> = tables
            .iter()
            .flat_map(|table| table.indexes.keys().cloned())
            .collect();
        indexes.sort();
        Self {
            tables,
            indexes,
            ..Self::empty()
        }
    }

    /// Returns a copy carrying `number`, a fresh id and the current date.
    #[must_use]
    pub fn numbered(&self, number: u64) -> Self {
        Self {
            id: generate_id(),
            date: Utc::now(),
            number,
            ..self.clone()
        }
    }

    /// Returns a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Returns the table names in snapshot order.
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }

    /// Returns `true` when the snapshot describes no table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parses a snapshot document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Renders the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_lite_core::prelude::*;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .declare(
                TableBuilder::new("celebrity")
                    .field(Field::text("name"))
                    .index(Index::new("by_name", &["name"])),
            )
            .unwrap();
        registry
            .declare(TableBuilder::new("agency").field(Field::char("title", 80)))
            .unwrap();
        registry
    }

    #[test]
    fn test_snapshot_from_registry() {
        let snapshot = Snapshot::from_registry(&registry(), &SqliteBackend::new());
        assert_eq!(snapshot.number, 0);
        assert_eq!(snapshot.id.len(), 10);
        assert!(snapshot.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(snapshot.table_names(), vec!["agency", "celebrity"]);
        assert_eq!(snapshot.indexes, vec![String::from("idx_celebrity_by_name")]);

        let celebrity = snapshot.table("celebrity").unwrap();
        assert_eq!(
            celebrity.field("name").unwrap().params,
            vec![String::from("TEXT"), String::from("NOT NULL")]
        );
        assert_eq!(
            celebrity.indexes["idx_celebrity_by_name"].fields,
            vec![String::from("name")]
        );
    }

    #[test]
    fn test_snapshot_json_document() {
        let snapshot = Snapshot::from_registry(&registry(), &SqliteBackend::new()).numbered(3);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"number\": 3"));
        assert!(!json.contains("condition"));

        let parsed = Snapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_numbered_keeps_tables() {
        let snapshot = Snapshot::from_registry(&registry(), &SqliteBackend::new());
        let numbered = snapshot.numbered(1);
        assert_eq!(numbered.number, 1);
        assert_eq!(numbered.tables, snapshot.tables);
    }

    #[test]
    fn test_dependencies_from_references() {
        let mut registry = registry();
        registry
            .relate(Relationship::foreign_key("agency", "celebrity"))
            .unwrap();
        let snapshot = Snapshot::from_registry(&registry, &SqliteBackend::new());
        assert_eq!(
            snapshot.table("celebrity").unwrap().dependencies(),
            vec![String::from("agency")]
        );
    }
}
