//! Schema-changing nodes used by migrations.
//!
//! Column definitions are carried as pre-rendered parameter tokens
//! (`["TEXT", "NOT NULL", "UNIQUE"]`), which is also how snapshots store them.

use crate::backend::Backend;
use crate::schema::{Index, Table};

/// A column name and its DDL parameter tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Ordered tokens following the name.
    pub params: Vec<String>,
}

impl ColumnDefinition {
    /// Creates a definition.
    #[must_use]
    pub fn new(name: &str, params: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            params,
        }
    }

    /// Returns the table named in a `REFERENCES` token, if any.
    #[must_use]
    pub fn referenced_table(&self) -> Option<String> {
        self.params.iter().find_map(|token| {
            let rest = token.strip_prefix("REFERENCES ")?;
            let rest = rest.strip_prefix('"')?;
            let end = rest.find('"')?;
            Some(rest[..end].to_string())
        })
    }

    /// Returns whether the column may be added to a populated table.
    #[must_use]
    pub fn can_be_added(&self) -> bool {
        let not_null = self.params.iter().any(|t| t == "NOT NULL");
        let has_default = self.params.iter().any(|t| t.starts_with("DEFAULT "));
        let primary = self.params.iter().any(|t| t == "PRIMARY KEY" || t == "UNIQUE");
        !primary && (!not_null || has_default)
    }

    fn to_sql(&self, backend: &dyn Backend) -> String {
        let mut sql = backend.quote_identifier(&self.name);
        for token in &self.params {
            sql.push(' ');
            sql.push_str(token);
        }
        sql
    }
}

/// `CREATE TABLE IF NOT EXISTS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableNode {
    table: String,
    columns: Vec<ColumnDefinition>,
    constraints: Vec<String>,
}

impl CreateTableNode {
    /// Creates the node from column definitions and rendered constraints.
    #[must_use]
    pub fn new(table: &str, columns: Vec<ColumnDefinition>, constraints: Vec<String>) -> Self {
        Self {
            table: table.to_string(),
            columns,
            constraints,
        }
    }

    /// Creates the node for a declared table.
    #[must_use]
    pub fn from_table(table: &Table, backend: &dyn Backend) -> Self {
        let columns = table
            .fields()
            .iter()
            .map(|field| ColumnDefinition::new(field.name(), field.params(backend)))
            .collect();
        let constraints = table
            .constraints()
            .iter()
            .map(|constraint| constraint.to_sql(backend))
            .collect();
        Self::new(table.name(), columns, constraints)
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the column definitions.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Returns the tables this one references, other than itself.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let mut dependencies: Vec<String> = self
            .columns
            .iter()
            .filter_map(ColumnDefinition::referenced_table)
            .filter(|table| *table != self.table)
            .collect();
        dependencies.dedup();
        dependencies
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.to_sql(backend))
            .chain(self.constraints.iter().cloned())
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            backend.quote_identifier(&self.table),
            parts.join(", ")
        )
    }
}

/// `ALTER TABLE ... ADD COLUMN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddColumnNode {
    table: String,
    column: ColumnDefinition,
}

impl AddColumnNode {
    /// Creates the node.
    #[must_use]
    pub fn new(table: &str, column: ColumnDefinition) -> Self {
        Self {
            table: table.to_string(),
            column,
        }
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            backend.quote_identifier(&self.table),
            self.column.to_sql(backend)
        )
    }
}

/// `DROP TABLE IF EXISTS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTableNode {
    table: String,
}

impl DropTableNode {
    /// Creates the node.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        format!(
            "DROP TABLE IF EXISTS {}",
            backend.quote_identifier(&self.table)
        )
    }
}

/// `CREATE INDEX IF NOT EXISTS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexNode {
    name: String,
    table: String,
    fields: Vec<String>,
    condition: Option<String>,
}

impl CreateIndexNode {
    /// Creates the node; `condition` is an already-rendered partial-index predicate.
    #[must_use]
    pub fn new(name: &str, table: &str, fields: Vec<String>, condition: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            fields,
            condition,
        }
    }

    /// Creates the node for an index declared on `table`.
    #[must_use]
    pub fn from_index(table: &str, index: &Index, backend: &dyn Backend) -> Self {
        Self::new(
            &index.full_name(table),
            table,
            index.fields().to_vec(),
            index.where_condition().map(|c| c.to_sql(backend)),
        )
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| backend.quote_identifier(f))
            .collect();
        let mut sql = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            backend.quote_identifier(&self.name),
            backend.quote_identifier(&self.table),
            fields.join(", ")
        );
        if let Some(condition) = &self.condition {
            sql.push_str(" WHERE ");
            sql.push_str(condition);
        }
        sql
    }
}

/// `DROP INDEX IF EXISTS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndexNode {
    name: String,
}

impl DropIndexNode {
    /// Creates the node.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        format!("DROP INDEX IF EXISTS {}", backend.quote_identifier(&self.name))
    }
}
