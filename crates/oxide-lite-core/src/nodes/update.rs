//! UPDATE and DELETE nodes.

use crate::backend::Backend;
use crate::condition::Combined;
use crate::error::{CoreError, Result};
use crate::expression::{validate_identifier, Expr};

/// Restricts which rows a write touches.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteFilter {
    /// A condition on the table's own columns.
    Condition(Combined),
    /// `key IN (<select>)`, for filters that need joins.
    Ids {
        /// Primary-key column of the written table.
        key: String,
        /// SELECT returning the keys to write.
        select: String,
    },
}

impl WriteFilter {
    fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::Condition(condition) => format!("WHERE {}", condition.to_sql(backend)),
            Self::Ids { key, select } => format!("WHERE {key} IN ({select})"),
        }
    }
}

/// `UPDATE table SET a = 1, b = (b + 1) [WHERE ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNode {
    table: String,
    assignments: Vec<(String, Expr)>,
    filter: Option<WriteFilter>,
}

impl UpdateNode {
    /// Creates the node. At least one assignment is needed.
    pub fn new(table: &str, assignments: Vec<(String, Expr)>) -> Result<Self> {
        validate_identifier(table)?;
        if assignments.is_empty() {
            return Err(CoreError::Structure(format!(
                "an update of '{table}' needs at least one assignment"
            )));
        }
        for (column, _) in &assignments {
            validate_identifier(column)?;
        }
        Ok(Self {
            table: table.to_string(),
            assignments,
            filter: None,
        })
    }

    /// Restricts the update.
    #[must_use]
    pub fn filter(mut self, filter: Option<WriteFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Returns the table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let assignments: Vec<String> = self
            .assignments
            .iter()
            .map(|(column, expr)| format!("{column} = {}", expr.to_sql(backend)))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));
        if let Some(filter) = &self.filter {
            sql.push(' ');
            sql.push_str(&filter.to_sql(backend));
        }
        sql
    }
}

/// `DELETE FROM table [WHERE ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteNode {
    table: String,
    filter: Option<WriteFilter>,
}

impl DeleteNode {
    /// Creates the node.
    pub fn new(table: &str) -> Result<Self> {
        validate_identifier(table)?;
        Ok(Self {
            table: table.to_string(),
            filter: None,
        })
    }

    /// Restricts the delete.
    #[must_use]
    pub fn filter(mut self, filter: Option<WriteFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Returns the table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        match &self.filter {
            Some(filter) => format!("DELETE FROM {} {}", self.table, filter.to_sql(backend)),
            None => format!("DELETE FROM {}", self.table),
        }
    }
}
