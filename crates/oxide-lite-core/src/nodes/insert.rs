//! INSERT node.

use crate::backend::Backend;
use crate::error::{CoreError, Result};
use crate::expression::validate_identifier;
use crate::value::SqlValue;

/// `INSERT INTO table (columns) VALUES (...), (...)`
///
/// Every row must provide the same set of columns. Rows may list them in
/// any order; values are aligned on the first row's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertNode {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    returning: Vec<String>,
}

impl InsertNode {
    /// Builds a multi-row insert, validating the rows before any SQL exists.
    pub fn new(table: &str, rows: Vec<Vec<(String, SqlValue)>>) -> Result<Self> {
        validate_identifier(table)?;
        let mut rows = rows.into_iter();
        let first = rows
            .next()
            .ok_or_else(|| CoreError::Structure(format!("no rows to insert into '{table}'")))?;

        let mut columns = Vec::with_capacity(first.len());
        let mut first_values = Vec::with_capacity(first.len());
        for (column, value) in first {
            validate_identifier(&column)?;
            if columns.contains(&column) {
                return Err(CoreError::Structure(format!(
                    "column '{column}' given twice for '{table}'"
                )));
            }
            columns.push(column);
            first_values.push(value);
        }

        let mut aligned = vec![first_values];
        for (position, row) in rows.enumerate() {
            let mismatch = || {
                CoreError::Structure(format!(
                    "row {} into '{table}' does not match the columns ({})",
                    position + 2,
                    columns.join(", ")
                ))
            };
            if row.len() != columns.len() {
                return Err(mismatch());
            }
            let mut values: Vec<Option<SqlValue>> = vec![None; columns.len()];
            for (column, value) in row {
                let index = columns
                    .iter()
                    .position(|c| *c == column)
                    .ok_or_else(mismatch)?;
                if values[index].replace(value).is_some() {
                    return Err(mismatch());
                }
            }
            aligned.push(values.into_iter().map(Option::unwrap_or_default).collect());
        }
        if columns.is_empty() && aligned.len() > 1 {
            return Err(CoreError::Structure(format!(
                "several rows of defaults cannot be inserted into '{table}' at once"
            )));
        }

        Ok(Self {
            table: table.to_string(),
            columns,
            rows: aligned,
            returning: Vec::new(),
        })
    }

    /// Asks for the inserted rows back when the backend supports it.
    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = columns.iter().map(ToString::to_string).collect();
        self
    }

    /// Returns the table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether rendering with `backend` yields a RETURNING clause.
    #[must_use]
    pub fn has_returning(&self, backend: &dyn Backend) -> bool {
        !self.returning.is_empty() && backend.supports_returning()
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let mut sql = if self.columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table)
        } else {
            let rows: Vec<String> = self
                .rows
                .iter()
                .map(|row| {
                    let values: Vec<String> =
                        row.iter().map(|v| backend.quote_value(v)).collect();
                    format!("({})", values.join(", "))
                })
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES {}",
                self.table,
                self.columns.join(", "),
                rows.join(", ")
            )
        };
        if self.has_returning(backend) {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning.join(", "));
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;

    fn row(pairs: &[(&str, SqlValue)]) -> Vec<(String, SqlValue)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_multi_row_insert() {
        let node = InsertNode::new(
            "celebrity",
            vec![
                row(&[("name", SqlValue::Text("Kendall".into())), ("height", SqlValue::Int(178))]),
                row(&[("height", SqlValue::Int(170)), ("name", SqlValue::Text("Taylor".into()))]),
            ],
        )
        .unwrap()
        .returning(&["*"]);
        assert_eq!(
            node.to_sql(&SqliteBackend::new()),
            "INSERT INTO celebrity (name, height) VALUES ('Kendall', 178), ('Taylor', 170) RETURNING *"
        );
    }

    #[test]
    fn test_mismatched_rows_fail_before_sql() {
        let result = InsertNode::new(
            "celebrity",
            vec![
                row(&[("name", SqlValue::Text("Kendall".into()))]),
                row(&[("height", SqlValue::Int(170))]),
            ],
        );
        assert!(matches!(result, Err(CoreError::Structure(_))));
        assert!(matches!(
            InsertNode::new("celebrity", vec![]),
            Err(CoreError::Structure(_))
        ));
    }

    #[test]
    fn test_default_values() {
        let node = InsertNode::new("counter", vec![vec![]]).unwrap();
        assert_eq!(
            node.to_sql(&SqliteBackend::new()),
            "INSERT INTO counter DEFAULT VALUES"
        );
    }
}
