//! Result rows.
//!
//! A [`Row`] is an explicit name → value mapping in select order, tagged with
//! the table it was read from so it can be saved, deleted or followed across
//! relationships.

use std::fmt;

use oxide_lite_core::nodes::{DeleteNode, InsertNode, Node, UpdateNode, WriteFilter};
use oxide_lite_core::prelude::*;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

use crate::database::Database;
use crate::error::{OrmError, Result};
use crate::query::Query;
use crate::queryset::QuerySet;

/// Storage class of a fetched value.
enum Storage {
    Integer,
    Real,
    Blob,
    Text,
}

fn decode_value(row: &SqliteRow, index: usize) -> std::result::Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => Storage::Integer,
        "REAL" => Storage::Real,
        "BLOB" => Storage::Blob,
        _ => Storage::Text,
    };
    Ok(match storage {
        Storage::Integer => SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?),
        Storage::Real => SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        Storage::Blob => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        Storage::Text => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
    })
}

/// A fetched row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    table: String,
    columns: Vec<String>,
    values: Vec<SqlValue>,
    key: String,
    label: Option<String>,
}

impl Row {
    /// Creates a row from parallel column and value lists.
    pub fn new(table: &str, columns: Vec<String>, values: Vec<SqlValue>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(OrmError::Validation(format!(
                "{} columns but {} values for a row of '{table}'",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self {
            table: table.to_string(),
            columns,
            values,
            key: String::from("id"),
            label: None,
        })
    }

    /// Names the primary-key column, `id` unless set.
    #[must_use]
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    /// Decodes an engine row, converting values of declared fields to their
    /// field type.
    pub(crate) fn decode(
        table: &str,
        schema: Option<&Table>,
        row: &SqliteRow,
    ) -> std::result::Result<Self, sqlx::Error> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (index, column) in row.columns().iter().enumerate() {
            let name = column.name().to_string();
            let value = decode_value(row, index)?;
            let value = match schema.and_then(|t| t.field(&name)) {
                Some(field) => field.field_type().from_database(value),
                None => value,
            };
            columns.push(name);
            values.push(value);
        }
        Ok(Self {
            table: table.to_string(),
            columns,
            values,
            key: schema.map_or_else(|| String::from("id"), |t| t.primary_key().to_string()),
            label: schema.map(|t| t.str_field().to_string()),
        })
    }

    /// Returns the table the row was read from.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the column names in select order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in select order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Returns the value of `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|index| &self.values[index])
    }

    /// Returns the primary-key column name.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.key
    }

    /// Returns the primary key as an integer.
    #[must_use]
    pub fn pk(&self) -> Option<i64> {
        self.pk_value().and_then(SqlValue::as_i64)
    }

    /// Returns the primary-key value, `None` when missing or NULL.
    #[must_use]
    pub fn pk_value(&self) -> Option<&SqlValue> {
        self.get(&self.key).filter(|value| !value.is_null())
    }

    /// Replaces the value of an existing column.
    pub fn set(&mut self, column: &str, value: impl ToSqlValue) -> Result<()> {
        let index = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                CoreError::InvalidReference(format!(
                    "'{column}' is not a column of this '{}' row",
                    self.table
                ))
            })?;
        self.values[index] = value.to_sql_value();
        Ok(())
    }

    /// Returns the `(column, value)` pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, SqlValue)> {
        self.columns.into_iter().zip(self.values).collect()
    }

    fn require_pk(&self) -> Result<SqlValue> {
        self.pk_value().cloned().ok_or_else(|| {
            OrmError::Validation(format!("this '{}' row has no primary key", self.table))
        })
    }

    fn by_pk(&self, db: &Database) -> Result<Option<WriteFilter>> {
        let pk = self.require_pk()?;
        let table = db.registry().table(&self.table)?;
        Ok(Resolver::for_table(table)
            .resolve_lookup(table.primary_key(), pk)?
            .condition
            .map(WriteFilter::Condition))
    }

    /// Writes every declared column back with an UPDATE on the primary key.
    ///
    /// Annotated columns are not part of the table and are skipped.
    pub async fn save(&self, db: &Database) -> Result<u64> {
        let table = db.registry().table(&self.table)?;
        let values: Vec<(String, SqlValue)> = self
            .columns
            .iter()
            .zip(&self.values)
            .filter(|(column, _)| *column != table.primary_key() && table.has_column(column))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();
        let assignments = table
            .prepare_values(values)?
            .into_iter()
            .map(|(column, value)| (column, Expr::from(value)))
            .collect();
        let node = UpdateNode::new(&self.table, assignments)?.filter(self.by_pk(db)?);
        let mut query = Query::new(&self.table).node(Node::Update(node));
        query.run(db).await?;
        Ok(query.rows_affected())
    }

    /// Deletes the row by primary key.
    pub async fn delete(&self, db: &Database) -> Result<u64> {
        let node = DeleteNode::new(&self.table)?.filter(self.by_pk(db)?);
        let mut query = Query::new(&self.table).node(Node::Delete(node));
        query.run(db).await?;
        Ok(query.rows_affected())
    }

    /// Follows a relationship accessor of the row's table.
    ///
    /// A forward foreign key yields the referenced row, a backward one the
    /// referencing rows, and a many-to-many accessor the linked rows.
    pub fn related(&self, db: &Database, accessor: &str) -> Result<QuerySet> {
        let registry = db.registry();
        let (relationship, direction) = registry
            .traverse(&self.table, accessor)
            .ok_or_else(|| {
                CoreError::InvalidReference(format!(
                    "'{accessor}' is not a relationship of '{}'",
                    self.table
                ))
            })?;
        let target = relationship.target(direction);
        let queryset = QuerySet::new(db.clone(), target)?;

        match (relationship.kind(), direction) {
            (RelationshipKind::ManyToMany, direction) => {
                let opposite = match direction {
                    Direction::Forward => relationship.backward_accessor().1,
                    Direction::Backward => relationship.forward_accessor().1,
                };
                let key = registry.table(&self.table)?.primary_key();
                queryset.filter(Q::lookup(&format!("{opposite}__{key}"), self.require_pk()?))
            }
            (_, Direction::Forward) => {
                let reference = self
                    .get(&relationship.column_name())
                    .cloned()
                    .unwrap_or_default();
                let key = registry.table(target)?.primary_key();
                queryset.filter(Q::lookup(key, reference))
            }
            (_, Direction::Backward) => {
                queryset.filter(Q::lookup(&relationship.column_name(), self.require_pk()?))
            }
        }
    }

    /// Links the row to `other` through a many-to-many accessor.
    pub async fn link(&self, db: &Database, accessor: &str, other: &Self) -> Result<Row> {
        let registry = db.registry();
        let (relationship, direction) = registry
            .traverse(&self.table, accessor)
            .filter(|(relationship, _)| relationship.kind() == RelationshipKind::ManyToMany)
            .ok_or_else(|| {
                CoreError::InvalidReference(format!(
                    "'{accessor}' is not a many-to-many relationship of '{}'",
                    self.table
                ))
            })?;
        let (left_column, right_column) = relationship.junction_columns();
        let (near, far) = match direction {
            Direction::Forward => (left_column, right_column),
            Direction::Backward => (right_column, left_column),
        };
        let junction = relationship.junction_table();
        let node = InsertNode::new(
            &junction,
            vec![vec![
                (near, self.require_pk()?),
                (far, other.require_pk()?),
            ]],
        )?
        .returning(&["*"]);
        let mut query = Query::new(&junction).node(Node::Insert(node));
        query.run(db).await?;
        query
            .take_rows()
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::NotFound(junction.clone()))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self
            .label
            .as_deref()
            .and_then(|field| self.get(field))
            .and_then(SqlValue::as_plain_text)
            .unwrap_or_else(|| String::from("None"));
        write!(f, "<{}: {label}>", self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn celebrity() -> Row {
        Row::new(
            "celebrity",
            vec![String::from("id"), String::from("name")],
            vec![SqlValue::Int(1), SqlValue::Text(String::from("Kendall"))],
        )
        .unwrap()
    }

    #[test]
    fn test_row_access() {
        let mut row = celebrity();
        assert_eq!(row.pk(), Some(1));
        assert_eq!(row.get("name"), Some(&SqlValue::Text(String::from("Kendall"))));
        assert_eq!(row.get("height"), None);

        row.set("name", "Kylie").unwrap();
        assert_eq!(row.get("name"), Some(&SqlValue::Text(String::from("Kylie"))));
        assert!(row.set("height", 170).is_err());
    }

    #[test]
    fn test_declared_key() {
        let row = Row::new(
            "country",
            vec![String::from("code"), String::from("name")],
            vec![SqlValue::Int(33), SqlValue::Text(String::from("France"))],
        )
        .unwrap();
        assert_eq!(row.pk(), None);

        let row = row.with_key("code");
        assert_eq!(row.primary_key(), "code");
        assert_eq!(row.pk(), Some(33));
        assert_eq!(row.pk_value(), Some(&SqlValue::Int(33)));
    }

    #[test]
    fn test_column_order_is_kept() {
        let pairs = celebrity().into_pairs();
        assert_eq!(pairs[0].0, "id");
        assert_eq!(pairs[1].0, "name");
    }

    #[test]
    fn test_mismatched_lengths() {
        let result = Row::new("celebrity", vec![String::from("id")], vec![]);
        assert!(matches!(result, Err(OrmError::Validation(_))));
    }
}
