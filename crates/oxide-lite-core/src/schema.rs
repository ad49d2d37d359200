//! Declared tables: field types, fields, indexes and constraints.
//!
//! Tables are declared with a [`TableBuilder`] and become usable once
//! [`TableBuilder::prepare`] has validated them into a [`Table`].
//!
//! ```
//! use oxide_lite_core::prelude::*;
//!
//! let table = TableBuilder::new("Celebrities")
//!     .field(Field::char("name", 100))
//!     .field(Field::integer("height").null(true))
//!     .prepare()
//!     .unwrap();
//!
//! assert_eq!(table.name(), "celebrities");
//! assert_eq!(table.column_names(), vec!["id", "name", "height"]);
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::backend::Backend;
use crate::condition::{Combined, Q};
use crate::error::{CoreError, Result};
use crate::expression::validate_identifier;
use crate::relationship::OnDelete;
use crate::resolver::Resolver;
use crate::value::{SqlValue, ToSqlValue};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Names that cannot be used for tables or fields.
const RESERVED_NAMES: &[&str] = &["objects"];

/// Lowercases and validates a table, field, index or constraint name.
fn normalize_name(name: &str) -> Result<String> {
    let name = name.to_lowercase();
    if RESERVED_NAMES.contains(&name.as_str()) {
        return Err(CoreError::InvalidReference(format!(
            "'{name}' is a reserved name"
        )));
    }
    validate_identifier(&name)?;
    Ok(name)
}

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Text with an optional maximum length.
    Char {
        /// Maximum number of characters.
        max_length: Option<u32>,
    },
    /// Unbounded text.
    Text,
    /// Integer.
    Integer,
    /// Floating point number.
    Float,
    /// Boolean stored as 0/1.
    Boolean,
    /// Date stored as `YYYY-MM-DD` text.
    Date,
    /// Datetime stored as `YYYY-MM-DD HH:MM:SS` text.
    DateTime,
    /// JSON document stored as text.
    Json,
    /// Auto-incrementing integer.
    Auto,
}

impl FieldType {
    /// Returns the SQLite type name.
    #[must_use]
    pub fn sql_type(self) -> String {
        match self {
            Self::Char {
                max_length: Some(length),
            } => format!("VARCHAR({length})"),
            Self::Char { max_length: None } | Self::Text | Self::Json => String::from("TEXT"),
            Self::Integer | Self::Boolean | Self::Auto => String::from("INTEGER"),
            Self::Float => String::from("REAL"),
            Self::Date => String::from("DATE"),
            Self::DateTime => String::from("DATETIME"),
        }
    }

    /// Returns the type of a column referencing a key of this type.
    #[must_use]
    pub const fn reference_type(self) -> Self {
        match self {
            Self::Auto => Self::Integer,
            other => other,
        }
    }

    fn mismatch(self, value: &SqlValue) -> CoreError {
        CoreError::TypeMismatch(format!("{value} is not a valid {}", self.sql_type()))
    }

    /// Converts a value to the form stored in the database.
    pub fn to_database(self, value: SqlValue) -> Result<SqlValue> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            Self::Char { max_length } => {
                let text = value.as_plain_text().ok_or_else(|| self.mismatch(&value))?;
                if let Some(max) = max_length {
                    if text.chars().count() > max as usize {
                        return Err(CoreError::TypeMismatch(format!(
                            "'{text}' exceeds the maximum length of {max}"
                        )));
                    }
                }
                Ok(SqlValue::Text(text))
            }
            Self::Text => value
                .as_plain_text()
                .map(SqlValue::Text)
                .ok_or_else(|| self.mismatch(&value)),
            Self::Integer | Self::Auto => match &value {
                SqlValue::Int(_) => Ok(value),
                SqlValue::Bool(b) => Ok(SqlValue::Int(i64::from(*b))),
                SqlValue::Text(text) => text
                    .trim()
                    .parse::<i64>()
                    .map(SqlValue::Int)
                    .map_err(|_| self.mismatch(&value)),
                _ => Err(self.mismatch(&value)),
            },
            Self::Float => {
                let number = match &value {
                    SqlValue::Text(text) => text
                        .trim()
                        .parse::<f64>()
                        .map(SqlValue::Float)
                        .map_err(|_| self.mismatch(&value)),
                    other => other
                        .as_f64()
                        .map(SqlValue::Float)
                        .ok_or_else(|| self.mismatch(&value)),
                }?;
                number.ensure_finite()?;
                Ok(number)
            }
            Self::Boolean => match &value {
                SqlValue::Bool(b) => Ok(SqlValue::Int(i64::from(*b))),
                SqlValue::Int(0 | 1) => Ok(value),
                _ => Err(self.mismatch(&value)),
            },
            Self::Date => {
                let text = value.as_str().ok_or_else(|| self.mismatch(&value))?;
                NaiveDate::parse_from_str(text, DATE_FORMAT)
                    .map(|date| SqlValue::Text(date.format(DATE_FORMAT).to_string()))
                    .map_err(|_| self.mismatch(&value))
            }
            Self::DateTime => {
                let text = value.as_str().ok_or_else(|| self.mismatch(&value))?;
                NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
                    .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.naive_utc()))
                    .map(|dt| SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()))
                    .map_err(|_| self.mismatch(&value))
            }
            Self::Json => {
                let document = match &value {
                    SqlValue::Text(text) => serde_json::from_str::<serde_json::Value>(text)
                        .map_err(|_| self.mismatch(&value))?,
                    SqlValue::Bool(b) => serde_json::Value::from(*b),
                    SqlValue::Int(n) => serde_json::Value::from(*n),
                    SqlValue::Float(f) => serde_json::Value::from(*f),
                    _ => return Err(self.mismatch(&value)),
                };
                Ok(SqlValue::Text(document.to_string()))
            }
        }
    }

    /// Converts a value read from the database back to its declared form.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_database(self, value: SqlValue) -> SqlValue {
        match (self, value) {
            (Self::Boolean, SqlValue::Int(n)) => SqlValue::Bool(n != 0),
            (Self::Float, SqlValue::Int(n)) => SqlValue::Float(n as f64),
            (_, value) => value,
        }
    }
}

/// The table referenced by a foreign-key field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignReference {
    /// Referenced table.
    pub table: String,
    /// Referenced column, the primary key of `table`.
    pub column: String,
    /// On-delete action.
    pub on_delete: OnDelete,
}

/// A declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    field_type: FieldType,
    null: bool,
    default: Option<SqlValue>,
    unique: bool,
    primary_key: bool,
    checks: Vec<Combined>,
    references: Option<ForeignReference>,
}

impl Field {
    /// Creates a NOT NULL field of the given type.
    #[must_use]
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            null: false,
            default: None,
            unique: false,
            primary_key: false,
            checks: Vec::new(),
            references: None,
        }
    }

    /// `VARCHAR(max_length)` field.
    #[must_use]
    pub fn char(name: &str, max_length: u32) -> Self {
        Self::new(
            name,
            FieldType::Char {
                max_length: Some(max_length),
            },
        )
    }

    /// `TEXT` field.
    #[must_use]
    pub fn text(name: &str) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// `INTEGER` field.
    #[must_use]
    pub fn integer(name: &str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// `REAL` field.
    #[must_use]
    pub fn float(name: &str) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// Boolean field.
    #[must_use]
    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// Date field.
    #[must_use]
    pub fn date(name: &str) -> Self {
        Self::new(name, FieldType::Date)
    }

    /// Datetime field.
    #[must_use]
    pub fn datetime(name: &str) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    /// JSON field.
    #[must_use]
    pub fn json(name: &str) -> Self {
        Self::new(name, FieldType::Json)
    }

    /// Auto-incrementing primary key.
    #[must_use]
    pub fn auto(name: &str) -> Self {
        Self::new(name, FieldType::Auto).primary_key()
    }

    /// Sets whether the column accepts NULL.
    #[must_use]
    pub const fn null(mut self, null: bool) -> Self {
        self.null = null;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl ToSqlValue) -> Self {
        self.default = Some(value.to_sql_value());
        self
    }

    /// Marks the column as UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column as PRIMARY KEY.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.null = false;
        self
    }

    /// Adds a CHECK clause, e.g. `Q::lookup("age__gte", 0)`.
    pub fn check(mut self, condition: Q) -> Result<Self> {
        let resolved = Resolver::detached().resolve(&condition)?;
        if let Some(condition) = resolved.condition {
            self.checks.push(condition);
        }
        Ok(self)
    }

    /// Declares the column as a foreign key to `table.id`.
    #[must_use]
    pub fn references(self, table: &str, on_delete: OnDelete) -> Self {
        self.references_column(table, "id", on_delete)
    }

    /// Declares the column as a foreign key to `table.column`.
    #[must_use]
    pub fn references_column(mut self, table: &str, column: &str, on_delete: OnDelete) -> Self {
        self.references = Some(ForeignReference {
            table: table.to_string(),
            column: column.to_string(),
            on_delete,
        });
        self
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns whether NULL is accepted.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.null
    }

    /// Returns whether this is the primary key.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Returns the default value.
    #[must_use]
    pub const fn default_value(&self) -> Option<&SqlValue> {
        self.default.as_ref()
    }

    /// Returns the foreign reference, if any.
    #[must_use]
    pub const fn foreign_reference(&self) -> Option<&ForeignReference> {
        self.references.as_ref()
    }

    /// Returns the ordered DDL tokens following the column name.
    #[must_use]
    pub fn params(&self, backend: &dyn Backend) -> Vec<String> {
        let mut tokens = vec![self.field_type.sql_type()];
        tokens.push(String::from(if self.null { "NULL" } else { "NOT NULL" }));
        if let Some(default) = &self.default {
            tokens.push(format!("DEFAULT {}", backend.quote_value(default)));
        }
        if self.unique {
            tokens.push(String::from("UNIQUE"));
        }
        if self.primary_key {
            tokens.push(String::from("PRIMARY KEY"));
            if self.field_type == FieldType::Auto {
                tokens.push(backend.autoincrement_keyword().to_string());
            }
        }
        for check in &self.checks {
            tokens.push(format!("CHECK ({})", check.to_sql(backend)));
        }
        if let Some(reference) = &self.references {
            tokens.push(format!(
                "REFERENCES {} ({}) ON DELETE {}",
                backend.quote_identifier(&reference.table),
                backend.quote_identifier(&reference.column),
                reference.on_delete.to_sql()
            ));
        }
        tokens
    }

    fn prepare(mut self) -> Result<Self> {
        self.name = normalize_name(&self.name)?;
        if let Some(default) = self.default.take() {
            self.default = Some(self.field_type.to_database(default)?);
        }
        Ok(self)
    }
}

/// An index declared on a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    name: String,
    fields: Vec<String>,
    condition: Option<Combined>,
}

impl Index {
    /// Creates an index over the given fields.
    #[must_use]
    pub fn new(name: &str, fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            fields: fields.iter().map(ToString::to_string).collect(),
            condition: None,
        }
    }

    /// Makes the index partial.
    pub fn condition(mut self, condition: Q) -> Result<Self> {
        self.condition = Resolver::detached().resolve(&condition)?.condition;
        Ok(self)
    }

    /// Returns the declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the indexed fields.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the partial-index condition.
    #[must_use]
    pub const fn where_condition(&self) -> Option<&Combined> {
        self.condition.as_ref()
    }

    /// Returns the index name in the database, `idx_<table>_<name>`.
    #[must_use]
    pub fn full_name(&self, table: &str) -> String {
        format!("idx_{table}_{}", self.name)
    }
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `CONSTRAINT name CHECK (condition)`
    Check {
        /// Constraint name.
        name: String,
        /// Checked condition.
        condition: Combined,
    },
    /// `CONSTRAINT name UNIQUE (fields)`
    Unique {
        /// Constraint name.
        name: String,
        /// Unique fields.
        fields: Vec<String>,
    },
}

impl Constraint {
    /// Creates a CHECK constraint.
    pub fn check(name: &str, condition: Q) -> Result<Self> {
        let condition = Resolver::detached()
            .resolve(&condition)?
            .condition
            .ok_or_else(|| {
                CoreError::Structure(format!("check constraint '{name}' has no condition"))
            })?;
        Ok(Self::Check {
            name: name.to_string(),
            condition,
        })
    }

    /// Creates a UNIQUE constraint.
    #[must_use]
    pub fn unique(name: &str, fields: &[&str]) -> Self {
        Self::Unique {
            name: name.to_string(),
            fields: fields.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns the constraint name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Check { name, .. } | Self::Unique { name, .. } => name,
        }
    }

    fn columns(&self) -> Vec<String> {
        match self {
            Self::Check { condition, .. } => condition
                .conditions()
                .into_iter()
                .map(|c| c.column().name().to_string())
                .collect(),
            Self::Unique { fields, .. } => fields.clone(),
        }
    }

    /// Renders the constraint clause.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::Check { name, condition } => format!(
                "CONSTRAINT {} CHECK ({})",
                backend.quote_identifier(name),
                condition.to_sql(backend)
            ),
            Self::Unique { name, fields } => {
                let fields: Vec<String> =
                    fields.iter().map(|f| backend.quote_identifier(f)).collect();
                format!(
                    "CONSTRAINT {} UNIQUE ({})",
                    backend.quote_identifier(name),
                    fields.join(", ")
                )
            }
        }
    }
}

/// A declared table before validation.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    name: String,
    fields: Vec<Field>,
    indexes: Vec<Index>,
    constraints: Vec<Constraint>,
    ordering: Vec<String>,
    str_field: Option<String>,
}

impl TableBuilder {
    /// Starts declaring a table.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a table constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Sets the default ordering, e.g. `&["-created", "name"]`.
    #[must_use]
    pub fn ordering(mut self, fields: &[&str]) -> Self {
        self.ordering = fields.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the field used to display rows.
    #[must_use]
    pub fn str_field(mut self, field: &str) -> Self {
        self.str_field = Some(field.to_string());
        self
    }

    /// Validates the declaration.
    pub fn prepare(self) -> Result<Table> {
        let name = normalize_name(&self.name)?;
        let mut table = Table {
            name,
            fields: Vec::with_capacity(self.fields.len() + 1),
            indexes: Vec::new(),
            constraints: Vec::new(),
            ordering: Vec::new(),
            str_field: String::from("id"),
        };

        match self.fields.iter().filter(|f| f.primary_key).count() {
            0 => table.push_field(Field::auto("id"))?,
            1 => {}
            _ => {
                return Err(CoreError::Structure(format!(
                    "'{}' declares more than one primary key",
                    table.name
                )))
            }
        }
        for field in self.fields {
            table.push_field(field.prepare()?)?;
        }
        table.str_field = table.primary_key().to_string();

        for mut index in self.indexes {
            index.name = normalize_name(&index.name)?;
            if index.fields.is_empty() {
                return Err(CoreError::Structure(format!(
                    "index '{}' has no fields",
                    index.name
                )));
            }
            table.require_columns(&index.fields)?;
            if table.indexes.iter().any(|i| i.name == index.name) {
                return Err(CoreError::Structure(format!(
                    "duplicate index '{}' on '{}'",
                    index.name, table.name
                )));
            }
            table.indexes.push(index);
        }

        for constraint in self.constraints {
            table.push_constraint(constraint)?;
        }

        for field in self.ordering {
            table.require_columns(&[field.trim_start_matches('-').to_string()])?;
            table.ordering.push(field);
        }
        if let Some(str_field) = self.str_field {
            table.require_columns(&[str_field.clone()])?;
            table.str_field = str_field;
        }
        Ok(table)
    }
}

/// A validated table declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    fields: Vec<Field>,
    indexes: Vec<Index>,
    constraints: Vec<Constraint>,
    ordering: Vec<String>,
    str_field: String,
}

impl Table {
    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns whether the table has a column with this name.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Returns the column names in declaration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Returns the primary-key column name.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        self.fields
            .iter()
            .find(|f| f.primary_key)
            .map_or("id", |f| f.name.as_str())
    }

    /// Returns the declared indexes.
    #[must_use]
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Returns the declared constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns the default ordering.
    #[must_use]
    pub fn ordering(&self) -> &[String] {
        &self.ordering
    }

    /// Returns the display field.
    #[must_use]
    pub fn str_field(&self) -> &str {
        &self.str_field
    }

    /// Checks column names and converts each value to its database form.
    pub fn prepare_values(&self, values: Vec<(String, SqlValue)>) -> Result<Vec<(String, SqlValue)>> {
        values
            .into_iter()
            .map(|(name, value)| {
                let field = self.field(&name).ok_or_else(|| {
                    CoreError::InvalidReference(format!(
                        "'{name}' is not a column of '{}'",
                        self.name
                    ))
                })?;
                Ok((name, field.field_type.to_database(value)?))
            })
            .collect()
    }

    pub(crate) fn push_field(&mut self, field: Field) -> Result<()> {
        if self.has_column(&field.name) {
            return Err(CoreError::Structure(format!(
                "duplicate field '{}' on '{}'",
                field.name, self.name
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    pub(crate) fn push_constraint(&mut self, constraint: Constraint) -> Result<()> {
        self.require_columns(&constraint.columns())?;
        if self.constraints.iter().any(|c| c.name() == constraint.name()) {
            return Err(CoreError::Structure(format!(
                "duplicate constraint '{}' on '{}'",
                constraint.name(),
                self.name
            )));
        }
        self.constraints.push(constraint);
        Ok(())
    }

    fn require_columns(&self, columns: &[String]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(CoreError::InvalidReference(format!(
                "'{missing}' is not a column of '{}'",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;

    #[test]
    fn test_prepare_adds_primary_key() {
        let table = TableBuilder::new("Persons")
            .field(Field::char("Name", 100))
            .prepare()
            .unwrap();
        assert_eq!(table.name(), "persons");
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.primary_key(), "id");
    }

    #[test]
    fn test_prepare_rejects_bad_names() {
        assert!(matches!(
            TableBuilder::new("objects").prepare(),
            Err(CoreError::InvalidReference(_))
        ));
        assert!(matches!(
            TableBuilder::new("my table").prepare(),
            Err(CoreError::InvalidReference(_))
        ));
        assert!(matches!(
            TableBuilder::new("t")
                .field(Field::text("a"))
                .field(Field::text("A"))
                .prepare(),
            Err(CoreError::Structure(_))
        ));
        assert!(matches!(
            TableBuilder::new("t")
                .index(Index::new("missing", &["nope"]))
                .prepare(),
            Err(CoreError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_field_params() {
        let backend = SqliteBackend::new();
        assert_eq!(
            Field::auto("id").params(&backend),
            vec!["INTEGER", "NOT NULL", "PRIMARY KEY", "AUTOINCREMENT"]
        );
        let price = Field::float("price")
            .default(0)
            .check(Q::lookup("price__gte", 0))
            .unwrap()
            .prepare()
            .unwrap();
        assert_eq!(
            price.params(&backend),
            vec!["REAL", "NOT NULL", "DEFAULT 0.0", "CHECK (price >= 0)"]
        );
        let author = Field::integer("author_id")
            .null(true)
            .references("author", OnDelete::SetNull);
        assert_eq!(
            author.params(&backend),
            vec![
                "INTEGER",
                "NULL",
                "REFERENCES \"author\" (\"id\") ON DELETE SET NULL"
            ]
        );
    }

    #[test]
    fn test_declared_primary_key() {
        let backend = SqliteBackend::new();
        let country = TableBuilder::new("country")
            .field(Field::integer("code").primary_key())
            .field(Field::text("name"))
            .prepare()
            .unwrap();
        assert_eq!(country.primary_key(), "code");
        assert_eq!(country.column_names(), vec!["code", "name"]);
        assert_eq!(country.str_field(), "code");

        let doubled = TableBuilder::new("country")
            .field(Field::integer("code").primary_key())
            .field(Field::text("iso").primary_key())
            .prepare();
        assert!(matches!(doubled, Err(CoreError::Structure(_))));

        let city = Field::integer("country_id").references_column("country", "code", OnDelete::Cascade);
        assert_eq!(
            city.params(&backend).last().map(String::as_str),
            Some("REFERENCES \"country\" (\"code\") ON DELETE CASCADE")
        );
        assert_eq!(FieldType::Auto.reference_type(), FieldType::Integer);
    }

    #[test]
    fn test_float_must_be_finite() {
        assert!(matches!(
            FieldType::Float.to_database(SqlValue::Text("inf".into())),
            Err(CoreError::TypeMismatch(_))
        ));
        assert!(FieldType::Float.to_database(SqlValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_to_database_conversions() {
        assert_eq!(
            FieldType::Boolean.to_database(SqlValue::Bool(true)),
            Ok(SqlValue::Int(1))
        );
        assert_eq!(
            FieldType::Integer.to_database(SqlValue::Text("42".into())),
            Ok(SqlValue::Int(42))
        );
        assert!(FieldType::Integer
            .to_database(SqlValue::Text("abc".into()))
            .is_err());
        assert_eq!(
            FieldType::DateTime.to_database(SqlValue::Text("2024-05-01T10:30:00Z".into())),
            Ok(SqlValue::Text("2024-05-01 10:30:00".into()))
        );
        assert!(FieldType::Date
            .to_database(SqlValue::Text("2024-13-01".into()))
            .is_err());
        assert_eq!(
            FieldType::Json.to_database(SqlValue::Text("{\"a\": 1}".into())),
            Ok(SqlValue::Text("{\"a\":1}".into()))
        );
        assert!(FieldType::Char {
            max_length: Some(3)
        }
        .to_database(SqlValue::Text("abcd".into()))
        .is_err());
        assert_eq!(
            FieldType::Boolean.from_database(SqlValue::Int(0)),
            SqlValue::Bool(false)
        );
    }

    #[test]
    fn test_constraints() {
        let backend = SqliteBackend::new();
        let table = TableBuilder::new("product")
            .field(Field::float("price"))
            .field(Field::text("sku"))
            .constraint(Constraint::check("positive_price", Q::lookup("price__gt", 0)).unwrap())
            .constraint(Constraint::unique("unique_sku", &["sku"]))
            .prepare()
            .unwrap();
        let rendered: Vec<String> = table
            .constraints()
            .iter()
            .map(|c| c.to_sql(&backend))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "CONSTRAINT \"positive_price\" CHECK (price > 0)",
                "CONSTRAINT \"unique_sku\" UNIQUE (\"sku\")",
            ]
        );
    }
}
