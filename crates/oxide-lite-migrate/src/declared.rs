//! Declared schemas read from JSON.
//!
//! The command-line tool has no compiled-in tables, so it reads them from a
//! schema file:
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "celebrities",
//!       "fields": [
//!         { "name": "name", "type": "char", "max_length": 100 },
//!         { "name": "height", "type": "integer", "null": true }
//!       ],
//!       "indexes": [{ "name": "by_name", "fields": ["name"] }],
//!       "ordering": ["-height"]
//!     }
//!   ],
//!   "relationships": [
//!     { "left": "agency", "right": "celebrities", "kind": "foreign_key" }
//!   ]
//! }
//! ```
//!
//! Conditions (checks and partial indexes) are lookup maps ANDed together,
//! e.g. `{"height__gt": 0}`.

use std::collections::BTreeMap;
use std::path::Path;

use oxide_lite_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// The type tag of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// `VARCHAR(max_length)` or `TEXT`.
    Char,
    /// `TEXT`.
    Text,
    /// `INTEGER`.
    Integer,
    /// `REAL`.
    Float,
    /// `INTEGER` holding 0/1.
    Boolean,
    /// `DATE`.
    Date,
    /// `DATETIME`.
    #[serde(rename = "datetime")]
    DateTime,
    /// JSON text.
    Json,
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name.
    pub name: String,
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Maximum length for `char`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Whether NULL is allowed.
    #[serde(default)]
    pub null: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Whether values are unique.
    #[serde(default)]
    pub unique: bool,
    /// Whether this column replaces the implicit `id` primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Check conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<BTreeMap<String, serde_json::Value>>,
}

/// A declared index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name, without the `idx_<table>_` prefix.
    pub name: String,
    /// Indexed columns.
    pub fields: Vec<String>,
    /// Partial-index condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<BTreeMap<String, serde_json::Value>>,
}

/// A declared table constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintSpec {
    /// `CONSTRAINT name CHECK (...)`.
    Check {
        /// Constraint name.
        name: String,
        /// Checked condition.
        condition: BTreeMap<String, serde_json::Value>,
    },
    /// `CONSTRAINT name UNIQUE (...)`.
    Unique {
        /// Constraint name.
        name: String,
        /// Columns that are unique together.
        fields: Vec<String>,
    },
}

/// A declared table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Fields; `id` is added when no primary key is declared.
    pub fields: Vec<FieldSpec>,
    /// Indexes.
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    /// Table constraints.
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    /// Default ordering.
    #[serde(default)]
    pub ordering: Vec<String>,
    /// Field used to display rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str_field: Option<String>,
}

/// The kind of a declared relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipSpecKind {
    /// Foreign key on the right table.
    ForeignKey,
    /// Unique foreign key on the right table.
    OneToOne,
    /// Junction table.
    ManyToMany,
}

/// Referential action of a declared relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDeleteSpec {
    /// `CASCADE`.
    #[default]
    Cascade,
    /// `SET NULL`.
    SetNull,
    /// `RESTRICT`.
    Restrict,
    /// `NO ACTION`.
    NoAction,
    /// `SET DEFAULT`.
    SetDefault,
}

/// A declared relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    /// Referenced table.
    pub left: String,
    /// Referencing table.
    pub right: String,
    /// Relationship kind.
    pub kind: RelationshipSpecKind,
    /// Backward accessor name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_name: Option<String>,
    /// Referential action.
    #[serde(default)]
    pub on_delete: OnDeleteSpec,
}

/// A whole declared schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    /// Tables.
    pub tables: Vec<TableSpec>,
    /// Relationships between them.
    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,
}

fn to_sql_value(value: &serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map_or_else(|| SqlValue::Float(n.as_f64().unwrap_or_default()), SqlValue::Int),
        serde_json::Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn condition(lookups: &BTreeMap<String, serde_json::Value>) -> Q {
    lookups
        .iter()
        .fold(Q::new(), |q, (key, value)| q.add(key, to_sql_value(value)))
}

impl FieldSpec {
    fn field(&self) -> Result<Field> {
        let mut field = match self.kind {
            FieldKind::Char => Field::new(
                &self.name,
                FieldType::Char {
                    max_length: self.max_length,
                },
            ),
            FieldKind::Text => Field::text(&self.name),
            FieldKind::Integer => Field::integer(&self.name),
            FieldKind::Float => Field::float(&self.name),
            FieldKind::Boolean => Field::boolean(&self.name),
            FieldKind::Date => Field::date(&self.name),
            FieldKind::DateTime => Field::datetime(&self.name),
            FieldKind::Json => Field::json(&self.name),
        }
        .null(self.null);
        if let Some(default) = &self.default {
            field = field.default(to_sql_value(default));
        }
        if self.primary_key {
            field = field.primary_key();
        }
        if self.unique {
            field = field.unique();
        }
        for check in &self.checks {
            field = field.check(condition(check))?;
        }
        Ok(field)
    }
}

impl TableSpec {
    fn builder(&self) -> Result<TableBuilder> {
        let mut builder = TableBuilder::new(&self.name);
        for field in &self.fields {
            builder = builder.field(field.field()?);
        }
        for index in &self.indexes {
            let fields: Vec<&str> = index.fields.iter().map(String::as_str).collect();
            let mut declared = Index::new(&index.name, &fields);
            if let Some(lookups) = &index.condition {
                declared = declared.condition(condition(lookups))?;
            }
            builder = builder.index(declared);
        }
        for constraint in &self.constraints {
            builder = builder.constraint(match constraint {
                ConstraintSpec::Check { name, condition: lookups } => {
                    Constraint::check(name, condition(lookups))?
                }
                ConstraintSpec::Unique { name, fields } => {
                    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
                    Constraint::unique(name, &fields)
                }
            });
        }
        if !self.ordering.is_empty() {
            let ordering: Vec<&str> = self.ordering.iter().map(String::as_str).collect();
            builder = builder.ordering(&ordering);
        }
        if let Some(str_field) = &self.str_field {
            builder = builder.str_field(str_field);
        }
        Ok(builder)
    }
}

impl RelationshipSpec {
    fn relationship(&self) -> Relationship {
        let kind = match self.kind {
            RelationshipSpecKind::ForeignKey => RelationshipKind::ForeignKey,
            RelationshipSpecKind::OneToOne => RelationshipKind::OneToOne,
            RelationshipSpecKind::ManyToMany => RelationshipKind::ManyToMany,
        };
        let on_delete = match self.on_delete {
            OnDeleteSpec::Cascade => OnDelete::Cascade,
            OnDeleteSpec::SetNull => OnDelete::SetNull,
            OnDeleteSpec::Restrict => OnDelete::Restrict,
            OnDeleteSpec::NoAction => OnDelete::NoAction,
            OnDeleteSpec::SetDefault => OnDelete::SetDefault,
        };
        let relationship = Relationship::new(&self.left, &self.right, kind).on_delete(on_delete);
        match &self.related_name {
            Some(name) => relationship.related_name(name),
            None => relationship,
        }
    }
}

impl SchemaSpec {
    /// Parses a schema document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Reads a schema file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json).map_err(|e| MigrateError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Prepares every table and relationship into a registry.
    pub fn registry(&self) -> Result<Registry> {
        let mut registry = Registry::new();
        for table in &self.tables {
            registry.declare(table.builder()?)?;
        }
        for relationship in &self.relationships {
            registry.relate(relationship.relationship())?;
        }
        Ok(registry)
    }
}
