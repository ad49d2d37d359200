//! The registry of declared tables and relationships.
//!
//! A `Registry` is built once, then shared (usually behind an `Arc`) by the
//! executor and the migration engine.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::relationship::{Direction, OnDelete, Relationship, RelationshipKind};
use crate::schema::{Constraint, Field, Table, TableBuilder};

fn key_field(table: &Table) -> Result<Field> {
    table.field(table.primary_key()).cloned().ok_or_else(|| {
        CoreError::InvalidReference(format!("'{}' has no primary key", table.name()))
    })
}

/// Owns the prepared tables and the relationships between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    tables: BTreeMap<String, Table>,
    relationships: Vec<Relationship>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prepared table.
    pub fn register(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(table.name()) {
            return Err(CoreError::Structure(format!(
                "table '{}' is already registered",
                table.name()
            )));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    /// Prepares and registers a table declaration.
    pub fn declare(&mut self, builder: TableBuilder) -> Result<()> {
        self.register(builder.prepare()?)
    }

    /// Registers a relationship.
    ///
    /// Foreign keys add the `{left}_id` column to the right table; a
    /// many-to-many relationship registers its junction table.
    pub fn relate(&mut self, relationship: Relationship) -> Result<()> {
        relationship.validate()?;
        let left_key = key_field(self.table(relationship.left())?)?;
        let right_key = key_field(self.table(relationship.right())?)?;
        let relationship = relationship.keys(left_key.name(), right_key.name());

        for (table, accessor) in [
            relationship.forward_accessor(),
            relationship.backward_accessor(),
        ] {
            if self.traverse(table, &accessor).is_some() || self.table(table)?.has_column(&accessor) {
                return Err(CoreError::Structure(format!(
                    "accessor '{accessor}' already exists on '{table}'"
                )));
            }
        }

        match relationship.kind() {
            RelationshipKind::ForeignKey | RelationshipKind::OneToOne => {
                let mut field = Field::new(
                    &relationship.column_name(),
                    left_key.field_type().reference_type(),
                )
                .null(true)
                .references_column(
                    relationship.left(),
                    relationship.left_key(),
                    relationship.on_delete_action(),
                );
                if relationship.kind() == RelationshipKind::OneToOne {
                    field = field.unique();
                }
                let right = relationship.right().to_string();
                self.tables
                    .get_mut(&right)
                    .ok_or_else(|| CoreError::UnknownTable(right.clone()))?
                    .push_field(field)?;
            }
            RelationshipKind::ManyToMany => {
                let junction = relationship.junction_table();
                let (left_column, right_column) = relationship.junction_columns();
                let table = TableBuilder::new(&junction)
                    .field(
                        Field::new(&left_column, left_key.field_type().reference_type())
                            .references_column(relationship.left(), relationship.left_key(), OnDelete::Cascade),
                    )
                    .field(
                        Field::new(&right_column, right_key.field_type().reference_type())
                            .references_column(relationship.right(), relationship.right_key(), OnDelete::Cascade),
                    )
                    .constraint(Constraint::unique(
                        &format!("{junction}_unique"),
                        &[left_column.as_str(), right_column.as_str()],
                    ))
                    .prepare()?;
                self.register(table)?;
            }
        }
        self.relationships.push(relationship);
        Ok(())
    }

    /// Returns a table by name.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| CoreError::UnknownTable(name.to_string()))
    }

    /// Returns all tables sorted by name.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Returns the declared relationships.
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Finds the relationship walked by `accessor` from `table`.
    #[must_use]
    pub fn traverse(&self, table: &str, accessor: &str) -> Option<(&Relationship, Direction)> {
        self.relationships.iter().find_map(|relationship| {
            relationship
                .direction(table, accessor)
                .map(|direction| (relationship, direction))
        })
    }

    /// Returns the accessor names available on `table`.
    #[must_use]
    pub fn accessors(&self, table: &str) -> Vec<String> {
        self.relationships
            .iter()
            .flat_map(|r| [r.forward_accessor(), r.backward_accessor()])
            .filter(|(owner, _)| *owner == table)
            .map(|(_, name)| name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .declare(TableBuilder::new("author").field(Field::text("name")))
            .unwrap();
        registry
            .declare(TableBuilder::new("book").field(Field::text("title")))
            .unwrap();
        registry
    }

    #[test]
    fn test_foreign_key_adds_column() {
        let mut registry = registry();
        registry
            .relate(Relationship::foreign_key("author", "book"))
            .unwrap();
        let book = registry.table("book").unwrap();
        assert_eq!(book.column_names(), vec!["id", "title", "author_id"]);
        assert!(registry.traverse("book", "author").is_some());
        assert!(registry.traverse("author", "book_set").is_some());
        assert_eq!(registry.accessors("author"), vec![String::from("book_set")]);
    }

    #[test]
    fn test_many_to_many_registers_junction() {
        let mut registry = registry();
        registry
            .relate(Relationship::many_to_many("book", "author").related_name("books"))
            .unwrap();
        let junction = registry.table("book_author").unwrap();
        assert_eq!(
            junction.column_names(),
            vec!["id", "book_id", "author_id"]
        );
    }

    #[test]
    fn test_relationships_follow_declared_keys() {
        let mut registry = registry();
        registry
            .declare(
                TableBuilder::new("country")
                    .field(Field::char("code", 2).primary_key())
                    .field(Field::text("name")),
            )
            .unwrap();
        registry
            .relate(Relationship::foreign_key("country", "author"))
            .unwrap();

        let column = registry.table("author").unwrap().field("country_id").unwrap();
        assert_eq!(column.field_type(), FieldType::Char { max_length: Some(2) });
        let reference = column.foreign_reference().unwrap();
        assert_eq!((reference.table.as_str(), reference.column.as_str()), ("country", "code"));

        let (relationship, _) = registry.traverse("author", "country").unwrap();
        assert_eq!(relationship.left_key(), "code");
        assert_eq!(relationship.right_key(), "id");
    }

    #[test]
    fn test_relate_errors() {
        let mut registry = registry();
        assert_eq!(
            registry.relate(Relationship::foreign_key("publisher", "book")),
            Err(CoreError::UnknownTable(String::from("publisher")))
        );
        assert!(matches!(
            registry.relate(Relationship::foreign_key("book", "book")),
            Err(CoreError::RelationshipNameRequired(_))
        ));
        registry
            .relate(Relationship::foreign_key("author", "book"))
            .unwrap();
        assert!(matches!(
            registry.relate(Relationship::foreign_key("author", "book")),
            Err(CoreError::Structure(_))
        ));
    }
}
