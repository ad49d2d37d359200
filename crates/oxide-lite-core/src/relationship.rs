//! Relationships between declared tables.
//!
//! The left table is the referenced (parent) side, the right table holds the
//! foreign key. For `Relationship::foreign_key("author", "book")`:
//!
//! - `book` gets an `author_id` column referencing `author.id`;
//! - `book` reaches its author through the `author` accessor;
//! - `author` reaches its books through `book_set` (or the related name).
//!
//! A many-to-many relationship stores its pairs in the junction table
//! `left_right`.

use crate::error::{CoreError, Result};
use crate::expression::{validate_identifier, Column};
use crate::nodes::JoinNode;

/// The kind of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// Many rows of the right table point at one row of the left table.
    ForeignKey,
    /// A foreign key with a unique column.
    OneToOne,
    /// Pairs stored in a junction table.
    ManyToMany,
}

/// Behavior when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnDelete {
    /// Delete the referencing rows too.
    #[default]
    Cascade,
    /// Set the foreign key to NULL.
    SetNull,
    /// Refuse the deletion.
    Restrict,
    /// Leave the reference as is.
    NoAction,
    /// Set the foreign key to its default value.
    SetDefault,
}

impl OnDelete {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Which way an accessor walks a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the right table to the left table (`book.author`), or for
    /// many-to-many from left to right.
    Forward,
    /// From the left table to the right table (`author.book_set`), or for
    /// many-to-many from right to left.
    Backward,
}

/// A declared relationship between two tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    left: String,
    right: String,
    kind: RelationshipKind,
    on_delete: OnDelete,
    related_name: Option<String>,
    left_key: String,
    right_key: String,
}

impl Relationship {
    /// Creates a relationship of the given kind.
    #[must_use]
    pub fn new(left: &str, right: &str, kind: RelationshipKind) -> Self {
        Self {
            left: left.to_lowercase(),
            right: right.to_lowercase(),
            kind,
            on_delete: OnDelete::default(),
            related_name: None,
            left_key: String::from("id"),
            right_key: String::from("id"),
        }
    }

    /// Creates a foreign key from `right` to `left`.
    #[must_use]
    pub fn foreign_key(left: &str, right: &str) -> Self {
        Self::new(left, right, RelationshipKind::ForeignKey)
    }

    /// Creates a one-to-one relationship from `right` to `left`.
    #[must_use]
    pub fn one_to_one(left: &str, right: &str) -> Self {
        Self::new(left, right, RelationshipKind::OneToOne)
    }

    /// Creates a many-to-many relationship.
    #[must_use]
    pub fn many_to_many(left: &str, right: &str) -> Self {
        Self::new(left, right, RelationshipKind::ManyToMany)
    }

    /// Sets the on-delete action.
    #[must_use]
    pub const fn on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = action;
        self
    }

    /// Overrides the backward accessor name.
    #[must_use]
    pub fn related_name(mut self, name: &str) -> Self {
        self.related_name = Some(name.to_string());
        self
    }

    /// Sets the primary-key columns of the left and right tables. The
    /// registry fills these in from the declared tables.
    #[must_use]
    pub fn keys(mut self, left_key: &str, right_key: &str) -> Self {
        self.left_key = left_key.to_string();
        self.right_key = right_key.to_string();
        self
    }

    /// Returns the primary-key column of the left table.
    #[must_use]
    pub fn left_key(&self) -> &str {
        &self.left_key
    }

    /// Returns the primary-key column of the right table.
    #[must_use]
    pub fn right_key(&self) -> &str {
        &self.right_key
    }

    /// Checks the names. A relationship between a table and itself needs a
    /// related name, otherwise both accessors would collide.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.left)?;
        validate_identifier(&self.right)?;
        match &self.related_name {
            Some(name) => validate_identifier(name),
            None if self.is_self_referential() => {
                Err(CoreError::RelationshipNameRequired(self.left.clone()))
            }
            None => Ok(()),
        }
    }

    /// Returns the referenced table.
    #[must_use]
    pub fn left(&self) -> &str {
        &self.left
    }

    /// Returns the referencing table.
    #[must_use]
    pub fn right(&self) -> &str {
        &self.right
    }

    /// Returns the relationship kind.
    #[must_use]
    pub const fn kind(&self) -> RelationshipKind {
        self.kind
    }

    /// Returns the on-delete action.
    #[must_use]
    pub const fn on_delete_action(&self) -> OnDelete {
        self.on_delete
    }

    /// Returns whether both sides are the same table.
    #[must_use]
    pub fn is_self_referential(&self) -> bool {
        self.left == self.right
    }

    /// Returns the relationship name, `left_right`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}_{}", self.left, self.right)
    }

    /// Returns the foreign-key column stored on the right table.
    #[must_use]
    pub fn column_name(&self) -> String {
        format!("{}_id", self.left)
    }

    /// Returns the junction table of a many-to-many relationship.
    #[must_use]
    pub fn junction_table(&self) -> String {
        self.name()
    }

    /// Returns the junction columns pointing at the left and right tables.
    #[must_use]
    pub fn junction_columns(&self) -> (String, String) {
        if self.is_self_referential() {
            (
                format!("from_{}_id", self.left),
                format!("to_{}_id", self.right),
            )
        } else {
            (format!("{}_id", self.left), format!("{}_id", self.right))
        }
    }

    /// Returns the table an accessor is declared on and its name, for
    /// the forward direction.
    #[must_use]
    pub fn forward_accessor(&self) -> (&str, String) {
        match self.kind {
            RelationshipKind::ManyToMany => (&self.left, self.right.clone()),
            _ => (&self.right, self.left.clone()),
        }
    }

    /// Returns the table an accessor is declared on and its name, for
    /// the backward direction.
    #[must_use]
    pub fn backward_accessor(&self) -> (&str, String) {
        let (table, other) = match self.kind {
            RelationshipKind::ManyToMany => (&self.right, &self.left),
            _ => (&self.left, &self.right),
        };
        let name = self
            .related_name
            .clone()
            .unwrap_or_else(|| format!("{other}_set"));
        (table, name)
    }

    /// Returns the direction walked by `accessor` from `table`, if any.
    #[must_use]
    pub fn direction(&self, table: &str, accessor: &str) -> Option<Direction> {
        let (backward_table, backward_name) = self.backward_accessor();
        if backward_table == table && backward_name == accessor {
            return Some(Direction::Backward);
        }
        let (forward_table, forward_name) = self.forward_accessor();
        if forward_table == table && forward_name == accessor {
            return Some(Direction::Forward);
        }
        None
    }

    /// Returns the table reached by walking the relationship.
    #[must_use]
    pub fn target(&self, direction: Direction) -> &str {
        match (self.kind, direction) {
            (RelationshipKind::ManyToMany, Direction::Forward)
            | (RelationshipKind::ForeignKey | RelationshipKind::OneToOne, Direction::Backward) => {
                &self.right
            }
            _ => &self.left,
        }
    }

    /// Builds the joins walking from the table referenced as `from` to the
    /// target, which is referenced as `to`. `junction` names the junction
    /// table reference for many-to-many relationships.
    #[must_use]
    pub fn joins(&self, direction: Direction, from: &str, to: &str, junction: &str) -> Vec<JoinNode> {
        let target = self.target(direction);
        let aliased = |join: JoinNode, table: &str, reference: &str| {
            if table == reference {
                join
            } else {
                join.alias(reference)
            }
        };
        let left = |table: &str| Column::trusted(Some(table), &self.left_key);

        match (self.kind, direction) {
            (RelationshipKind::ManyToMany, direction) => {
                let (left_column, right_column) = self.junction_columns();
                let right = |table: &str| Column::trusted(Some(table), &self.right_key);
                let (near, far, from_key, to_key) = match direction {
                    Direction::Forward => (left_column, right_column, left(from), right(to)),
                    Direction::Backward => (right_column, left_column, right(from), left(to)),
                };
                let junction_table = self.junction_table();
                vec![
                    aliased(
                        JoinNode::inner(
                            &junction_table,
                            Column::trusted(Some(junction), &near),
                            from_key,
                        ),
                        &junction_table,
                        junction,
                    ),
                    aliased(
                        JoinNode::inner(target, to_key, Column::trusted(Some(junction), &far)),
                        target,
                        to,
                    ),
                ]
            }
            (_, Direction::Forward) => vec![aliased(
                JoinNode::inner(
                    target,
                    left(to),
                    Column::trusted(Some(from), &self.column_name()),
                ),
                target,
                to,
            )],
            (_, Direction::Backward) => vec![aliased(
                JoinNode::inner(
                    target,
                    Column::trusted(Some(to), &self.column_name()),
                    left(from),
                ),
                target,
                to,
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        let rel = Relationship::foreign_key("author", "book");
        assert_eq!(rel.name(), "author_book");
        assert_eq!(rel.column_name(), "author_id");
        assert_eq!(rel.forward_accessor(), ("book", String::from("author")));
        assert_eq!(rel.backward_accessor(), ("author", String::from("book_set")));

        let named = rel.related_name("books");
        assert_eq!(named.backward_accessor(), ("author", String::from("books")));
        assert_eq!(named.direction("author", "books"), Some(Direction::Backward));
        assert_eq!(named.direction("book", "author"), Some(Direction::Forward));
        assert_eq!(named.direction("book", "books"), None);
    }

    #[test]
    fn test_self_relationship_requires_name() {
        let rel = Relationship::foreign_key("employee", "employee");
        assert_eq!(
            rel.validate(),
            Err(CoreError::RelationshipNameRequired(String::from("employee")))
        );
        assert!(rel.related_name("reports").validate().is_ok());
    }

    #[test]
    fn test_foreign_key_joins() {
        let rel = Relationship::foreign_key("author", "book");
        let forward = rel.joins(Direction::Forward, "book", "author", "");
        assert_eq!(
            forward[0].to_sql(),
            "INNER JOIN author ON author.id = book.author_id"
        );
        let backward = rel.joins(Direction::Backward, "author", "book", "");
        assert_eq!(
            backward[0].to_sql(),
            "INNER JOIN book ON book.author_id = author.id"
        );
    }

    #[test]
    fn test_many_to_many_joins() {
        let rel = Relationship::many_to_many("article", "tag");
        assert_eq!(rel.junction_table(), "article_tag");
        assert_eq!(
            rel.junction_columns(),
            (String::from("article_id"), String::from("tag_id"))
        );
        let joins = rel.joins(Direction::Forward, "article", "tag", "article_tag");
        let rendered: Vec<String> = joins.iter().map(JoinNode::to_sql).collect();
        assert_eq!(
            rendered,
            vec![
                "INNER JOIN article_tag ON article_tag.article_id = article.id",
                "INNER JOIN tag ON tag.id = article_tag.tag_id",
            ]
        );
    }

    #[test]
    fn test_joins_use_declared_keys() {
        let rel = Relationship::foreign_key("country", "city").keys("code", "id");
        assert_eq!(
            rel.joins(Direction::Forward, "city", "country", "")[0].to_sql(),
            "INNER JOIN country ON country.code = city.country_id"
        );
        assert_eq!(
            rel.joins(Direction::Backward, "country", "city", "")[0].to_sql(),
            "INNER JOIN city ON city.country_id = country.code"
        );

        let rel = Relationship::many_to_many("country", "language").keys("code", "iso");
        let rendered: Vec<String> = rel
            .joins(Direction::Backward, "language", "country", "country_language")
            .iter()
            .map(JoinNode::to_sql)
            .collect();
        assert_eq!(
            rendered,
            vec![
                "INNER JOIN country_language ON country_language.language_id = language.iso",
                "INNER JOIN country ON country.code = country_language.country_id",
            ]
        );
    }

    #[test]
    fn test_self_many_to_many_columns() {
        let rel = Relationship::many_to_many("person", "person").related_name("followers");
        assert_eq!(
            rel.junction_columns(),
            (String::from("from_person_id"), String::from("to_person_id"))
        );
        assert_eq!(rel.direction("person", "person"), Some(Direction::Forward));
        assert_eq!(rel.direction("person", "followers"), Some(Direction::Backward));
    }

    #[test]
    fn test_on_delete_sql() {
        assert_eq!(OnDelete::SetNull.to_sql(), "SET NULL");
        assert_eq!(OnDelete::default().to_sql(), "CASCADE");
    }
}
