//! JOIN clauses.

use crate::expression::Column;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// INNER JOIN.
    Inner,
    /// LEFT JOIN.
    Left,
    /// RIGHT JOIN.
    Right,
    /// CROSS JOIN.
    Cross,
}

impl JoinKind {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// A JOIN clause with an equality predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinNode {
    kind: JoinKind,
    table: String,
    alias: Option<String>,
    on: Option<(Column, Column)>,
}

impl JoinNode {
    /// Creates an `INNER JOIN table ON left = right`.
    #[must_use]
    pub fn inner(table: &str, left: Column, right: Column) -> Self {
        Self {
            kind: JoinKind::Inner,
            table: table.to_string(),
            alias: None,
            on: Some((left, right)),
        }
    }

    /// Creates a `LEFT JOIN table ON left = right`.
    #[must_use]
    pub fn left(table: &str, left: Column, right: Column) -> Self {
        Self {
            kind: JoinKind::Left,
            ..Self::inner(table, left, right)
        }
    }

    /// Creates a `CROSS JOIN table`.
    #[must_use]
    pub fn cross(table: &str) -> Self {
        Self {
            kind: JoinKind::Cross,
            table: table.to_string(),
            alias: None,
            on: None,
        }
    }

    /// Sets the alias the joined table is referenced by.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Returns the joined table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the name the joined table is referenced by.
    #[must_use]
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// Returns the join type.
    #[must_use]
    pub const fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Renders the clause.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.kind.as_str(), self.table);
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }
        if let Some((left, right)) = &self.on {
            sql.push_str(&format!(" ON {} = {}", left.to_sql(), right.to_sql()));
        }
        sql
    }
}
