//! SELECT, GROUP BY, HAVING and LIMIT nodes.

use crate::backend::Backend;
use crate::condition::Combined;
use crate::error::Result;
use crate::expression::{validate_identifier, Column, Expr};

/// An item of the projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`
    All,
    /// `table.*`
    AllOf(String),
    /// A column.
    Column(Column),
    /// `expr AS alias`
    Expr {
        /// The projected expression.
        expr: Expr,
        /// Output name.
        alias: String,
    },
}

impl Projection {
    /// Projects an expression under an alias.
    pub fn aliased(expr: impl Into<Expr>, alias: &str) -> Result<Self> {
        validate_identifier(alias)?;
        Ok(Self::Expr {
            expr: expr.into(),
            alias: alias.to_string(),
        })
    }

    /// Returns the output column name, if the projection names one.
    #[must_use]
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Self::Column(column) => Some(column.name()),
            Self::Expr { alias, .. } => Some(alias),
            Self::All | Self::AllOf(_) => None,
        }
    }

    /// Renders the projection item.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::All => String::from("*"),
            Self::AllOf(table) => format!("{table}.*"),
            Self::Column(column) => column.to_sql(),
            Self::Expr { expr, alias } => format!("{} AS {alias}", expr.to_sql(backend)),
        }
    }
}

/// `SELECT [DISTINCT] projections FROM table`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    table: String,
    projections: Vec<Projection>,
    distinct: bool,
}

impl SelectNode {
    /// Selects every column of `table`.
    pub fn new(table: &str) -> Result<Self> {
        Self::with_projections(table, vec![Projection::All])
    }

    /// Selects the named columns.
    pub fn columns(table: &str, columns: &[&str]) -> Result<Self> {
        let projections = columns
            .iter()
            .map(|name| Column::new(name).map(Projection::Column))
            .collect::<Result<Vec<_>>>()?;
        Self::with_projections(table, projections)
    }

    /// Selects the given projections.
    pub fn with_projections(table: &str, projections: Vec<Projection>) -> Result<Self> {
        validate_identifier(table)?;
        Ok(Self {
            table: table.to_string(),
            projections,
            distinct: false,
        })
    }

    /// Adds `DISTINCT`.
    #[must_use]
    pub const fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Returns whether `DISTINCT` is set.
    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Returns the source table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the projection list.
    #[must_use]
    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let projections: Vec<String> = self
            .projections
            .iter()
            .map(|p| p.to_sql(backend))
            .collect();
        format!(
            "SELECT {}{} FROM {}",
            if self.distinct { "DISTINCT " } else { "" },
            projections.join(", "),
            self.table
        )
    }
}

/// `GROUP BY columns`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupByNode {
    columns: Vec<Column>,
}

impl GroupByNode {
    /// Groups by the named columns.
    pub fn new(columns: &[&str]) -> Result<Self> {
        let columns = columns
            .iter()
            .map(|name| Column::new(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Appends the columns of `other` not already present.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for column in other.columns {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        self
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(Column::to_sql).collect();
        format!("GROUP BY {}", columns.join(", "))
    }
}

/// `HAVING condition`
#[derive(Debug, Clone, PartialEq)]
pub struct HavingNode {
    condition: Combined,
}

impl HavingNode {
    /// Creates the node.
    #[must_use]
    pub const fn new(condition: Combined) -> Self {
        Self { condition }
    }

    /// Combines with another HAVING condition using AND.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            condition: self.condition.and(other.condition),
        }
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        format!("HAVING {}", self.condition.to_sql(backend))
    }
}

/// `LIMIT n OFFSET m`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LimitNode {
    limit: Option<u64>,
    offset: Option<u64>,
}

impl LimitNode {
    /// Creates the node.
    #[must_use]
    pub const fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self { limit, offset }
    }

    /// Returns the limit.
    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Returns the offset.
    #[must_use]
    pub const fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Overrides the fields `other` sets.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            limit: match other.limit {
                Some(limit) => Some(limit),
                None => self.limit,
            },
            offset: match other.offset {
                Some(offset) => Some(offset),
                None => self.offset,
            },
        }
    }

    /// Renders the node; empty when neither field is set.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => format!("LIMIT {limit} OFFSET {offset}"),
            (Some(limit), None) => format!("LIMIT {limit}"),
            (None, Some(offset)) => format!("LIMIT -1 OFFSET {offset}"),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::backend::SqliteBackend;
    use crate::error::CoreError;
    use crate::expression::col;

    #[test]
    fn test_select_rendering() {
        let backend = SqliteBackend::new();
        assert_eq!(
            SelectNode::new("person").unwrap().to_sql(&backend),
            "SELECT * FROM person"
        );
        assert_eq!(
            SelectNode::columns("person", &["name", "age"])
                .unwrap()
                .distinct(true)
                .to_sql(&backend),
            "SELECT DISTINCT name, age FROM person"
        );
        let annotated = SelectNode::with_projections(
            "book",
            vec![
                Projection::AllOf(String::from("book")),
                Projection::aliased(Aggregate::count(col("id").unwrap()), "total").unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(
            annotated.to_sql(&backend),
            "SELECT book.*, COUNT(id) AS total FROM book"
        );
    }

    #[test]
    fn test_table_name_is_validated() {
        assert!(matches!(
            SelectNode::new("person; DROP TABLE person"),
            Err(CoreError::InvalidReference(_))
        ));
        assert!(SelectNode::columns("", &["name"]).is_err());
        assert!(SelectNode::with_projections("select", vec![Projection::All]).is_err());
    }

    #[test]
    fn test_limit_rendering() {
        assert_eq!(LimitNode::new(Some(10), None).to_sql(), "LIMIT 10");
        assert_eq!(LimitNode::new(Some(10), Some(5)).to_sql(), "LIMIT 10 OFFSET 5");
        assert_eq!(LimitNode::new(None, Some(5)).to_sql(), "LIMIT -1 OFFSET 5");
        assert_eq!(
            LimitNode::new(Some(10), None).merge(LimitNode::new(None, Some(2))),
            LimitNode::new(Some(10), Some(2))
        );
    }

    #[test]
    fn test_group_by_merge() {
        let group = GroupByNode::new(&["a"])
            .unwrap()
            .merge(GroupByNode::new(&["a", "b"]).unwrap());
        assert_eq!(group.to_sql(), "GROUP BY a, b");
    }
}
