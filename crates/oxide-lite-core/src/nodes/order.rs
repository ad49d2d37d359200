//! ORDER BY node.

use std::ops::BitAnd;

use crate::error::Result;
use crate::expression::Column;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// `ORDER BY field [ASC|DESC], ...`
///
/// Fields keep the position they were first given in; combining two nodes
/// with `&` lets the right-hand side decide the direction of shared fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderByNode {
    fields: Vec<(Column, OrderDirection)>,
}

impl OrderByNode {
    /// Parses field names; a leading `-` means descending.
    pub fn new(fields: &[&str]) -> Result<Self> {
        let mut node = Self::default();
        for field in fields {
            let (name, direction) = match field.strip_prefix('-') {
                Some(name) => (name, OrderDirection::Desc),
                None => (*field, OrderDirection::Asc),
            };
            node.set(Column::new(name)?, direction);
        }
        Ok(node)
    }

    fn set(&mut self, column: Column, direction: OrderDirection) {
        match self.fields.iter_mut().find(|(existing, _)| *existing == column) {
            Some(entry) => entry.1 = direction,
            None => self.fields.push((column, direction)),
        }
    }

    /// Returns the fields and their directions.
    #[must_use]
    pub fn fields(&self) -> &[(Column, OrderDirection)] {
        &self.fields
    }

    /// Returns `true` when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the node with every direction flipped.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        for entry in &mut self.fields {
            entry.1 = entry.1.reversed();
        }
        self
    }

    /// Qualifies the bare fields that are among `columns` with `table`.
    /// Other bare fields, such as annotation aliases, stay as they are.
    #[must_use]
    pub fn qualified(mut self, table: &str, columns: &[&str]) -> Self {
        for entry in &mut self.fields {
            if entry.0.table().is_none() && columns.contains(&entry.0.name()) {
                entry.0 = entry.0.clone().with_table(table);
            }
        }
        self
    }

    /// Renders the node; empty when no field is set.
    #[must_use]
    pub fn to_sql(&self) -> String {
        if self.fields.is_empty() {
            return String::new();
        }
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(column, direction)| format!("{column} {}", direction.as_str()))
            .collect();
        format!("ORDER BY {}", fields.join(", "))
    }
}

impl BitAnd for OrderByNode {
    type Output = Self;

    fn bitand(mut self, rhs: Self) -> Self::Output {
        for (column, direction) in rhs.fields {
            self.set(column, direction);
        }
        self
    }
}
