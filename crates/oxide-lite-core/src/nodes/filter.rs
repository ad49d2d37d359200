//! WHERE node.

use std::ops::BitAnd;

use crate::backend::Backend;
use crate::condition::Combined;

/// `WHERE condition`
#[derive(Debug, Clone, PartialEq)]
pub struct WhereNode {
    condition: Combined,
}

impl WhereNode {
    /// Creates the node.
    #[must_use]
    pub const fn new(condition: Combined) -> Self {
        Self { condition }
    }

    /// Returns the condition.
    #[must_use]
    pub const fn condition(&self) -> &Combined {
        &self.condition
    }

    /// Consumes the node, returning its condition.
    #[must_use]
    pub fn into_condition(self) -> Combined {
        self.condition
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        format!("WHERE {}", self.condition.to_sql(backend))
    }
}

impl BitAnd for WhereNode {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::new(self.condition.and(rhs.condition))
    }
}
