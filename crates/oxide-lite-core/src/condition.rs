//! Boolean combinations of filters.
//!
//! [`Q`] is the unresolved form built from filter keys (`age__gt`); the
//! [`Resolver`](crate::resolver::Resolver) turns it into a [`Combined`] tree of
//! [`Condition`]s that renders to SQL.
//!
//! Both trees flatten nested combinations of the same kind, so `a & (b & c)`
//! and `(a & b) & c` are the same value. An empty operand is the identity of
//! `&` and `|`.

use std::ops::{BitAnd, BitOr, Not};

use crate::backend::Backend;
use crate::lookup::{Condition, Operand};

/// An unresolved filter tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum QNode {
    /// A single `key = operand` filter.
    Lookup {
        /// Filter key such as `age__gt` or `author__name`.
        key: String,
        /// Right-hand side.
        operand: Operand,
    },
    /// Conjunction.
    And(Vec<QNode>),
    /// Disjunction.
    Or(Vec<QNode>),
    /// Negation.
    Not(Box<QNode>),
}

fn and_nodes(lhs: QNode, rhs: QNode) -> QNode {
    let mut children = Vec::new();
    for node in [lhs, rhs] {
        match node {
            QNode::And(inner) => children.extend(inner),
            other => children.push(other),
        }
    }
    QNode::And(children)
}

fn or_nodes(lhs: QNode, rhs: QNode) -> QNode {
    let mut children = Vec::new();
    for node in [lhs, rhs] {
        match node {
            QNode::Or(inner) => children.extend(inner),
            other => children.push(other),
        }
    }
    QNode::Or(children)
}

/// A filter, combinable with `&`, `|` and `!`.
///
/// ```
/// use oxide_lite_core::prelude::*;
///
/// let adults = Q::new().add("age__gte", 18).add("age__lt", 65);
/// let named = Q::lookup("name__startswith", "K");
/// let either = adults | named;
/// assert!(!either.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Q {
    node: Option<QNode>,
}

impl Q {
    /// Creates an empty filter.
    #[must_use]
    pub const fn new() -> Self {
        Self { node: None }
    }

    /// Creates an empty filter; renders no WHERE clause.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new()
    }

    /// Creates a filter with one lookup.
    pub fn lookup(key: &str, operand: impl Into<Operand>) -> Self {
        Self {
            node: Some(QNode::Lookup {
                key: key.to_string(),
                operand: operand.into(),
            }),
        }
    }

    /// Adds a filter combined with AND.
    #[must_use]
    pub fn add(self, key: &str, operand: impl Into<Operand>) -> Self {
        self.and(Self::lookup(key, operand))
    }

    /// Returns `true` when the filter holds no lookup.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    /// Returns the root node.
    #[must_use]
    pub const fn node(&self) -> Option<&QNode> {
        self.node.as_ref()
    }

    /// Combines with AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let node = match (self.node, other.node) {
            (Some(lhs), Some(rhs)) => Some(and_nodes(lhs, rhs)),
            (lhs, rhs) => lhs.or(rhs),
        };
        Self { node }
    }

    /// Combines with OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let node = match (self.node, other.node) {
            (Some(lhs), Some(rhs)) => Some(or_nodes(lhs, rhs)),
            (lhs, rhs) => lhs.or(rhs),
        };
        Self { node }
    }

    /// Negates the filter. Negating an empty filter is a no-op.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self {
            node: self.node.map(|node| match node {
                QNode::Not(inner) => *inner,
                other => QNode::Not(Box::new(other)),
            }),
        }
    }
}

impl BitAnd for Q {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Q {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for Q {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::not(self)
    }
}

/// A resolved boolean tree of conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Combined {
    /// A single condition.
    Leaf(Condition),
    /// Conjunction; never directly contains another `And`.
    And(Vec<Combined>),
    /// Disjunction; never directly contains another `Or`.
    Or(Vec<Combined>),
    /// Negation.
    Not(Box<Combined>),
}

impl Combined {
    /// Combines with AND, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut children = Vec::new();
        for node in [self, other] {
            match node {
                Self::And(inner) => children.extend(inner),
                leaf => children.push(leaf),
            }
        }
        Self::And(children)
    }

    /// Combines with OR, flattening nested disjunctions.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let mut children = Vec::new();
        for node in [self, other] {
            match node {
                Self::Or(inner) => children.extend(inner),
                leaf => children.push(leaf),
            }
        }
        Self::Or(children)
    }

    /// Negates the tree.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// Combines two optional trees with AND; an absent side is the identity.
    #[must_use]
    pub fn merge(lhs: Option<Self>, rhs: Option<Self>) -> Option<Self> {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => Some(lhs.and(rhs)),
            (lhs, rhs) => lhs.or(rhs),
        }
    }

    /// Qualifies every bare column reference with `table`.
    #[must_use]
    pub fn qualified(mut self, table: &str) -> Self {
        self.qualify(table);
        self
    }

    fn qualify(&mut self, table: &str) {
        match self {
            Self::Leaf(condition) => condition.qualify(table),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.qualify(table);
                }
            }
            Self::Not(inner) => inner.qualify(table),
        }
    }

    /// Visits every condition in the tree.
    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            Self::Leaf(condition) => vec![condition],
            Self::And(children) | Self::Or(children) => {
                children.iter().flat_map(Self::conditions).collect()
            }
            Self::Not(inner) => inner.conditions(),
        }
    }

    /// Renders the tree. The top level is never parenthesized; a child of a
    /// different combination kind is.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::Leaf(condition) => condition.to_sql(backend),
            Self::And(children) => children
                .iter()
                .map(|child| match child {
                    Self::Or(_) => format!("({})", child.to_sql(backend)),
                    _ => child.to_sql(backend),
                })
                .collect::<Vec<_>>()
                .join(" AND "),
            Self::Or(children) => children
                .iter()
                .map(|child| match child {
                    Self::And(_) => format!("({})", child.to_sql(backend)),
                    _ => child.to_sql(backend),
                })
                .collect::<Vec<_>>()
                .join(" OR "),
            Self::Not(inner) => format!("NOT ({})", inner.to_sql(backend)),
        }
    }
}

impl From<Condition> for Combined {
    fn from(condition: Condition) -> Self {
        Self::Leaf(condition)
    }
}

impl BitAnd for Combined {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Combined {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for Combined {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::not(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use crate::expression::col;
    use crate::lookup::Lookup;

    fn leaf(name: &str, lookup: Lookup, value: i64) -> Combined {
        Condition::new(col(name).unwrap(), lookup, value).unwrap().into()
    }

    #[test]
    fn test_q_identity_and_flattening() {
        let a = Q::lookup("a", 1);
        assert_eq!(a.clone() & Q::empty(), a);
        assert_eq!(Q::empty() | a.clone(), a);
        assert!((!Q::empty()).is_empty());

        let b = Q::lookup("b", 2);
        let c = Q::lookup("c", 3);
        assert_eq!(
            (a.clone() & b.clone()) & c.clone(),
            a.clone() & (b.clone() & c.clone())
        );
        assert_eq!((a.clone() | b.clone()) | c.clone(), a.clone() | (b | c));
        assert_eq!(!!a.clone(), a);
    }

    #[test]
    fn test_combined_rendering() {
        let backend = SqliteBackend::new();
        let range = leaf("age", Lookup::Gt, 20) & leaf("age", Lookup::Lt, 30);
        assert_eq!(range.to_sql(&backend), "age > 20 AND age < 30");
        assert_eq!(
            (!range.clone()).to_sql(&backend),
            "NOT (age > 20 AND age < 30)"
        );

        let mixed = range | leaf("score", Lookup::Exact, 1);
        assert_eq!(
            mixed.to_sql(&backend),
            "(age > 20 AND age < 30) OR score = 1"
        );
    }

    #[test]
    fn test_combined_associativity_renders_identically() {
        let backend = SqliteBackend::new();
        let a = || leaf("a", Lookup::Exact, 1);
        let b = || leaf("b", Lookup::Exact, 2);
        let c = || leaf("c", Lookup::Exact, 3);
        assert_eq!(
            ((a() & b()) & c()).to_sql(&backend),
            (a() & (b() & c())).to_sql(&backend)
        );
        assert_eq!(
            ((a() | b()) | c()).to_sql(&backend),
            (a() | (b() | c())).to_sql(&backend)
        );
    }

    #[test]
    fn test_qualify() {
        let backend = SqliteBackend::new();
        let combined = leaf("age", Lookup::Gt, 20).qualified("person");
        assert_eq!(combined.to_sql(&backend), "person.age > 20");
    }
}
