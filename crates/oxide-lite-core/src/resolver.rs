//! Resolution of filter keys into conditions and joins.
//!
//! A key is split on `__`. The last token is the lookup when it names one,
//! otherwise the lookup is `exact`. A date part may precede a comparison
//! (`created__year__gte`). Leading tokens that name relationship accessors
//! are walked through the [`Registry`] and produce joins, returned next to the
//! condition tree rather than inside it.
//!
//! ```
//! use oxide_lite_core::prelude::*;
//!
//! let q = Q::new().add("age__gt", 20).add("age__lt", 30);
//! let resolved = Resolver::detached().resolve(&q).unwrap();
//! let sql = resolved.condition.unwrap().to_sql(&SqliteBackend::new());
//! assert_eq!(sql, "age > 20 AND age < 30");
//! ```

use std::collections::HashMap;

use crate::condition::{Combined, QNode, Q};
use crate::error::{CoreError, Result};
use crate::expression::{validate_identifier, Column};
use crate::lookup::{Condition, Lookup, Operand, LOOKUP_SEPARATOR};
use crate::nodes::JoinNode;
use crate::registry::Registry;
use crate::relationship::RelationshipKind;
use crate::schema::Table;

/// The output of a resolution: an optional condition tree and the joins it
/// needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolved {
    /// The condition, `None` for an empty filter.
    pub condition: Option<Combined>,
    /// Joins required by relationship traversal, deduplicated.
    pub joins: Vec<JoinNode>,
}

/// Resolves [`Q`] filters against an optional table context.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: Option<&'a Registry>,
    table: Option<&'a Table>,
}

/// Joins and aliases accumulated while resolving one filter.
#[derive(Default)]
struct Walk {
    joins: Vec<JoinNode>,
    aliases: HashMap<String, String>,
    used: Vec<String>,
}

impl Walk {
    fn reference_for(&mut self, table: &str, path: &str) -> String {
        if let Some(alias) = self.aliases.get(path) {
            return alias.clone();
        }
        let reference = if self.used.iter().any(|used| used == table) {
            format!("{table}_{}", path.replace(LOOKUP_SEPARATOR, "_"))
        } else {
            table.to_string()
        };
        self.used.push(reference.clone());
        self.aliases.insert(path.to_string(), reference.clone());
        reference
    }

    fn push(&mut self, join: JoinNode) {
        if !self.joins.contains(&join) {
            self.joins.push(join);
        }
    }
}

impl<'a> Resolver<'a> {
    /// A resolver without table context: columns are only checked for being
    /// valid identifiers and relationships cannot be traversed.
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            registry: None,
            table: None,
        }
    }

    /// A resolver validating columns against `table`, without traversal.
    #[must_use]
    pub const fn for_table(table: &'a Table) -> Self {
        Self {
            registry: None,
            table: Some(table),
        }
    }

    /// A resolver for `table` able to traverse the registry's relationships.
    pub fn new(registry: &'a Registry, table: &str) -> Result<Self> {
        Ok(Self {
            registry: Some(registry),
            table: Some(registry.table(table)?),
        })
    }

    /// Resolves a filter.
    ///
    /// When any join is needed, bare columns of the base table are qualified
    /// with its name so the statement stays unambiguous.
    pub fn resolve(&self, q: &Q) -> Result<Resolved> {
        let Some(node) = q.node() else {
            return Ok(Resolved::default());
        };
        let mut walk = Walk::default();
        if let Some(table) = self.table {
            walk.used.push(table.name().to_string());
        }
        let mut condition = self.resolve_node(node, &mut walk)?;
        if !walk.joins.is_empty() {
            if let Some(table) = self.table {
                condition = condition.qualified(table.name());
            }
        }
        Ok(Resolved {
            condition: Some(condition),
            joins: walk.joins,
        })
    }

    /// Resolves a single `key = operand` pair.
    pub fn resolve_lookup(&self, key: &str, operand: impl Into<Operand>) -> Result<Resolved> {
        self.resolve(&Q::lookup(key, operand))
    }

    fn resolve_node(&self, node: &QNode, walk: &mut Walk) -> Result<Combined> {
        match node {
            QNode::Lookup { key, operand } => self
                .resolve_key(key, operand.clone(), walk)
                .map(Combined::Leaf),
            QNode::And(children) => {
                let mut resolved = children
                    .iter()
                    .map(|child| self.resolve_node(child, walk));
                let first = resolved.next().transpose()?;
                let mut combined = first.ok_or_else(|| {
                    CoreError::Structure(String::from("empty conjunction"))
                })?;
                for child in resolved {
                    combined = combined.and(child?);
                }
                Ok(combined)
            }
            QNode::Or(children) => {
                let mut resolved = children
                    .iter()
                    .map(|child| self.resolve_node(child, walk));
                let first = resolved.next().transpose()?;
                let mut combined = first.ok_or_else(|| {
                    CoreError::Structure(String::from("empty disjunction"))
                })?;
                for child in resolved {
                    combined = combined.or(child?);
                }
                Ok(combined)
            }
            QNode::Not(inner) => Ok(self.resolve_node(inner, walk)?.not()),
        }
    }

    fn resolve_key(&self, key: &str, operand: Operand, walk: &mut Walk) -> Result<Condition> {
        let mut tokens: Vec<&str> = key.split(LOOKUP_SEPARATOR).collect();
        if let Some(empty) = tokens.iter().find(|token| token.is_empty()) {
            return Err(CoreError::unknown_lookup(*empty, key));
        }

        let mut lookup = Lookup::Exact;
        if tokens.len() > 1 {
            if let Some(parsed) = tokens.last().and_then(|token| Lookup::parse(token)) {
                lookup = parsed;
                tokens.pop();
            }
        }
        let mut transform = None;
        if tokens.len() > 1 && lookup.date_part().is_none() {
            if let Some(part) = tokens
                .last()
                .and_then(|token| Lookup::parse(token))
                .and_then(Lookup::date_part)
            {
                transform = Some(part);
                tokens.pop();
            }
        }

        let (field, accessors) = tokens
            .split_last()
            .ok_or_else(|| CoreError::unknown_lookup(key, key))?;
        let column = self.walk_path(key, accessors, field, walk)?;

        match transform {
            Some(part) => Condition::transformed(column, part, lookup, operand),
            None => Condition::new(column, lookup, operand),
        }
    }

    /// Walks the accessor chain and returns the resolved far-side column.
    fn walk_path(
        &self,
        key: &str,
        accessors: &[&str],
        field: &str,
        walk: &mut Walk,
    ) -> Result<Column> {
        let Some(table) = self.table else {
            if !accessors.is_empty() {
                let offending = accessors.get(1).copied().unwrap_or(field);
                return Err(CoreError::unknown_lookup(offending, key));
            }
            validate_identifier(field).map_err(|_| CoreError::unknown_lookup(field, key))?;
            return Ok(Column::trusted(None, field));
        };

        let mut current = table;
        let mut reference: Option<String> = None;
        let mut path = String::new();

        for (position, &accessor) in accessors.iter().enumerate() {
            let from = reference.clone().unwrap_or_else(|| current.name().to_string());
            let step = self
                .registry
                .and_then(|registry| registry.traverse(current.name(), accessor));
            let Some((relationship, direction)) = step else {
                let offending = if current.has_column(accessor) {
                    accessors.get(position + 1).copied().unwrap_or(field)
                } else {
                    accessor
                };
                return Err(CoreError::unknown_lookup(offending, key));
            };
            let registry = self
                .registry
                .ok_or_else(|| CoreError::unknown_lookup(accessor, key))?;

            if !path.is_empty() {
                path.push_str(LOOKUP_SEPARATOR);
            }
            path.push_str(accessor);

            let target = relationship.target(direction);
            let junction = if relationship.kind() == RelationshipKind::ManyToMany {
                walk.reference_for(
                    &relationship.junction_table(),
                    &format!("{path}{LOOKUP_SEPARATOR}through"),
                )
            } else {
                String::new()
            };
            let to = walk.reference_for(target, &path);
            for join in relationship.joins(direction, &from, &to, &junction) {
                walk.push(join);
            }
            current = registry.table(target)?;
            reference = Some(to);
        }

        if !current.has_column(field) {
            return Err(CoreError::unknown_lookup(field, key));
        }
        Ok(Column::trusted(reference.as_deref(), field))
    }
}
