//! Composable SQL nodes.
//!
//! Every node renders itself given a [`Backend`]. Nodes combine with `+` into
//! a [`ComplexNode`], which renders its parts in order, or are slotted into a
//! [`SelectMap`], which orders the clauses of a single SELECT statement and
//! merges repeated clauses.

mod ddl;
mod filter;
mod insert;
mod join;
mod order;
mod select;
mod update;

use std::ops::Add;

pub use ddl::{
    AddColumnNode, ColumnDefinition, CreateIndexNode, CreateTableNode, DropIndexNode,
    DropTableNode,
};
pub use filter::WhereNode;
pub use insert::InsertNode;
pub use join::{JoinKind, JoinNode};
pub use order::{OrderByNode, OrderDirection};
pub use select::{GroupByNode, HavingNode, LimitNode, Projection, SelectNode};
pub use update::{DeleteNode, UpdateNode, WriteFilter};

use crate::backend::Backend;
use crate::error::{CoreError, Result};

/// Any renderable node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// SELECT ... FROM
    Select(SelectNode),
    /// WHERE
    Where(WhereNode),
    /// ORDER BY
    OrderBy(OrderByNode),
    /// JOIN
    Join(JoinNode),
    /// GROUP BY
    GroupBy(GroupByNode),
    /// HAVING
    Having(HavingNode),
    /// LIMIT / OFFSET
    Limit(LimitNode),
    /// INSERT
    Insert(InsertNode),
    /// UPDATE
    Update(UpdateNode),
    /// DELETE
    Delete(DeleteNode),
    /// Verbatim SQL.
    Raw(String),
    /// CREATE TABLE
    CreateTable(CreateTableNode),
    /// ALTER TABLE ADD COLUMN
    AddColumn(AddColumnNode),
    /// DROP TABLE
    DropTable(DropTableNode),
    /// CREATE INDEX
    CreateIndex(CreateIndexNode),
    /// DROP INDEX
    DropIndex(DropIndexNode),
}

impl Node {
    /// Returns whether running the node modifies data or schema.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Insert(_)
                | Self::Update(_)
                | Self::Delete(_)
                | Self::CreateTable(_)
                | Self::AddColumn(_)
                | Self::DropTable(_)
                | Self::CreateIndex(_)
                | Self::DropIndex(_)
        )
    }

    /// Returns a short name of the statement kind, used in error context.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::Where(_) => "where",
            Self::OrderBy(_) => "order by",
            Self::Join(_) => "join",
            Self::GroupBy(_) => "group by",
            Self::Having(_) => "having",
            Self::Limit(_) => "limit",
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::Raw(_) => "raw",
            Self::CreateTable(_) => "create table",
            Self::AddColumn(_) => "add column",
            Self::DropTable(_) => "drop table",
            Self::CreateIndex(_) => "create index",
            Self::DropIndex(_) => "drop index",
        }
    }

    /// Renders the node.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::Select(node) => node.to_sql(backend),
            Self::Where(node) => node.to_sql(backend),
            Self::OrderBy(node) => node.to_sql(),
            Self::Join(node) => node.to_sql(),
            Self::GroupBy(node) => node.to_sql(),
            Self::Having(node) => node.to_sql(backend),
            Self::Limit(node) => node.to_sql(),
            Self::Insert(node) => node.to_sql(backend),
            Self::Update(node) => node.to_sql(backend),
            Self::Delete(node) => node.to_sql(backend),
            Self::Raw(sql) => sql.clone(),
            Self::CreateTable(node) => node.to_sql(backend),
            Self::AddColumn(node) => node.to_sql(backend),
            Self::DropTable(node) => node.to_sql(backend),
            Self::CreateIndex(node) => node.to_sql(backend),
            Self::DropIndex(node) => node.to_sql(backend),
        }
    }
}

macro_rules! node_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Node {
                fn from(node: $ty) -> Self {
                    Self::$variant(node)
                }
            }
        )*
    };
}

node_from!(
    Select(SelectNode),
    Where(WhereNode),
    OrderBy(OrderByNode),
    Join(JoinNode),
    GroupBy(GroupByNode),
    Having(HavingNode),
    Limit(LimitNode),
    Insert(InsertNode),
    Update(UpdateNode),
    Delete(DeleteNode),
    CreateTable(CreateTableNode),
    AddColumn(AddColumnNode),
    DropTable(DropTableNode),
    CreateIndex(CreateIndexNode),
    DropIndex(DropIndexNode),
);

/// Collapses runs of whitespace outside single-quoted literals and trims.
#[must_use]
pub fn normalize_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut pending_space = false;
    for c in sql.chars() {
        if in_literal {
            out.push(c);
            if c == '\'' {
                in_literal = false;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '\'' {
            in_literal = true;
        }
        out.push(c);
    }
    out
}

/// An ordered sequence of nodes rendered as one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexNode {
    nodes: Vec<Node>,
}

impl ComplexNode {
    /// Creates an empty sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Returns the nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Renders the parts joined by single spaces.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let parts: Vec<String> = self.nodes.iter().map(|n| n.to_sql(backend)).collect();
        normalize_whitespace(&parts.join(" "))
    }
}

impl FromIterator<Node> for ComplexNode {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl Add for Node {
    type Output = ComplexNode;

    fn add(self, rhs: Self) -> Self::Output {
        ComplexNode {
            nodes: vec![self, rhs],
        }
    }
}

impl Add<Node> for ComplexNode {
    type Output = Self;

    fn add(mut self, rhs: Node) -> Self::Output {
        self.nodes.push(rhs);
        self
    }
}

impl Add for ComplexNode {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self.nodes.extend(rhs.nodes);
        self
    }
}

/// The clauses of one SELECT statement, in rendering order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectMap {
    select: Option<SelectNode>,
    joins: Vec<JoinNode>,
    filter: Option<WhereNode>,
    group_by: Option<GroupByNode>,
    having: Option<HavingNode>,
    order_by: Option<OrderByNode>,
    limit: Option<LimitNode>,
}

impl SelectMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from nodes, merging repeated clauses.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self> {
        let mut map = Self::new();
        for node in nodes {
            map.push(node)?;
        }
        Ok(map)
    }

    /// Slots a node.
    ///
    /// WHERE and HAVING merge with AND, ORDER BY merges with `&`, a second
    /// SELECT replaces the projection and joins are deduplicated. Write and
    /// DDL nodes are rejected.
    pub fn push(&mut self, node: Node) -> Result<()> {
        match node {
            Node::Select(select) => self.select = Some(select),
            Node::Join(join) => {
                if !self.joins.contains(&join) {
                    self.joins.push(join);
                }
            }
            Node::Where(filter) => {
                self.filter = Some(match self.filter.take() {
                    Some(existing) => existing & filter,
                    None => filter,
                });
            }
            Node::GroupBy(group) => {
                self.group_by = Some(match self.group_by.take() {
                    Some(existing) => existing.merge(group),
                    None => group,
                });
            }
            Node::Having(having) => {
                self.having = Some(match self.having.take() {
                    Some(existing) => existing.merge(having),
                    None => having,
                });
            }
            Node::OrderBy(order) => {
                self.order_by = Some(match self.order_by.take() {
                    Some(existing) => existing & order,
                    None => order,
                });
            }
            Node::Limit(limit) => {
                self.limit = Some(match self.limit.take() {
                    Some(existing) => existing.merge(limit),
                    None => limit,
                });
            }
            other => {
                return Err(CoreError::Structure(format!(
                    "a {} node cannot be part of a select",
                    other.kind()
                )));
            }
        }
        Ok(())
    }

    /// Returns the SELECT node.
    #[must_use]
    pub const fn select(&self) -> Option<&SelectNode> {
        self.select.as_ref()
    }

    /// Returns the joins.
    #[must_use]
    pub fn joins(&self) -> &[JoinNode] {
        &self.joins
    }

    /// Returns the WHERE node.
    #[must_use]
    pub const fn filter(&self) -> Option<&WhereNode> {
        self.filter.as_ref()
    }

    /// Returns the ORDER BY node.
    #[must_use]
    pub const fn order_by(&self) -> Option<&OrderByNode> {
        self.order_by.as_ref()
    }

    /// Returns the LIMIT node.
    #[must_use]
    pub const fn limit(&self) -> Option<&LimitNode> {
        self.limit.as_ref()
    }

    /// Renders the statement. A SELECT node is required.
    pub fn to_sql(&self, backend: &dyn Backend) -> Result<String> {
        let select = self
            .select
            .as_ref()
            .ok_or_else(|| CoreError::Structure(String::from("a select map needs a SELECT node")))?;
        let mut parts = vec![select.to_sql(backend)];
        parts.extend(self.joins.iter().map(JoinNode::to_sql));
        if let Some(filter) = &self.filter {
            parts.push(filter.to_sql(backend));
        }
        if let Some(group_by) = &self.group_by {
            parts.push(group_by.to_sql());
        }
        if let Some(having) = &self.having {
            parts.push(having.to_sql(backend));
        }
        if let Some(order_by) = &self.order_by {
            parts.push(order_by.to_sql());
        }
        if let Some(limit) = &self.limit {
            parts.push(limit.to_sql());
        }
        Ok(normalize_whitespace(&parts.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use crate::condition::Q;
    use crate::resolver::Resolver;

    fn filter(key: &str, value: i64) -> Node {
        let condition = Resolver::detached()
            .resolve(&Q::lookup(key, value))
            .unwrap()
            .condition
            .unwrap();
        Node::Where(WhereNode::new(condition))
    }

    #[test]
    fn test_normalize_whitespace_keeps_literals() {
        assert_eq!(
            normalize_whitespace("  SELECT  *\n FROM t WHERE a = 'x  y'  "),
            "SELECT * FROM t WHERE a = 'x  y'"
        );
        assert_eq!(normalize_whitespace("a = 'it''s  ok'   b"), "a = 'it''s  ok' b");
    }

    #[test]
    fn test_complex_node_concatenation() {
        let backend = SqliteBackend::new();
        let statement = Node::from(SelectNode::new("person").unwrap())
            + filter("age__gt", 20)
            + Node::from(OrderByNode::new(&["-age"]).unwrap());
        assert_eq!(
            statement.to_sql(&backend),
            "SELECT * FROM person WHERE age > 20 ORDER BY age DESC"
        );
    }

    #[test]
    fn test_select_map_ordering_and_merging() {
        let backend = SqliteBackend::new();
        let map = SelectMap::from_nodes(vec![
            Node::from(LimitNode::new(Some(5), None)),
            Node::from(OrderByNode::new(&["name"]).unwrap()),
            filter("age__gt", 20),
            Node::from(SelectNode::new("person").unwrap()),
            filter("age__lt", 30),
            Node::from(OrderByNode::new(&["-name", "age"]).unwrap()),
        ])
        .unwrap();
        assert_eq!(
            map.to_sql(&backend).unwrap(),
            "SELECT * FROM person WHERE age > 20 AND age < 30 ORDER BY name DESC, age ASC LIMIT 5"
        );
    }

    #[test]
    fn test_select_map_rejects_writes() {
        let mut map = SelectMap::new();
        let result = map.push(Node::from(DeleteNode::new("person").unwrap()));
        assert!(matches!(result, Err(CoreError::Structure(_))));
        assert!(matches!(map.to_sql(&SqliteBackend::new()), Err(CoreError::Structure(_))));
    }
}
