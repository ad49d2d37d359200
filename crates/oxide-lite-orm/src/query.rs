//! The query executor.
//!
//! A [`Query`] owns a target table and an ordered node list. Reads are
//! assembled through a [`SelectMap`]; a write is a single INSERT, UPDATE,
//! DELETE or DDL node and runs at most once.

use oxide_lite_core::backend::Backend;
use oxide_lite_core::nodes::{ComplexNode, Node, SelectMap};
use oxide_lite_core::CoreError;
use tracing::debug;

use crate::database::Database;
use crate::error::{OrmError, Result};
use crate::row::Row;

/// Lifecycle of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Nodes are set, nothing ran.
    Built,
    /// The statement ran and its rows are held.
    Executed,
    /// The rows were handed out.
    Consumed,
}

/// An executable statement.
#[derive(Debug, Clone)]
pub struct Query {
    table: String,
    nodes: Vec<Node>,
    state: QueryState,
    rows: Vec<Row>,
    rows_affected: u64,
}

impl Query {
    /// Creates an empty query on `table`.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self::with_nodes(table, Vec::new())
    }

    /// Creates a query from a node list.
    #[must_use]
    pub fn with_nodes(table: &str, nodes: Vec<Node>) -> Self {
        Self {
            table: table.to_string(),
            nodes,
            state: QueryState::Built,
            rows: Vec::new(),
            rows_affected: 0,
        }
    }

    /// Appends a node.
    #[must_use]
    pub fn node(mut self, node: impl Into<Node>) -> Self {
        self.nodes.push(node.into());
        self
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> QueryState {
        self.state
    }

    /// Returns `true` when the statement writes.
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.nodes.iter().any(Node::is_write)
    }

    fn kind(&self) -> &'static str {
        self.nodes
            .iter()
            .find(|node| node.is_write())
            .map_or("select", Node::kind)
    }

    fn returns_rows(&self, backend: &dyn Backend) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node, Node::Insert(insert) if insert.has_returning(backend)))
    }

    /// Renders the statement without running it.
    pub fn sql_statement(&self, backend: &dyn Backend) -> Result<String> {
        let writes = self.nodes.iter().filter(|node| node.is_write()).count();
        if writes > 0 {
            if writes > 1 || self.nodes.len() > 1 {
                return Err(CoreError::Structure(format!(
                    "a write on '{}' must be a single node",
                    self.table
                ))
                .into());
            }
            return Ok(self
                .nodes
                .iter()
                .cloned()
                .collect::<ComplexNode>()
                .to_sql(backend));
        }
        if self.nodes.iter().any(|node| matches!(node, Node::Raw(_))) {
            return Ok(self
                .nodes
                .iter()
                .cloned()
                .collect::<ComplexNode>()
                .to_sql(backend));
        }
        Ok(SelectMap::from_nodes(self.nodes.iter().cloned())?.to_sql(backend)?)
    }

    /// Runs the statement.
    ///
    /// Reads may run again and refresh the held rows. A write that already
    /// ran fails with [`OrmError::AlreadyExecuted`].
    pub async fn run(&mut self, db: &Database) -> Result<&[Row]> {
        let write = self.is_write();
        if write && self.state != QueryState::Built {
            return Err(OrmError::AlreadyExecuted(
                self.kind().to_string(),
                self.table.clone(),
            ));
        }

        let sql = self.sql_statement(db.backend())?;
        let context = format!("{} on '{}'", self.kind(), self.table);
        debug!(sql = %sql, table = %self.table, write, "running statement");

        let schema = db.registry().table(&self.table).ok();
        if write && !self.returns_rows(db.backend()) {
            let _guard = db.lock_writes().await;
            let result = sqlx::query(&sql)
                .execute(db.pool())
                .await
                .map_err(|e| OrmError::database(&context, e))?;
            self.rows.clear();
            self.rows_affected = result.rows_affected();
        } else {
            let _guard = if write {
                Some(db.lock_writes().await)
            } else {
                None
            };
            let fetched = sqlx::query(&sql)
                .fetch_all(db.pool())
                .await
                .map_err(|e| OrmError::database(&context, e))?;
            self.rows = fetched
                .iter()
                .map(|row| Row::decode(&self.table, schema, row))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| OrmError::database(&context, e))?;
            self.rows_affected = u64::try_from(self.rows.len()).unwrap_or(u64::MAX);
        }

        self.state = QueryState::Executed;
        Ok(&self.rows)
    }

    /// Returns the rows changed by a write, or fetched by a read.
    #[must_use]
    pub const fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Hands out the held rows.
    pub fn take_rows(&mut self) -> Vec<Row> {
        if self.state == QueryState::Executed {
            self.state = QueryState::Consumed;
        }
        std::mem::take(&mut self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_lite_core::backend::SqliteBackend;
    use oxide_lite_core::nodes::{DeleteNode, OrderByNode, SelectNode};

    #[test]
    fn test_read_statement_assembly() {
        let query = Query::new("celebrity")
            .node(OrderByNode::new(&["-name"]).unwrap())
            .node(SelectNode::new("celebrity").unwrap());
        assert!(!query.is_write());
        assert_eq!(
            query.sql_statement(&SqliteBackend::new()).unwrap(),
            "SELECT * FROM celebrity ORDER BY name DESC"
        );
        assert_eq!(query.state(), QueryState::Built);
    }

    #[test]
    fn test_write_must_stand_alone() {
        let query = Query::new("celebrity")
            .node(DeleteNode::new("celebrity").unwrap())
            .node(SelectNode::new("celebrity").unwrap());
        assert!(query.is_write());
        assert!(matches!(
            query.sql_statement(&SqliteBackend::new()),
            Err(OrmError::Core(CoreError::Structure(_)))
        ));
    }

    #[test]
    fn test_raw_statement() {
        let query = Query::new("celebrity").node(Node::Raw(String::from("SELECT  1")));
        assert_eq!(
            query.sql_statement(&SqliteBackend::new()).unwrap(),
            "SELECT 1"
        );
    }
}
