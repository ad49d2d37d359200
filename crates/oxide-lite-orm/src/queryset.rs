//! Lazy, chainable result sets.
//!
//! Chaining (`filter`, `exclude`, `annotate`, `order_by`, `only`, `distinct`,
//! `limit`, `offset`) clones the node list, appends a node and returns a new
//! [`QuerySet`]; nothing touches storage. The first terminal operation runs
//! the select once and caches the rows for every later one.

use oxide_lite_core::nodes::{
    DeleteNode, GroupByNode, LimitNode, Node, OrderByNode, Projection, SelectMap, SelectNode,
    UpdateNode, WhereNode, WriteFilter,
};
use oxide_lite_core::prelude::*;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::database::Database;
use crate::error::{OrmError, Result};
use crate::query::Query;
use crate::row::Row;

/// A lazy result set over one table.
///
/// # Example
///
/// ```ignore
/// let adults = db
///     .objects("celebrity")?
///     .filter(Q::lookup("age__gte", 18))?
///     .order_by(&["-followers"])?
///     .limit(10);
///
/// // Nothing ran yet.
/// println!("{}", adults.sql_statement()?);
///
/// for row in adults.fetch().await? {
///     println!("{row}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct QuerySet {
    db: Database,
    table: String,
    nodes: Vec<Node>,
    /// The ORDER BY in `nodes` comes from the table declaration.
    default_ordering: bool,
    cache: OnceCell<Vec<Row>>,
    count: OnceCell<u64>,
    exists: OnceCell<bool>,
}

impl QuerySet {
    /// Creates a result set over every row of `table`, in the table's
    /// declared ordering if it has one.
    pub fn new(db: Database, table: &str) -> Result<Self> {
        let schema = db.registry().table(table)?;
        let mut nodes = vec![Node::from(SelectNode::new(table)?)];
        let default_ordering = !schema.ordering().is_empty();
        if default_ordering {
            let fields: Vec<&str> = schema.ordering().iter().map(String::as_str).collect();
            nodes.push(Node::from(OrderByNode::new(&fields)?));
        }
        Ok(Self {
            db,
            table: table.to_string(),
            nodes,
            default_ordering,
            cache: OnceCell::new(),
            count: OnceCell::new(),
            exists: OnceCell::new(),
        })
    }

    fn derive(&self, nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut all = self.nodes.clone();
        all.extend(nodes);
        Self {
            db: self.db.clone(),
            table: self.table.clone(),
            nodes: all,
            default_ordering: self.default_ordering,
            cache: OnceCell::new(),
            count: OnceCell::new(),
            exists: OnceCell::new(),
        }
    }

    fn schema(&self) -> Result<&Table> {
        Ok(self.db.registry().table(&self.table)?)
    }

    fn select(&self) -> Result<SelectNode> {
        let current = self
            .nodes
            .iter()
            .rev()
            .find_map(|node| match node {
                Node::Select(select) => Some(select.clone()),
                _ => None,
            })
            .map_or_else(|| SelectNode::new(&self.table), Ok)?;
        Ok(current)
    }

    fn aliases(&self) -> Result<Vec<String>> {
        Ok(self
            .select()?
            .projections()
            .iter()
            .filter_map(|projection| match projection {
                Projection::Expr { alias, .. } => Some(alias.clone()),
                _ => None,
            })
            .collect())
    }

    fn filtered(&self, q: &Q) -> Result<Self> {
        let resolved = Resolver::new(self.db.registry(), &self.table)?.resolve(q)?;
        let mut nodes: Vec<Node> = resolved.joins.into_iter().map(Node::from).collect();
        if let Some(condition) = resolved.condition {
            nodes.push(Node::from(WhereNode::new(condition)));
        }
        Ok(self.derive(nodes))
    }

    /// Keeps the rows matching `q`. Relationship lookups add joins.
    pub fn filter(&self, q: Q) -> Result<Self> {
        self.filtered(&q)
    }

    /// Drops the rows matching `q`.
    pub fn exclude(&self, q: Q) -> Result<Self> {
        self.filtered(&!q)
    }

    /// Adds a computed column named `alias`.
    ///
    /// An aggregate groups the rows by primary key so it is computed per row
    /// over the joined tables.
    pub fn annotate(&self, alias: &str, expr: impl Into<Expr>) -> Result<Self> {
        let schema = self.schema()?;
        if schema.has_column(alias) || self.aliases()?.iter().any(|a| a == alias) {
            return Err(CoreError::Structure(format!(
                "annotation '{alias}' conflicts with a column of '{}'",
                self.table
            ))
            .into());
        }
        let expr = expr.into();
        let grouped = expr.contains_aggregate();
        let current = self.select()?;
        let mut projections = current.projections().to_vec();
        projections.push(Projection::aliased(expr, alias)?);

        let mut nodes = vec![Node::from(
            SelectNode::with_projections(&self.table, projections)?.distinct(current.is_distinct()),
        )];
        if grouped {
            let key = format!("{}.{}", self.table, schema.primary_key());
            nodes.push(Node::from(GroupByNode::new(&[key.as_str()])?));
        }
        Ok(self.derive(nodes))
    }

    /// Orders the rows; a leading `-` sorts descending. Repeated fields keep
    /// their first position and take the latest direction.
    ///
    /// The first explicit call replaces the table's declared ordering; later
    /// calls extend it.
    pub fn order_by(&self, fields: &[&str]) -> Result<Self> {
        let schema = self.schema()?;
        let aliases = self.aliases()?;
        for field in fields {
            let name = field.trim_start_matches('-');
            let known = name.contains('.')
                || schema.has_column(name)
                || aliases.iter().any(|alias| alias == name);
            if !known {
                return Err(CoreError::InvalidReference(format!(
                    "cannot order '{}' by '{name}'",
                    self.table
                ))
                .into());
            }
        }
        let order = Node::from(OrderByNode::new(fields)?);
        if !self.default_ordering {
            return Ok(self.derive([order]));
        }
        let mut ordered = self.derive([]);
        ordered.nodes.retain(|node| !matches!(node, Node::OrderBy(_)));
        ordered.nodes.push(order);
        ordered.default_ordering = false;
        Ok(ordered)
    }

    /// Selects only the given columns, keeping annotations.
    pub fn only(&self, columns: &[&str]) -> Result<Self> {
        let schema = self.schema()?;
        if let Some(missing) = columns.iter().find(|column| !schema.has_column(column)) {
            return Err(CoreError::InvalidReference(format!(
                "'{missing}' is not a column of '{}'",
                self.table
            ))
            .into());
        }
        let current = self.select()?;
        let mut projections: Vec<Projection> = columns
            .iter()
            .map(|column| Column::new(column).map(Projection::Column))
            .collect::<oxide_lite_core::Result<_>>()?;
        projections.extend(
            current
                .projections()
                .iter()
                .filter(|projection| matches!(projection, Projection::Expr { .. }))
                .cloned(),
        );
        Ok(self.derive([Node::from(
            SelectNode::with_projections(&self.table, projections)?.distinct(current.is_distinct()),
        )]))
    }

    /// Removes duplicate rows.
    pub fn distinct(&self) -> Result<Self> {
        Ok(self.derive([Node::from(self.select()?.distinct(true))]))
    }

    /// Returns at most `n` rows.
    #[must_use]
    pub fn limit(&self, n: u64) -> Self {
        self.derive([Node::from(LimitNode::new(Some(n), None))])
    }

    /// Skips the first `n` rows.
    #[must_use]
    pub fn offset(&self, n: u64) -> Self {
        self.derive([Node::from(LimitNode::new(None, Some(n)))])
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the accumulated nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns `true` once the rows are cached.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.cache.initialized()
    }

    /// Returns the nodes as they are executed. With joins, `*` becomes
    /// `table.*` and the table's own columns are qualified.
    fn compose(&self) -> Result<Vec<Node>> {
        let has_joins = self.nodes.iter().any(|node| matches!(node, Node::Join(_)));
        if !has_joins {
            return Ok(self.nodes.clone());
        }
        let schema = self.schema()?;
        let columns = schema.column_names();
        self.nodes
            .iter()
            .cloned()
            .map(|node| -> Result<Node> {
                Ok(match node {
                    Node::Select(select) => {
                        let projections = select
                            .projections()
                            .iter()
                            .map(|projection| match projection {
                                Projection::All => Projection::AllOf(self.table.clone()),
                                Projection::Column(column) if column.table().is_none() => {
                                    Projection::Column(column.clone().with_table(&self.table))
                                }
                                other => other.clone(),
                            })
                            .collect();
                        Node::from(
                            SelectNode::with_projections(&self.table, projections)?
                                .distinct(select.is_distinct()),
                        )
                    }
                    Node::Where(filter) => {
                        Node::from(WhereNode::new(filter.into_condition().qualified(&self.table)))
                    }
                    Node::OrderBy(order) => Node::from(order.qualified(&self.table, &columns)),
                    other => other,
                })
            })
            .collect()
    }

    fn map(&self) -> Result<SelectMap> {
        Ok(SelectMap::from_nodes(self.compose()?)?)
    }

    /// Returns the executor for the composed statement.
    pub fn query(&self) -> Result<Query> {
        Ok(Query::with_nodes(&self.table, self.compose()?))
    }

    /// Renders the composed statement without running it.
    pub fn sql_statement(&self) -> Result<String> {
        Ok(self.map()?.to_sql(self.db.backend())?)
    }

    /// Runs the select on first use and returns the cached rows.
    pub async fn fetch(&self) -> Result<&[Row]> {
        let rows = self
            .cache
            .get_or_try_init(|| async {
                let mut query = self.query()?;
                query.run(&self.db).await?;
                Ok::<_, OrmError>(query.take_rows())
            })
            .await?;
        Ok(rows)
    }

    /// Returns owned copies of every row.
    pub async fn all(&self) -> Result<Vec<Row>> {
        Ok(self.fetch().await?.to_vec())
    }

    /// Returns the row at `index` in result order.
    pub async fn get(&self, index: usize) -> Result<Option<&Row>> {
        Ok(self.fetch().await?.get(index))
    }

    /// Returns the first row.
    pub async fn first(&self) -> Result<Option<&Row>> {
        Ok(self.fetch().await?.first())
    }

    /// Returns the last row.
    pub async fn last(&self) -> Result<Option<&Row>> {
        Ok(self.fetch().await?.last())
    }

    async fn scalar(&self, sql: &str, kind: &str) -> Result<i64> {
        debug!(sql = %sql, table = %self.table, "running {kind}");
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| OrmError::database(format!("{kind} on '{}'", self.table), e))
    }

    /// Counts the rows, from the cache when the rows are already fetched.
    pub async fn count(&self) -> Result<u64> {
        if let Some(rows) = self.cache.get() {
            return Ok(u64::try_from(rows.len()).unwrap_or(u64::MAX));
        }
        let count = self
            .count
            .get_or_try_init(|| async {
                let sql = format!("SELECT COUNT(*) FROM ({})", self.sql_statement()?);
                let count = self.scalar(&sql, "count").await?;
                Ok::<_, OrmError>(u64::try_from(count).unwrap_or_default())
            })
            .await?;
        Ok(*count)
    }

    /// Returns whether any row matches, without fetching rows.
    pub async fn exists(&self) -> Result<bool> {
        if let Some(rows) = self.cache.get() {
            return Ok(!rows.is_empty());
        }
        let exists = self
            .exists
            .get_or_try_init(|| async {
                let sql = format!("SELECT EXISTS({})", self.sql_statement()?);
                Ok::<_, OrmError>(self.scalar(&sql, "exists").await? != 0)
            })
            .await?;
        Ok(*exists)
    }

    /// Returns `(column, value)` pairs of the given columns for every row.
    pub async fn values(&self, columns: &[&str]) -> Result<Vec<Vec<(String, SqlValue)>>> {
        let projected = self.only(columns)?;
        let rows = projected.fetch().await?;
        Ok(rows.iter().cloned().map(Row::into_pairs).collect())
    }

    async fn fetch_statement(&self, sql: &str, kind: &str) -> Result<Vec<Row>> {
        debug!(sql = %sql, table = %self.table, "running {kind}");
        let context = format!("{kind} on '{}'", self.table);
        let fetched = sqlx::query(sql)
            .fetch_all(self.db.pool())
            .await
            .map_err(|e| OrmError::database(&context, e))?;
        fetched
            .iter()
            .map(|row| Row::decode(&self.table, None, row))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| OrmError::database(&context, e))
    }

    /// Computes aggregates over the matching rows.
    ///
    /// Engine aggregates run as one statement; variance, standard
    /// deviation, mean absolute difference and coefficient of variation are
    /// computed from the fetched column values. Results are named by
    /// [`Aggregate::default_alias`] and follow the input order.
    pub async fn aggregate(&self, aggregates: &[Aggregate]) -> Result<Vec<(String, SqlValue)>> {
        let inner = self.sql_statement()?;
        let backend = self.db.backend();
        let mut results: Vec<(String, SqlValue)> = aggregates
            .iter()
            .map(|aggregate| (aggregate.default_alias(), SqlValue::Null))
            .collect();

        let engine: Vec<(usize, String)> = aggregates
            .iter()
            .enumerate()
            .filter(|(_, aggregate)| !aggregate.func().is_local())
            .map(|(position, aggregate)| {
                (
                    position,
                    format!("{} AS {}", aggregate.to_sql(backend), aggregate.default_alias()),
                )
            })
            .collect();
        if !engine.is_empty() {
            let projections: Vec<&str> = engine.iter().map(|(_, sql)| sql.as_str()).collect();
            let sql = format!("SELECT {} FROM ({inner})", projections.join(", "));
            if let Some(row) = self.fetch_statement(&sql, "aggregate").await?.into_iter().next() {
                for ((position, _), value) in engine.iter().zip(row.values()) {
                    results[*position].1 = value.clone();
                }
            }
        }

        for (position, aggregate) in aggregates.iter().enumerate() {
            if !aggregate.func().is_local() {
                continue;
            }
            let column = aggregate.column().ok_or_else(|| {
                CoreError::Structure(format!("{} needs a column", aggregate.func().name()))
            })?;
            let sql = format!("SELECT {} FROM ({inner})", column.name());
            let samples: Vec<f64> = self
                .fetch_statement(&sql, "aggregate")
                .await?
                .iter()
                .filter_map(|row| row.values().first().and_then(SqlValue::as_f64))
                .collect();
            results[position].1 = aggregate
                .compute_local(&samples)
                .map_or(SqlValue::Null, SqlValue::Float);
        }
        Ok(results)
    }

    /// Restricts a write to the matching rows. Joins or a limit need a
    /// `key IN (...)` subquery since UPDATE and DELETE cannot join.
    fn write_filter(&self) -> Result<Option<WriteFilter>> {
        let map = self.map()?;
        if map.joins().is_empty() && map.limit().is_none() {
            return Ok(map
                .filter()
                .map(|filter| WriteFilter::Condition(filter.condition().clone())));
        }
        let schema = self.schema()?;
        let mut nodes = self.compose()?;
        nodes.push(Node::from(SelectNode::with_projections(
            &self.table,
            vec![Projection::Column(Column::qualified(
                &self.table,
                schema.primary_key(),
            )?)],
        )?));
        let select = SelectMap::from_nodes(nodes)?.to_sql(self.db.backend())?;
        Ok(Some(WriteFilter::Ids {
            key: schema.primary_key().to_string(),
            select,
        }))
    }

    /// Updates the matching rows and returns how many changed.
    pub async fn update(&self, assignments: Vec<(&str, Expr)>) -> Result<u64> {
        let schema = self.schema()?;
        if let Some((missing, _)) = assignments.iter().find(|(column, _)| !schema.has_column(column)) {
            return Err(CoreError::InvalidReference(format!(
                "'{missing}' is not a column of '{}'",
                self.table
            ))
            .into());
        }
        let assignments = assignments
            .into_iter()
            .map(|(column, expr)| (column.to_string(), expr))
            .collect();
        let node = UpdateNode::new(&self.table, assignments)?.filter(self.write_filter()?);
        let mut query = Query::new(&self.table).node(node);
        query.run(&self.db).await?;
        Ok(query.rows_affected())
    }

    /// Deletes the matching rows and returns how many went.
    pub async fn delete(&self) -> Result<u64> {
        let node = DeleteNode::new(&self.table)?.filter(self.write_filter()?);
        let mut query = Query::new(&self.table).node(node);
        query.run(&self.db).await?;
        Ok(query.rows_affected())
    }
}
