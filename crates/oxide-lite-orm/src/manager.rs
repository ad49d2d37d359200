//! Table managers.
//!
//! A [`Manager`] is the entry point for one table: it hands out query sets
//! and creates rows. Every method delegates to [`QuerySet`] or [`Query`].

use oxide_lite_core::nodes::InsertNode;
use oxide_lite_core::prelude::*;

use crate::database::Database;
use crate::error::{OrmError, Result};
use crate::query::Query;
use crate::queryset::QuerySet;
use crate::row::Row;

/// Database access for one table.
///
/// # Example
///
/// ```ignore
/// let celebrities = db.objects("celebrity")?;
/// let kendall = celebrities
///     .create(&[("name", "Kendall".into()), ("height", 178.into())])
///     .await?;
/// let tall = celebrities.filter(Q::lookup("height__gt", 175))?.count().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Manager {
    db: Database,
    table: String,
}

fn lookup_of(values: &[(&str, SqlValue)]) -> Q {
    values
        .iter()
        .fold(Q::new(), |q, (column, value)| q.add(column, value.clone()))
}

impl Manager {
    pub(crate) fn new(db: Database, table: &str) -> Self {
        Self {
            db,
            table: table.to_string(),
        }
    }

    /// Returns the managed table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns a query set over every row.
    pub fn all(&self) -> Result<QuerySet> {
        QuerySet::new(self.db.clone(), &self.table)
    }

    /// Returns the rows matching `q`.
    pub fn filter(&self, q: Q) -> Result<QuerySet> {
        self.all()?.filter(q)
    }

    /// Returns the rows not matching `q`.
    pub fn exclude(&self, q: Q) -> Result<QuerySet> {
        self.all()?.exclude(q)
    }

    /// Returns every row in the given order.
    pub fn order_by(&self, fields: &[&str]) -> Result<QuerySet> {
        self.all()?.order_by(fields)
    }

    /// Returns every row with a computed column.
    pub fn annotate(&self, alias: &str, expr: impl Into<Expr>) -> Result<QuerySet> {
        self.all()?.annotate(alias, expr)
    }

    /// Returns the single row matching `q`.
    pub async fn get(&self, q: Q) -> Result<Row> {
        let matching = self.filter(q)?.limit(2);
        let rows = matching.fetch().await?;
        match rows {
            [row] => Ok(row.clone()),
            [] => Err(OrmError::NotFound(self.table.clone())),
            _ => Err(OrmError::MultipleObjectsReturned(self.table.clone(), rows.len())),
        }
    }

    /// Returns the first row.
    pub async fn first(&self) -> Result<Option<Row>> {
        Ok(self.all()?.limit(1).first().await?.cloned())
    }

    /// Returns the row with the highest primary key.
    pub async fn last(&self) -> Result<Option<Row>> {
        let schema = self.db.registry().table(&self.table)?;
        let descending = format!("-{}", schema.primary_key());
        Ok(self
            .order_by(&[descending.as_str()])?
            .limit(1)
            .first()
            .await?
            .cloned())
    }

    /// Counts every row.
    pub async fn count(&self) -> Result<u64> {
        self.all()?.count().await
    }

    /// Computes aggregates over every row.
    pub async fn aggregate(&self, aggregates: &[Aggregate]) -> Result<Vec<(String, SqlValue)>> {
        self.all()?.aggregate(aggregates).await
    }

    /// Inserts one row and returns it as stored.
    pub async fn create(&self, values: &[(&str, SqlValue)]) -> Result<Row> {
        self.bulk_create(&[values.to_vec()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::NotFound(self.table.clone()))
    }

    /// Inserts several rows in one statement. Every row must name the same
    /// columns.
    pub async fn bulk_create(&self, rows: &[Vec<(&str, SqlValue)>]) -> Result<Vec<Row>> {
        let schema = self.db.registry().table(&self.table)?;
        let prepared = rows
            .iter()
            .map(|row| {
                schema.prepare_values(
                    row.iter()
                        .map(|(column, value)| ((*column).to_string(), value.clone()))
                        .collect(),
                )
            })
            .collect::<oxide_lite_core::Result<Vec<_>>>()?;
        let node = InsertNode::new(&self.table, prepared)?.returning(&["*"]);
        let mut query = Query::new(&self.table).node(node);
        query.run(&self.db).await?;
        Ok(query.take_rows())
    }

    /// Returns the row matching `lookup`, creating it from `lookup` and
    /// `defaults` when there is none. The flag is `true` when created.
    pub async fn get_or_create(
        &self,
        lookup: &[(&str, SqlValue)],
        defaults: &[(&str, SqlValue)],
    ) -> Result<(Row, bool)> {
        match self.get(lookup_of(lookup)).await {
            Ok(row) => Ok((row, false)),
            Err(OrmError::NotFound(_)) => {
                let mut values = lookup.to_vec();
                values.extend_from_slice(defaults);
                Ok((self.create(&values).await?, true))
            }
            Err(other) => Err(other),
        }
    }

    /// Updates the row matching `lookup` with `defaults`, creating it when
    /// there is none. The flag is `true` when created.
    pub async fn update_or_create(
        &self,
        lookup: &[(&str, SqlValue)],
        defaults: &[(&str, SqlValue)],
    ) -> Result<(Row, bool)> {
        match self.get(lookup_of(lookup)).await {
            Ok(mut row) => {
                for (column, value) in defaults {
                    row.set(column, value.clone())?;
                }
                row.save(&self.db).await?;
                Ok((row, false))
            }
            Err(OrmError::NotFound(_)) => {
                let mut values = lookup.to_vec();
                values.extend_from_slice(defaults);
                Ok((self.create(&values).await?, true))
            }
            Err(other) => Err(other),
        }
    }
}
