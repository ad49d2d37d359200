//! Window functions.
//!
//! A [`Window`] is an expression and can be annotated like any other:
//!
//! ```rust
//! use oxide_lite_core::prelude::*;
//!
//! let window = rank(col("height").unwrap()).partition_by(col("name").unwrap());
//! assert_eq!(
//!     Expr::from(window).to_sql(&SqliteBackend::new()),
//!     "rank() OVER (PARTITION BY name ORDER BY height ASC)"
//! );
//! ```

use crate::backend::Backend;
use crate::error::{CoreError, Result};
use crate::expression::Expr;
use crate::nodes::{OrderByNode, OrderDirection};
use crate::value::OutputType;

/// The function evaluated over each window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowFunc {
    /// `rank()`
    Rank,
    /// `dense_rank()`
    DenseRank,
    /// `percent_rank()`
    PercentRank,
    /// `cume_dist()`
    CumeDist,
    /// `row_number()`
    RowNumber,
    /// `ntile(n)`
    NTile(u32),
    /// `lag(expr, offset)`
    Lag(Box<Expr>, u32),
    /// `lead(expr, offset)`
    Lead(Box<Expr>, u32),
    /// `first_value(expr)`
    FirstValue(Box<Expr>),
    /// `last_value(expr)`
    LastValue(Box<Expr>),
    /// `nth_value(expr, n)`
    NthValue(Box<Expr>, u32),
}

impl WindowFunc {
    fn argument(&self) -> Option<&Expr> {
        match self {
            Self::Lag(expr, _)
            | Self::Lead(expr, _)
            | Self::FirstValue(expr)
            | Self::LastValue(expr)
            | Self::NthValue(expr, _) => Some(&**expr),
            _ => None,
        }
    }

    fn output_type(&self) -> Option<OutputType> {
        match self {
            Self::Rank | Self::DenseRank | Self::RowNumber | Self::NTile(_) => {
                Some(OutputType::Integer)
            }
            Self::PercentRank | Self::CumeDist => Some(OutputType::Float),
            other => other.argument().and_then(Expr::output_type),
        }
    }

    fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::Rank => String::from("rank()"),
            Self::DenseRank => String::from("dense_rank()"),
            Self::PercentRank => String::from("percent_rank()"),
            Self::CumeDist => String::from("cume_dist()"),
            Self::RowNumber => String::from("row_number()"),
            Self::NTile(buckets) => format!("ntile({buckets})"),
            Self::Lag(expr, offset) => format!("lag({}, {offset})", expr.to_sql(backend)),
            Self::Lead(expr, offset) => format!("lead({}, {offset})", expr.to_sql(backend)),
            Self::FirstValue(expr) => format!("first_value({})", expr.to_sql(backend)),
            Self::LastValue(expr) => format!("last_value({})", expr.to_sql(backend)),
            Self::NthValue(expr, n) => format!("nth_value({}, {n})", expr.to_sql(backend)),
        }
    }
}

/// `func OVER (PARTITION BY ... ORDER BY ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    func: WindowFunc,
    partition_by: Vec<Expr>,
    order_by: Vec<(Expr, OrderDirection)>,
}

impl Window {
    /// Creates a window over the whole result, `OVER ()`.
    #[must_use]
    pub const fn new(func: WindowFunc) -> Self {
        Self {
            func,
            partition_by: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Adds a partition expression.
    #[must_use]
    pub fn partition_by(mut self, expr: impl Into<Expr>) -> Self {
        self.partition_by.push(expr.into());
        self
    }

    /// Adds an ordering expression.
    #[must_use]
    pub fn order_by(mut self, expr: impl Into<Expr>, direction: OrderDirection) -> Self {
        self.order_by.push((expr.into(), direction));
        self
    }

    /// Adds orderings written as field names; a leading `-` sorts descending.
    pub fn ordered(mut self, fields: &[&str]) -> Result<Self> {
        let node = OrderByNode::new(fields)?;
        self.order_by.extend(
            node.fields()
                .iter()
                .map(|(column, direction)| (Expr::from(column.clone()), *direction)),
        );
        Ok(self)
    }

    /// Returns the window function.
    #[must_use]
    pub const fn func(&self) -> &WindowFunc {
        &self.func
    }

    /// Returns the output type when it is known.
    #[must_use]
    pub fn output_type(&self) -> Option<OutputType> {
        self.func.output_type()
    }

    pub(crate) fn contains_aggregate(&self) -> bool {
        self.func
            .argument()
            .into_iter()
            .chain(&self.partition_by)
            .chain(self.order_by.iter().map(|(expr, _)| expr))
            .any(Expr::contains_aggregate)
    }

    /// Renders the window expression.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let mut clauses = Vec::new();
        if !self.partition_by.is_empty() {
            let partitions: Vec<String> =
                self.partition_by.iter().map(|expr| expr.to_sql(backend)).collect();
            clauses.push(format!("PARTITION BY {}", partitions.join(", ")));
        }
        if !self.order_by.is_empty() {
            let orderings: Vec<String> = self
                .order_by
                .iter()
                .map(|(expr, direction)| format!("{} {}", expr.to_sql(backend), direction.as_str()))
                .collect();
            clauses.push(format!("ORDER BY {}", orderings.join(", ")));
        }
        format!("{} OVER ({})", self.func.to_sql(backend), clauses.join(" "))
    }
}

fn ranked(func: WindowFunc, order: impl Into<Expr>) -> Window {
    Window::new(func).order_by(order, OrderDirection::Asc)
}

fn positive(name: &str, n: u32) -> Result<u32> {
    if n == 0 {
        return Err(CoreError::Structure(format!("{name}() needs a positive argument")));
    }
    Ok(n)
}

/// `rank()` ordered by `order`.
pub fn rank(order: impl Into<Expr>) -> Window {
    ranked(WindowFunc::Rank, order)
}

/// `dense_rank()` ordered by `order`.
pub fn dense_rank(order: impl Into<Expr>) -> Window {
    ranked(WindowFunc::DenseRank, order)
}

/// `percent_rank()` ordered by `order`.
pub fn percent_rank(order: impl Into<Expr>) -> Window {
    ranked(WindowFunc::PercentRank, order)
}

/// `cume_dist()` ordered by `order`.
pub fn cume_dist(order: impl Into<Expr>) -> Window {
    ranked(WindowFunc::CumeDist, order)
}

/// `row_number()` ordered by `order`.
pub fn row_number(order: impl Into<Expr>) -> Window {
    ranked(WindowFunc::RowNumber, order)
}

/// `ntile(buckets)` ordered by `order`.
pub fn ntile(buckets: u32, order: impl Into<Expr>) -> Result<Window> {
    Ok(ranked(WindowFunc::NTile(positive("ntile", buckets)?), order))
}

/// The value of `expr` `offset` rows before the current one.
pub fn lag(expr: impl Into<Expr>, offset: u32) -> Window {
    Window::new(WindowFunc::Lag(Box::new(expr.into()), offset))
}

/// The value of `expr` `offset` rows after the current one.
pub fn lead(expr: impl Into<Expr>, offset: u32) -> Window {
    Window::new(WindowFunc::Lead(Box::new(expr.into()), offset))
}

/// The value of `expr` on the first row of the window.
pub fn first_value(expr: impl Into<Expr>) -> Window {
    Window::new(WindowFunc::FirstValue(Box::new(expr.into())))
}

/// The value of `expr` on the last row of the window.
pub fn last_value(expr: impl Into<Expr>) -> Window {
    Window::new(WindowFunc::LastValue(Box::new(expr.into())))
}

/// The value of `expr` on the `n`th row of the window, counting from 1.
pub fn nth_value(expr: impl Into<Expr>, n: u32) -> Result<Window> {
    Ok(Window::new(WindowFunc::NthValue(
        Box::new(expr.into()),
        positive("nth_value", n)?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::backend::SqliteBackend;
    use crate::expression::{col, length};

    fn render(window: Window) -> String {
        Expr::from(window).to_sql(&SqliteBackend::new())
    }

    #[test]
    fn test_ranking_orders_by_its_argument() {
        assert_eq!(render(rank(col("age").unwrap())), "rank() OVER (ORDER BY age ASC)");
        assert_eq!(
            render(rank(length(col("name").unwrap()))),
            "rank() OVER (ORDER BY length(name) ASC)"
        );
        assert_eq!(
            render(cume_dist(col("age").unwrap()).partition_by(col("age").unwrap())),
            "cume_dist() OVER (PARTITION BY age ORDER BY age ASC)"
        );
        assert_eq!(
            render(ntile(4, col("height").unwrap()).unwrap()),
            "ntile(4) OVER (ORDER BY height ASC)"
        );
    }

    #[test]
    fn test_value_functions() {
        let window = lag(col("height").unwrap(), 1).ordered(&["-height"]).unwrap();
        assert_eq!(render(window), "lag(height, 1) OVER (ORDER BY height DESC)");
        assert_eq!(
            render(first_value(col("name").unwrap())),
            "first_value(name) OVER ()"
        );
        assert_eq!(
            render(
                nth_value(col("name").unwrap(), 2)
                    .unwrap()
                    .order_by(col("id").unwrap(), OrderDirection::Asc)
            ),
            "nth_value(name, 2) OVER (ORDER BY id ASC)"
        );
    }

    #[test]
    fn test_zero_arguments_are_rejected() {
        assert!(matches!(
            ntile(0, col("age").unwrap()),
            Err(CoreError::Structure(_))
        ));
        assert!(nth_value(col("age").unwrap(), 0).is_err());
    }

    #[test]
    fn test_output_types() {
        assert_eq!(
            rank(col("age").unwrap()).output_type(),
            Some(OutputType::Integer)
        );
        assert_eq!(
            percent_rank(col("age").unwrap()).output_type(),
            Some(OutputType::Float)
        );
        assert_eq!(lead(Expr::from("x"), 1).output_type(), Some(OutputType::Text));
        assert_eq!(last_value(col("age").unwrap()).output_type(), None);
    }

    #[test]
    fn test_aggregates_inside_windows_are_detected() {
        assert!(!Expr::from(row_number(col("age").unwrap())).contains_aggregate());
        let window = dense_rank(Aggregate::sum(col("price").unwrap()));
        assert!(Expr::from(window).contains_aggregate());
    }
}
