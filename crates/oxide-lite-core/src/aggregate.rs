//! Aggregate functions.
//!
//! `Count`, `Sum`, `Avg`, `Max` and `Min` are rendered into SQL and computed
//! by the engine. The statistics (`Variance`, `StDev`, `MeanAbsoluteDifference`,
//! `CoefficientOfVariation`) are computed locally from fetched column values.

use crate::backend::Backend;
use crate::expression::Column;
use crate::value::OutputType;

/// The function applied by an [`Aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    /// `COUNT`
    Count,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
    /// `MAX`
    Max,
    /// `MIN`
    Min,
    /// Population variance, computed locally.
    Variance,
    /// Population standard deviation, computed locally.
    StDev,
    /// Mean absolute difference from the mean, computed locally.
    MeanAbsoluteDifference,
    /// Mean absolute difference divided by the mean, computed locally.
    CoefficientOfVariation,
}

impl AggregateFunc {
    /// Returns whether the function is computed outside the engine.
    #[must_use]
    pub const fn is_local(self) -> bool {
        matches!(
            self,
            Self::Variance | Self::StDev | Self::MeanAbsoluteDifference | Self::CoefficientOfVariation
        )
    }

    /// Returns the lowercase name used for default aliases (`price__avg`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
            Self::Min => "min",
            Self::Variance => "variance",
            Self::StDev => "stdev",
            Self::MeanAbsoluteDifference => "meanabsdifference",
            Self::CoefficientOfVariation => "coefficientofvariation",
        }
    }
}

/// An aggregate over a column, or over all rows for `COUNT(*)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aggregate {
    func: AggregateFunc,
    column: Option<Column>,
    distinct: bool,
}

impl Aggregate {
    fn over(func: AggregateFunc, column: Column) -> Self {
        Self {
            func,
            column: Some(column),
            distinct: false,
        }
    }

    /// Creates a COUNT(*) aggregate.
    #[must_use]
    pub const fn count_all() -> Self {
        Self {
            func: AggregateFunc::Count,
            column: None,
            distinct: false,
        }
    }

    /// Creates a COUNT(column) aggregate.
    #[must_use]
    pub fn count(column: Column) -> Self {
        Self::over(AggregateFunc::Count, column)
    }

    /// Creates a COUNT(DISTINCT column) aggregate.
    #[must_use]
    pub fn count_distinct(column: Column) -> Self {
        Self {
            distinct: true,
            ..Self::over(AggregateFunc::Count, column)
        }
    }

    /// Creates a SUM(column) aggregate.
    #[must_use]
    pub fn sum(column: Column) -> Self {
        Self::over(AggregateFunc::Sum, column)
    }

    /// Creates an AVG(column) aggregate.
    #[must_use]
    pub fn avg(column: Column) -> Self {
        Self::over(AggregateFunc::Avg, column)
    }

    /// Creates a MAX(column) aggregate.
    #[must_use]
    pub fn max(column: Column) -> Self {
        Self::over(AggregateFunc::Max, column)
    }

    /// Creates a MIN(column) aggregate.
    #[must_use]
    pub fn min(column: Column) -> Self {
        Self::over(AggregateFunc::Min, column)
    }

    /// Population variance of a column.
    #[must_use]
    pub fn variance(column: Column) -> Self {
        Self::over(AggregateFunc::Variance, column)
    }

    /// Population standard deviation of a column.
    #[must_use]
    pub fn stdev(column: Column) -> Self {
        Self::over(AggregateFunc::StDev, column)
    }

    /// Mean absolute difference of a column.
    #[must_use]
    pub fn mean_absolute_difference(column: Column) -> Self {
        Self::over(AggregateFunc::MeanAbsoluteDifference, column)
    }

    /// Coefficient of variation of a column.
    #[must_use]
    pub fn coefficient_of_variation(column: Column) -> Self {
        Self::over(AggregateFunc::CoefficientOfVariation, column)
    }

    /// Returns the aggregate function.
    #[must_use]
    pub const fn func(&self) -> AggregateFunc {
        self.func
    }

    /// Returns the aggregated column, `None` for `COUNT(*)`.
    #[must_use]
    pub const fn column(&self) -> Option<&Column> {
        self.column.as_ref()
    }

    /// Returns the default alias, e.g. `price__avg` or `count`.
    #[must_use]
    pub fn default_alias(&self) -> String {
        match &self.column {
            Some(column) => format!("{}__{}", column.name(), self.func.name()),
            None => self.func.name().to_string(),
        }
    }

    /// Returns the output type of the aggregate.
    #[must_use]
    pub const fn output_type(&self) -> Option<OutputType> {
        match self.func {
            AggregateFunc::Count => Some(OutputType::Integer),
            AggregateFunc::Sum | AggregateFunc::Max | AggregateFunc::Min => None,
            _ => Some(OutputType::Float),
        }
    }

    /// Returns the SQL representation of this aggregate.
    ///
    /// Local statistics have no SQL form; they render the bare column so the
    /// executor can fetch the values to aggregate.
    #[must_use]
    pub fn to_sql(&self, _backend: &dyn Backend) -> String {
        let target = self
            .column
            .as_ref()
            .map_or_else(|| String::from("*"), Column::to_sql);
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        match self.func {
            AggregateFunc::Count => format!("COUNT({distinct}{target})"),
            AggregateFunc::Sum => format!("SUM({distinct}{target})"),
            AggregateFunc::Avg => format!("AVG({distinct}{target})"),
            AggregateFunc::Max => format!("MAX({target})"),
            AggregateFunc::Min => format!("MIN({target})"),
            _ => target,
        }
    }

    /// Computes a local statistic over the given values.
    ///
    /// Returns `None` for engine aggregates and for an empty input.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute_local(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() || !self.func.is_local() {
            return None;
        }
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = || values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
        let mean_absolute_difference =
            || values.iter().map(|v| (v - mean).abs()).sum::<f64>() / count;

        match self.func {
            AggregateFunc::Variance => Some(variance()),
            AggregateFunc::StDev => Some(variance().sqrt()),
            AggregateFunc::MeanAbsoluteDifference => Some(mean_absolute_difference()),
            AggregateFunc::CoefficientOfVariation => {
                if mean == 0.0 {
                    None
                } else {
                    Some(mean_absolute_difference() / mean)
                }
            }
            _ => None,
        }
    }
}
