//! Lookup vocabulary and single-column conditions.
//!
//! A filter key such as `age__gt` names a column and a [`Lookup`]. Paired with
//! an [`Operand`] it becomes a [`Condition`], the leaf of every condition tree.

use std::fmt;

use crate::backend::{Backend, DatePart};
use crate::error::{CoreError, Result};
use crate::expression::{Column, Expr};
use crate::value::{SqlValue, ToSqlValue};

/// Separator between the parts of a filter key.
pub const LOOKUP_SEPARATOR: &str = "__";

/// A filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// `=`, or `IS NULL` against a null operand.
    Exact,
    /// Case-insensitive equality.
    IExact,
    /// `LIKE '%v%'`
    Contains,
    /// Case-insensitive `LIKE '%v%'`.
    IContains,
    /// `LIKE 'v%'`
    StartsWith,
    /// `LIKE '%v'`
    EndsWith,
    /// `IN (...)`
    In,
    /// `BETWEEN a AND b`
    Range,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `!=`
    Ne,
    /// `IS NULL` / `IS NOT NULL`
    IsNull,
    /// `REGEXP`
    Regex,
    /// Year of a date column.
    Year,
    /// Month of a date column.
    Month,
    /// Day of a date column.
    Day,
    /// Hour of a datetime column.
    Hour,
    /// Minute of a datetime column.
    Minute,
}

impl Lookup {
    /// Parses a lookup token. `eq` is accepted as an alias of `exact`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let lookup = match token {
            "exact" | "eq" => Self::Exact,
            "iexact" => Self::IExact,
            "contains" => Self::Contains,
            "icontains" => Self::IContains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "in" => Self::In,
            "range" => Self::Range,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "ne" => Self::Ne,
            "isnull" => Self::IsNull,
            "regex" => Self::Regex,
            "year" => Self::Year,
            "month" => Self::Month,
            "day" => Self::Day,
            "hour" => Self::Hour,
            "minute" => Self::Minute,
            _ => return None,
        };
        Some(lookup)
    }

    /// Returns the token naming this lookup.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::In => "in",
            Self::Range => "range",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Ne => "ne",
            Self::IsNull => "isnull",
            Self::Regex => "regex",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
        }
    }

    /// Returns the date part for the date lookups.
    #[must_use]
    pub const fn date_part(self) -> Option<DatePart> {
        match self {
            Self::Year => Some(DatePart::Year),
            Self::Month => Some(DatePart::Month),
            Self::Day => Some(DatePart::Day),
            Self::Hour => Some(DatePart::Hour),
            Self::Minute => Some(DatePart::Minute),
            _ => None,
        }
    }

    const fn comparison_operator(self) -> Option<&'static str> {
        match self {
            Self::Exact => Some("="),
            Self::Ne => Some("!="),
            Self::Gt => Some(">"),
            Self::Gte => Some(">="),
            Self::Lt => Some("<"),
            Self::Lte => Some("<="),
            _ => None,
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal.
    Value(SqlValue),
    /// A list of literals, for `in` and `range`.
    List(Vec<SqlValue>),
    /// Another column, for column-to-column comparisons.
    Column(Column),
    /// A nested expression.
    Expr(Box<Expr>),
}

impl Operand {
    fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::Value(value) => backend.quote_value(value),
            Self::List(values) => values
                .iter()
                .map(|value| backend.quote_value(value))
                .collect::<Vec<_>>()
                .join(", "),
            Self::Column(column) => column.to_sql(),
            Self::Expr(expr) => expr.to_sql(backend),
        }
    }

    fn qualify(&mut self, table: &str) {
        if let Self::Column(column) = self {
            if column.table().is_none() {
                *column = column.clone().with_table(table);
            }
        }
    }
}

macro_rules! scalar_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Self::Value(value.to_sql_value())
                }
            }
        )*
    };
}

scalar_operand!(SqlValue, bool, i64, i32, u32, f64, &str, String, &String);

impl<T: ToSqlValue> From<Option<T>> for Operand {
    fn from(value: Option<T>) -> Self {
        Self::Value(value.to_sql_value())
    }
}

impl<T: ToSqlValue> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(ToSqlValue::to_sql_value).collect())
    }
}

impl<T: ToSqlValue, const N: usize> From<[T; N]> for Operand {
    fn from(values: [T; N]) -> Self {
        Self::List(values.into_iter().map(ToSqlValue::to_sql_value).collect())
    }
}

impl From<Column> for Operand {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

impl From<Expr> for Operand {
    fn from(expr: Expr) -> Self {
        match expr {
            Expr::Column(column) => Self::Column(column),
            other => Self::Expr(Box::new(other)),
        }
    }
}

/// A normalized `(column, operator, operand)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    column: Column,
    transform: Option<DatePart>,
    lookup: Lookup,
    operand: Operand,
}

impl Condition {
    /// Creates a condition, validating the operand against the lookup.
    ///
    /// A date lookup (`year`, `month`, ...) used as the operator becomes an
    /// exact comparison of the extracted part.
    pub fn new(column: Column, lookup: Lookup, operand: impl Into<Operand>) -> Result<Self> {
        match lookup.date_part() {
            Some(part) => Self::transformed(column, part, Lookup::Exact, operand),
            None => Self::build(column, None, lookup, operand.into()),
        }
    }

    /// Creates a condition comparing a date part of the column, as in
    /// `created__year__gte`.
    pub fn transformed(
        column: Column,
        part: DatePart,
        lookup: Lookup,
        operand: impl Into<Operand>,
    ) -> Result<Self> {
        if lookup.date_part().is_some() {
            return Err(CoreError::Structure(format!(
                "'{lookup}' cannot follow a date part"
            )));
        }
        Self::build(column, Some(part), lookup, operand.into())
    }

    fn build(
        column: Column,
        transform: Option<DatePart>,
        lookup: Lookup,
        operand: Operand,
    ) -> Result<Self> {
        match &operand {
            Operand::Value(value) => value.ensure_finite()?,
            Operand::List(values) => values.iter().try_for_each(SqlValue::ensure_finite)?,
            Operand::Column(_) | Operand::Expr(_) => {}
        }
        match (lookup, &operand) {
            (Lookup::In, Operand::List(_)) => {}
            (Lookup::In, _) => {
                return Err(CoreError::Structure(format!(
                    "'{}__in' needs a list of values",
                    column.name()
                )));
            }
            (Lookup::Range, Operand::List(values)) if values.len() == 2 => {}
            (Lookup::Range, _) => {
                return Err(CoreError::Structure(format!(
                    "'{}__range' needs exactly two values",
                    column.name()
                )));
            }
            (_, Operand::List(_)) => {
                return Err(CoreError::Structure(format!(
                    "'{}__{lookup}' does not accept a list",
                    column.name()
                )));
            }
            (Lookup::IsNull, Operand::Value(SqlValue::Bool(_))) => {}
            (Lookup::IsNull, _) => {
                return Err(CoreError::TypeMismatch(format!(
                    "'{}__isnull' needs a boolean",
                    column.name()
                )));
            }
            (
                Lookup::Contains | Lookup::IContains | Lookup::StartsWith | Lookup::EndsWith,
                Operand::Value(value),
            ) if value.as_plain_text().is_none() => {
                return Err(CoreError::TypeMismatch(format!(
                    "'{}__{lookup}' needs a textual value, got {value}",
                    column.name()
                )));
            }
            _ => {}
        }
        Ok(Self {
            column,
            transform,
            lookup,
            operand,
        })
    }

    /// Returns the column being filtered.
    #[must_use]
    pub const fn column(&self) -> &Column {
        &self.column
    }

    /// Returns the lookup.
    #[must_use]
    pub const fn lookup(&self) -> Lookup {
        self.lookup
    }

    /// Returns the operand.
    #[must_use]
    pub const fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Qualifies bare column references with `table`.
    pub(crate) fn qualify(&mut self, table: &str) {
        if self.column.table().is_none() {
            self.column = self.column.clone().with_table(table);
        }
        self.operand.qualify(table);
    }

    fn like_pattern(&self, backend: &dyn Backend, prefix: &str, suffix: &str) -> String {
        match &self.operand {
            Operand::Value(value) => {
                let text = value.as_plain_text().unwrap_or_default();
                backend.quote_value(&SqlValue::Text(format!("{prefix}{text}{suffix}")))
            }
            other => {
                let mut parts = Vec::new();
                if !prefix.is_empty() {
                    parts.push(format!("'{prefix}'"));
                }
                parts.push(other.to_sql(backend));
                if !suffix.is_empty() {
                    parts.push(format!("'{suffix}'"));
                }
                parts.join(" || ")
            }
        }
    }

    /// Renders the condition.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let column = self.column.to_sql();
        let lhs = match self.transform {
            Some(part) => backend.date_part(part, &column),
            None => column,
        };
        let null_operand = matches!(self.operand, Operand::Value(SqlValue::Null));

        match self.lookup {
            Lookup::Exact if null_operand => format!("{lhs} IS NULL"),
            Lookup::Ne if null_operand => format!("{lhs} IS NOT NULL"),
            Lookup::IExact => format!("lower({lhs}) = lower({})", self.operand.to_sql(backend)),
            Lookup::Contains => format!("{lhs} LIKE {}", self.like_pattern(backend, "%", "%")),
            Lookup::IContains => format!(
                "lower({lhs}) LIKE lower({})",
                self.like_pattern(backend, "%", "%")
            ),
            Lookup::StartsWith => format!("{lhs} LIKE {}", self.like_pattern(backend, "", "%")),
            Lookup::EndsWith => format!("{lhs} LIKE {}", self.like_pattern(backend, "%", "")),
            Lookup::In => format!("{lhs} IN ({})", self.operand.to_sql(backend)),
            Lookup::Range => match &self.operand {
                Operand::List(values) if values.len() == 2 => format!(
                    "{lhs} BETWEEN {} AND {}",
                    backend.quote_value(&values[0]),
                    backend.quote_value(&values[1])
                ),
                other => format!("{lhs} BETWEEN {}", other.to_sql(backend)),
            },
            Lookup::IsNull => {
                if matches!(self.operand, Operand::Value(SqlValue::Bool(false))) {
                    format!("{lhs} IS NOT NULL")
                } else {
                    format!("{lhs} IS NULL")
                }
            }
            Lookup::Regex => format!(
                "{lhs} {} {}",
                backend.regexp_operator(),
                self.operand.to_sql(backend)
            ),
            other => {
                let operator = other.comparison_operator().unwrap_or("=");
                format!("{lhs} {operator} {}", self.operand.to_sql(backend))
            }
        }
    }
}
