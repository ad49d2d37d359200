//! Expression model: column references, typed literals, `Case`/`When`,
//! scalar functions and arithmetic.
//!
//! Every type here is an immutable value. Composition returns new values and
//! nothing renders until a node asks for it through a [`Backend`].
//!
//! ```
//! use oxide_lite_core::prelude::*;
//!
//! let total = col("price").unwrap().mul(col("quantity").unwrap()).unwrap();
//! assert_eq!(total.to_sql(&SqliteBackend::new()), "(price * quantity)");
//! ```

use std::fmt;

use crate::aggregate::Aggregate;
use crate::backend::{Backend, DatePart};
use crate::condition::{Combined, Q};
use crate::error::{CoreError, Result};
use crate::resolver::Resolver;
use crate::value::{OutputType, SqlValue, ToSqlValue};
use crate::window::Window;

/// Keywords that cannot be used as bare column or table names.
const RESERVED: &[&str] = &[
    "add", "all", "alter", "and", "as", "asc", "between", "by", "case", "check", "column",
    "constraint", "create", "cross", "default", "delete", "desc", "distinct", "drop", "else",
    "end", "exists", "foreign", "from", "group", "having", "in", "index", "inner", "insert",
    "into", "is", "join", "key", "left", "like", "limit", "not", "null", "offset", "on", "or",
    "order", "primary", "references", "right", "select", "set", "table", "then", "union",
    "unique", "update", "values", "when", "where",
];

/// Validates a single identifier segment.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::InvalidReference(String::from("empty name")));
    }
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(CoreError::InvalidReference(format!(
            "'{name}' is not a valid identifier"
        )));
    }
    let lowered = name.to_ascii_lowercase();
    if RESERVED.contains(&lowered.as_str()) {
        return Err(CoreError::InvalidReference(format!(
            "'{name}' is a reserved keyword"
        )));
    }
    Ok(())
}

/// A reference to a column, optionally qualified by its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    table: Option<String>,
    name: String,
}

impl Column {
    /// Parses a bare (`name`) or dotted (`table.name`) column reference.
    pub fn new(reference: &str) -> Result<Self> {
        match reference.split_once('.') {
            Some((table, name)) => Self::qualified(table, name),
            None => {
                validate_identifier(reference)?;
                Ok(Self {
                    table: None,
                    name: reference.to_string(),
                })
            }
        }
    }

    /// Creates a table-qualified column reference.
    pub fn qualified(table: &str, name: &str) -> Result<Self> {
        validate_identifier(table)?;
        validate_identifier(name)?;
        Ok(Self {
            table: Some(table.to_string()),
            name: name.to_string(),
        })
    }

    /// Builds a reference from names that were validated when the schema was prepared.
    pub(crate) fn trusted(table: Option<&str>, name: &str) -> Self {
        Self {
            table: table.map(ToString::to_string),
            name: name.to_string(),
        }
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the qualifying table, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Returns the same column qualified by `table`.
    #[must_use]
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Returns the SQL representation.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match &self.table {
            Some(table) => format!("{table}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Creates a column reference, `F("name")` style.
pub fn col(reference: &str) -> Result<Column> {
    Column::new(reference)
}

/// A literal wrapped with an explicit output type.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    value: SqlValue,
    output: OutputType,
}

impl Value {
    /// Wraps a literal, inferring the output type from it.
    pub fn new<V: ToSqlValue>(value: V) -> Self {
        let value = value.to_sql_value();
        let output = value.output_type();
        Self { value, output }
    }

    /// Wraps a literal with an explicit output type.
    pub fn typed<V: ToSqlValue>(value: V, output: OutputType) -> Result<Self> {
        let value = value.to_sql_value();
        let compatible = match (&value, output) {
            (SqlValue::Null, _) => true,
            (SqlValue::Int(_), OutputType::Integer | OutputType::Float | OutputType::Boolean) => {
                true
            }
            (SqlValue::Bool(_), OutputType::Boolean | OutputType::Integer) => true,
            (SqlValue::Float(_), OutputType::Float) => true,
            (SqlValue::Text(_), OutputType::Text) => true,
            (SqlValue::Blob(_), OutputType::Blob) => true,
            _ => false,
        };
        if !compatible {
            return Err(CoreError::TypeMismatch(format!(
                "{} cannot be output as {output}",
                value.to_sql_inline()
            )));
        }
        Ok(Self { value, output })
    }

    /// Returns the wrapped literal.
    #[must_use]
    pub const fn value(&self) -> &SqlValue {
        &self.value
    }

    /// Returns the output type.
    #[must_use]
    pub const fn output_type(&self) -> OutputType {
        self.output
    }

    /// Renders the literal according to its output type.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        match (&self.value, self.output) {
            (SqlValue::Int(n), OutputType::Float) => SqlValue::Float(*n as f64).to_sql_inline(),
            (SqlValue::Int(n), OutputType::Boolean) => backend.quote_value(&SqlValue::Bool(*n != 0)),
            (value, _) => backend.quote_value(value),
        }
    }
}

/// One arm of a `Case` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct When {
    condition: Combined,
    then: Value,
}

impl When {
    /// Creates an arm from a filter such as `Q::lookup("age__gt", 18)`.
    ///
    /// The condition is resolved immediately without table context, so
    /// relationship traversal is not available inside a `When`.
    pub fn new<V: ToSqlValue>(condition: Q, then: V) -> Result<Self> {
        let resolved = Resolver::detached().resolve(&condition)?;
        let condition = resolved.condition.ok_or_else(|| {
            CoreError::Structure(String::from("a When arm needs a condition"))
        })?;
        Ok(Self {
            condition,
            then: Value::new(then),
        })
    }

    /// Creates an arm from an already-resolved condition.
    #[must_use]
    pub const fn from_condition(condition: Combined, then: Value) -> Self {
        Self { condition, then }
    }

    /// Renders `WHEN <condition> THEN <value>`.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        format!(
            "WHEN {} THEN {}",
            self.condition.to_sql(backend),
            self.then.to_sql(backend)
        )
    }
}

/// A conditional expression: `CASE WHEN ... THEN ... [ELSE ...] END`.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    arms: Vec<When>,
    default: Option<Value>,
}

impl Case {
    /// Creates a `Case` from its arms.
    ///
    /// Fails when no arm is given or when the arms produce different output types.
    pub fn new(arms: Vec<When>) -> Result<Self> {
        if arms.is_empty() {
            return Err(CoreError::Structure(String::from(
                "a Case needs at least one When arm",
            )));
        }
        let case = Self {
            arms,
            default: None,
        };
        case.check_output_types()?;
        Ok(case)
    }

    /// Sets the value used when no arm matches.
    pub fn default<V: ToSqlValue>(mut self, value: V) -> Result<Self> {
        self.default = Some(Value::new(value));
        self.check_output_types()?;
        Ok(self)
    }

    fn values(&self) -> impl Iterator<Item = &Value> {
        self.arms
            .iter()
            .map(|arm| &arm.then)
            .chain(self.default.iter())
    }

    fn check_output_types(&self) -> Result<()> {
        let mut seen: Option<OutputType> = None;
        for value in self.values() {
            let output = value.output_type();
            if output == OutputType::Null {
                continue;
            }
            match seen {
                None => seen = Some(output),
                Some(previous) if previous == output => {}
                Some(previous) if previous.is_numeric() && output.is_numeric() => {
                    seen = Some(OutputType::Float);
                }
                Some(previous) => {
                    return Err(CoreError::TypeMismatch(format!(
                        "Case arms mix {previous} and {output}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the common output type of the arms.
    #[must_use]
    pub fn output_type(&self) -> Option<OutputType> {
        self.values()
            .map(Value::output_type)
            .filter(|output| *output != OutputType::Null)
            .reduce(|a, b| if a == b { a } else { OutputType::Float })
    }

    /// Renders the expression.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        let arms: Vec<String> = self.arms.iter().map(|arm| arm.to_sql(backend)).collect();
        match &self.default {
            Some(default) => format!(
                "CASE {} ELSE {} END",
                arms.join(" "),
                default.to_sql(backend)
            ),
            None => format!("CASE {} END", arms.join(" ")),
        }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
        }
    }
}

/// Scalar functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// `lower(expr)`
    Lower(Box<Expr>),
    /// `upper(expr)`
    Upper(Box<Expr>),
    /// `length(expr)`
    Length(Box<Expr>),
    /// `trim(expr)`
    Trim(Box<Expr>),
    /// `ltrim(expr)`
    LTrim(Box<Expr>),
    /// `rtrim(expr)`
    RTrim(Box<Expr>),
    /// `substr(expr, start, length)`, with `start` counted from 1.
    SubStr(Box<Expr>, i64, i64),
    /// `concat(expr, ...)`; NULL arguments count as empty strings.
    Concat(Vec<Expr>),
    /// `abs(expr)`
    Abs(Box<Expr>),
    /// Extraction of a date part, rendered by the backend.
    Extract(DatePart, Box<Expr>),
}

impl Function {
    /// Returns the output type of the function.
    #[must_use]
    pub fn output_type(&self) -> Option<OutputType> {
        match self {
            Self::Lower(_)
            | Self::Upper(_)
            | Self::Trim(_)
            | Self::LTrim(_)
            | Self::RTrim(_)
            | Self::SubStr(..)
            | Self::Concat(_) => Some(OutputType::Text),
            Self::Length(_) | Self::Extract(..) => Some(OutputType::Integer),
            Self::Abs(inner) => inner.output_type(),
        }
    }

    fn arguments(&self) -> Vec<&Expr> {
        match self {
            Self::Lower(inner)
            | Self::Upper(inner)
            | Self::Length(inner)
            | Self::Trim(inner)
            | Self::LTrim(inner)
            | Self::RTrim(inner)
            | Self::SubStr(inner, ..)
            | Self::Abs(inner)
            | Self::Extract(_, inner) => vec![&**inner],
            Self::Concat(parts) => parts.iter().collect(),
        }
    }

    /// Renders the function call.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::Lower(inner) => format!("lower({})", inner.to_sql(backend)),
            Self::Upper(inner) => format!("upper({})", inner.to_sql(backend)),
            Self::Length(inner) => format!("length({})", inner.to_sql(backend)),
            Self::Trim(inner) => format!("trim({})", inner.to_sql(backend)),
            Self::LTrim(inner) => format!("ltrim({})", inner.to_sql(backend)),
            Self::RTrim(inner) => format!("rtrim({})", inner.to_sql(backend)),
            Self::SubStr(inner, start, length) => {
                format!("substr({}, {start}, {length})", inner.to_sql(backend))
            }
            Self::Concat(parts) => {
                let parts: Vec<String> = parts.iter().map(|part| part.to_sql(backend)).collect();
                format!("concat({})", parts.join(", "))
            }
            Self::Abs(inner) => format!("abs({})", inner.to_sql(backend)),
            Self::Extract(part, inner) => backend.date_part(*part, &inner.to_sql(backend)),
        }
    }
}

/// `lower(expr)`
pub fn lower(expr: impl Into<Expr>) -> Expr {
    Expr::Function(Function::Lower(Box::new(expr.into())))
}

/// `upper(expr)`
pub fn upper(expr: impl Into<Expr>) -> Expr {
    Expr::Function(Function::Upper(Box::new(expr.into())))
}

/// `length(expr)`
pub fn length(expr: impl Into<Expr>) -> Expr {
    Expr::Function(Function::Length(Box::new(expr.into())))
}

/// `trim(expr)`
pub fn trim(expr: impl Into<Expr>) -> Expr {
    Expr::Function(Function::Trim(Box::new(expr.into())))
}

/// `ltrim(expr)`
pub fn ltrim(expr: impl Into<Expr>) -> Expr {
    Expr::Function(Function::LTrim(Box::new(expr.into())))
}

/// `rtrim(expr)`
pub fn rtrim(expr: impl Into<Expr>) -> Expr {
    Expr::Function(Function::RTrim(Box::new(expr.into())))
}

/// `length` characters of `expr` starting at `start`, counted from 1.
pub fn substr(expr: impl Into<Expr>, start: i64, length: i64) -> Result<Expr> {
    if length < 0 {
        return Err(CoreError::Structure(format!(
            "substr() length must not be negative, got {length}"
        )));
    }
    Ok(Expr::Function(Function::SubStr(Box::new(expr.into()), start, length)))
}

/// Concatenates the parts as text.
pub fn concat(parts: Vec<Expr>) -> Result<Expr> {
    if parts.is_empty() {
        return Err(CoreError::Structure(String::from("concat() needs at least one part")));
    }
    Ok(Expr::Function(Function::Concat(parts)))
}

/// `abs(expr)`, rejecting non-numeric input.
pub fn abs(expr: impl Into<Expr>) -> Result<Expr> {
    let expr = expr.into();
    if let Some(output) = expr.output_type() {
        if !output.is_numeric() {
            return Err(CoreError::TypeMismatch(format!("abs() of {output}")));
        }
    }
    Ok(Expr::Function(Function::Abs(Box::new(expr))))
}

/// Extracts a date part, e.g. the year of a date column.
pub fn extract(part: DatePart, expr: impl Into<Expr>) -> Expr {
    Expr::Function(Function::Extract(part, Box::new(expr.into())))
}

/// A derived expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference.
    Column(Column),
    /// Typed literal.
    Value(Value),
    /// Conditional expression.
    Case(Box<Case>),
    /// Binary arithmetic.
    Arithmetic {
        /// Left operand.
        lhs: Box<Expr>,
        /// Operator.
        op: ArithmeticOp,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Scalar function.
    Function(Function),
    /// Aggregate function.
    Aggregate(Aggregate),
    /// Window function.
    Window(Box<Window>),
}

impl Expr {
    /// Returns the output type when it is known.
    ///
    /// Column types are not known at this level and yield `None`.
    #[must_use]
    pub fn output_type(&self) -> Option<OutputType> {
        match self {
            Self::Column(_) => None,
            Self::Value(value) => Some(value.output_type()),
            Self::Case(case) => case.output_type(),
            Self::Arithmetic { lhs, rhs, .. } => {
                match (lhs.output_type(), rhs.output_type()) {
                    (Some(OutputType::Float), _) | (_, Some(OutputType::Float)) => {
                        Some(OutputType::Float)
                    }
                    (Some(OutputType::Integer | OutputType::Null), Some(OutputType::Integer | OutputType::Null)) => {
                        Some(OutputType::Integer)
                    }
                    _ => None,
                }
            }
            Self::Function(function) => function.output_type(),
            Self::Aggregate(aggregate) => aggregate.output_type(),
            Self::Window(window) => window.output_type(),
        }
    }

    fn arithmetic(self, op: ArithmeticOp, rhs: Self) -> Result<Self> {
        for operand in [&self, &rhs] {
            if let Some(output) = operand.output_type() {
                if !output.is_numeric() {
                    return Err(CoreError::TypeMismatch(format!(
                        "cannot apply '{op}' to a {output} expression"
                    )));
                }
            }
        }
        Ok(Self::Arithmetic {
            lhs: Box::new(self),
            op,
            rhs: Box::new(rhs),
        })
    }

    /// `self + rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, rhs: impl Into<Self>) -> Result<Self> {
        self.arithmetic(ArithmeticOp::Add, rhs.into())
    }

    /// `self - rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, rhs: impl Into<Self>) -> Result<Self> {
        self.arithmetic(ArithmeticOp::Sub, rhs.into())
    }

    /// `self * rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, rhs: impl Into<Self>) -> Result<Self> {
        self.arithmetic(ArithmeticOp::Mul, rhs.into())
    }

    /// `self / rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn div(self, rhs: impl Into<Self>) -> Result<Self> {
        self.arithmetic(ArithmeticOp::Div, rhs.into())
    }

    /// Returns whether an aggregate appears anywhere in the expression.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Aggregate(_) => true,
            Self::Arithmetic { lhs, rhs, .. } => lhs.contains_aggregate() || rhs.contains_aggregate(),
            Self::Function(function) => function
                .arguments()
                .into_iter()
                .any(Self::contains_aggregate),
            Self::Window(window) => window.contains_aggregate(),
            Self::Column(_) | Self::Value(_) | Self::Case(_) => false,
        }
    }

    /// Renders the expression.
    #[must_use]
    pub fn to_sql(&self, backend: &dyn Backend) -> String {
        match self {
            Self::Column(column) => column.to_sql(),
            Self::Value(value) => value.to_sql(backend),
            Self::Case(case) => case.to_sql(backend),
            Self::Arithmetic { lhs, op, rhs } => {
                format!("({} {op} {})", lhs.to_sql(backend), rhs.to_sql(backend))
            }
            Self::Function(function) => function.to_sql(backend),
            Self::Aggregate(aggregate) => aggregate.to_sql(backend),
            Self::Window(window) => window.to_sql(backend),
        }
    }
}

impl Column {
    /// `self + rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, rhs: impl Into<Expr>) -> Result<Expr> {
        Expr::from(self).add(rhs)
    }

    /// `self - rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, rhs: impl Into<Expr>) -> Result<Expr> {
        Expr::from(self).sub(rhs)
    }

    /// `self * rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, rhs: impl Into<Expr>) -> Result<Expr> {
        Expr::from(self).mul(rhs)
    }

    /// `self / rhs`
    #[allow(clippy::should_implement_trait)]
    pub fn div(self, rhs: impl Into<Expr>) -> Result<Expr> {
        Expr::from(self).div(rhs)
    }
}

impl From<Column> for Expr {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Case> for Expr {
    fn from(case: Case) -> Self {
        Self::Case(Box::new(case))
    }
}

impl From<Function> for Expr {
    fn from(function: Function) -> Self {
        Self::Function(function)
    }
}

impl From<Window> for Expr {
    fn from(window: Window) -> Self {
        Self::Window(Box::new(window))
    }
}

impl From<Aggregate> for Expr {
    fn from(aggregate: Aggregate) -> Self {
        Self::Aggregate(aggregate)
    }
}

macro_rules! literal_to_expr {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::new(value))
                }
            }
        )*
    };
}

literal_to_expr!(SqlValue, bool, i64, i32, f64, &str, String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;

    #[test]
    fn test_column_reference() {
        assert_eq!(Column::new("name").unwrap().to_sql(), "name");
        assert_eq!(Column::new("users.name").unwrap().to_sql(), "users.name");
        assert_eq!(Column::new("users.name").unwrap().table(), Some("users"));
    }

    #[test]
    fn test_invalid_references() {
        for bad in ["", "1abc", "na me", "select", "users.", "a;drop"] {
            assert!(
                matches!(Column::new(bad), Err(CoreError::InvalidReference(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_typed_value() {
        let backend = SqliteBackend::new();
        let value = Value::typed(2, OutputType::Float).unwrap();
        assert_eq!(value.to_sql(&backend), "2.0");
        assert!(matches!(
            Value::typed("x", OutputType::Integer),
            Err(CoreError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_arithmetic() {
        let backend = SqliteBackend::new();
        let expr = col("price").unwrap().add(10).unwrap().mul(2).unwrap();
        assert_eq!(expr.to_sql(&backend), "((price + 10) * 2)");
        assert_eq!(expr.output_type(), None);

        let numeric = Expr::from(1).add(2.5).unwrap();
        assert_eq!(numeric.output_type(), Some(OutputType::Float));
    }

    #[test]
    fn test_arithmetic_type_mismatch() {
        let result = col("age").unwrap().add("ten");
        assert!(matches!(result, Err(CoreError::TypeMismatch(_))));
        assert!(matches!(abs("x"), Err(CoreError::TypeMismatch(_))));
    }

    #[test]
    fn test_case_when() {
        let backend = SqliteBackend::new();
        let case = Case::new(vec![
            When::new(Q::lookup("age__lt", 18), "minor").unwrap(),
            When::new(Q::lookup("age__gte", 65), "senior").unwrap(),
        ])
        .unwrap()
        .default("adult")
        .unwrap();
        assert_eq!(
            case.to_sql(&backend),
            "CASE WHEN age < 18 THEN 'minor' WHEN age >= 65 THEN 'senior' ELSE 'adult' END"
        );
        assert_eq!(case.output_type(), Some(OutputType::Text));
    }

    #[test]
    fn test_case_rejects_mixed_outputs() {
        let arm = When::new(Q::lookup("age__lt", 18), 1).unwrap();
        let result = Case::new(vec![arm]).unwrap().default("adult");
        assert!(matches!(result, Err(CoreError::TypeMismatch(_))));
        assert!(matches!(Case::new(vec![]), Err(CoreError::Structure(_))));
    }

    #[test]
    fn test_functions() {
        let backend = SqliteBackend::new();
        assert_eq!(lower(col("name").unwrap()).to_sql(&backend), "lower(name)");
        assert_eq!(
            extract(DatePart::Month, col("created").unwrap()).to_sql(&backend),
            "CAST(strftime('%m', created) AS INTEGER)"
        );
    }

    #[test]
    fn test_text_functions() {
        let backend = SqliteBackend::new();
        let name = col("name").unwrap();
        assert_eq!(ltrim(name.clone()).to_sql(&backend), "ltrim(name)");
        assert_eq!(rtrim(name.clone()).to_sql(&backend), "rtrim(name)");
        assert_eq!(
            substr(name.clone(), 1, 3).unwrap().to_sql(&backend),
            "substr(name, 1, 3)"
        );
        let greeting = concat(vec![Expr::from("Hello, "), name.clone().into()]).unwrap();
        assert_eq!(greeting.to_sql(&backend), "concat('Hello, ', name)");
        assert_eq!(greeting.output_type(), Some(OutputType::Text));

        assert!(matches!(concat(vec![]), Err(CoreError::Structure(_))));
        assert!(matches!(substr(name, 1, -1), Err(CoreError::Structure(_))));
        assert!(matches!(
            abs(substr(col("name").unwrap(), 1, 2).unwrap()),
            Err(CoreError::TypeMismatch(_))
        ));
    }
}
