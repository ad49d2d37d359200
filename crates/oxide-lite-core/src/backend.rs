//! Backend abstraction used by every node when rendering.
//!
//! A backend owns identifier quoting, literal quoting and the handful of
//! dialect-specific fragments (date parts, autoincrement, `RETURNING`).

use crate::value::SqlValue;

/// A component of a date or datetime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    /// Four-digit year.
    Year,
    /// Month of the year (1-12).
    Month,
    /// Day of the month.
    Day,
    /// Hour of the day (0-23).
    Hour,
    /// Minute of the hour.
    Minute,
}

impl DatePart {
    /// Returns the `strftime` format specifier for this part.
    #[must_use]
    pub const fn strftime_format(self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::Month => "%m",
            Self::Day => "%d",
            Self::Hour => "%H",
            Self::Minute => "%M",
        }
    }
}

/// Trait for dialect-specific rendering.
pub trait Backend: Send + Sync {
    /// Returns the name of the backend.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Quotes an identifier (table, column, index name).
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let doubled = format!("{quote}{quote}");
        let escaped = name.replace(quote, &doubled);
        format!("{quote}{escaped}{quote}")
    }

    /// Renders a literal.
    fn quote_value(&self, value: &SqlValue) -> String {
        value.to_sql_inline()
    }

    /// Returns whether `INSERT ... RETURNING` is available.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Returns the keyword appended to an auto-incrementing primary key.
    fn autoincrement_keyword(&self) -> &'static str;

    /// Renders the extraction of a date part from an already-rendered expression.
    fn date_part(&self, part: DatePart, expr: &str) -> String;

    /// Returns the operator used for regular expression matching.
    fn regexp_operator(&self) -> &'static str {
        "REGEXP"
    }
}

/// The SQLite backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

impl SqliteBackend {
    /// Creates a new SQLite backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    // SQLite has supported RETURNING since 3.35; sqlx bundles a newer release.
    fn supports_returning(&self) -> bool {
        true
    }

    fn autoincrement_keyword(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    fn date_part(&self, part: DatePart, expr: &str) -> String {
        format!(
            "CAST(strftime('{}', {expr}) AS INTEGER)",
            part.strftime_format()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        let backend = SqliteBackend::new();
        assert_eq!(backend.quote_identifier("users"), "\"users\"");
        assert_eq!(backend.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_date_part() {
        let backend = SqliteBackend::new();
        assert_eq!(
            backend.date_part(DatePart::Year, "created"),
            "CAST(strftime('%Y', created) AS INTEGER)"
        );
    }

    #[test]
    fn test_quote_value() {
        let backend = SqliteBackend::new();
        assert_eq!(backend.quote_value(&SqlValue::Text("a'b".into())), "'a''b'");
        assert_eq!(backend.quote_value(&SqlValue::Null), "NULL");
    }
}
