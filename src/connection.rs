//! Connection seam
//!
//! Schema inference never owns a database connection. Callers hand in anything
//! implementing [`Connection`] for the duration of a call; the core only needs
//! to run catalog queries and read back loosely typed rows.
//!
//! The transport behind the trait (pool, client, test double) is the caller's
//! concern, including retries and timeouts.

use std::fmt;
use std::path::PathBuf;

/// Connection error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// The database rejected or failed to run the query
    #[error("Query error: {0}")]
    Query(String),
    /// A row value was missing or had an unexpected type
    #[error("Decode error: {0}")]
    Decode(String),
    /// Other transport errors
    #[error("Connection error: {0}")]
    Other(String),
}

/// A single value read from a result row
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Null => write!(f, "NULL"),
            DbValue::Bool(b) => write!(f, "{b}"),
            DbValue::Int(i) => write!(f, "{i}"),
            DbValue::Float(v) => write!(f, "{v}"),
            DbValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Int(value)
    }
}

impl From<i32> for DbValue {
    fn from(value: i32) -> Self {
        DbValue::Int(i64::from(value))
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Bool(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

/// A result row: ordered `(column, value)` pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, DbValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from name/value pairs, keeping their order
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DbValue>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<DbValue>) {
        self.columns.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Raw value for a column, `None` if the row has no such column
    pub fn get(&self, name: &str) -> Option<&DbValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    fn require(&self, name: &str) -> Result<&DbValue, ConnectionError> {
        self.get(name)
            .ok_or_else(|| ConnectionError::Decode(format!("column '{name}' missing from row")))
    }

    /// Non-null text value
    pub fn text(&self, name: &str) -> Result<String, ConnectionError> {
        self.opt_text(name)?
            .ok_or_else(|| ConnectionError::Decode(format!("column '{name}' is NULL")))
    }

    /// Nullable text value; integers and booleans are rendered as text
    pub fn opt_text(&self, name: &str) -> Result<Option<String>, ConnectionError> {
        match self.require(name)? {
            DbValue::Null => Ok(None),
            DbValue::Text(s) => Ok(Some(s.clone())),
            other => Ok(Some(other.to_string())),
        }
    }

    /// Integer value; numeric text is parsed
    pub fn int(&self, name: &str) -> Result<i64, ConnectionError> {
        match self.require(name)? {
            DbValue::Int(i) => Ok(*i),
            DbValue::Bool(b) => Ok(i64::from(*b)),
            DbValue::Text(s) => s.trim().parse::<i64>().map_err(|e| {
                ConnectionError::Decode(format!("column '{name}' is not an integer: {e}"))
            }),
            other => Err(ConnectionError::Decode(format!(
                "column '{name}' is not an integer: {other:?}"
            ))),
        }
    }

    /// Boolean value; accepts integers and the usual textual spellings
    /// (`t`/`f`, `YES`/`NO`, `true`/`false`) that catalogs return
    pub fn bool(&self, name: &str) -> Result<bool, ConnectionError> {
        match self.require(name)? {
            DbValue::Bool(b) => Ok(*b),
            DbValue::Int(i) => Ok(*i != 0),
            DbValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "yes" | "y" | "1" => Ok(true),
                "f" | "false" | "no" | "n" | "0" => Ok(false),
                other => Err(ConnectionError::Decode(format!(
                    "column '{name}' is not a boolean: {other}"
                ))),
            },
            other => Err(ConnectionError::Decode(format!(
                "column '{name}' is not a boolean: {other:?}"
            ))),
        }
    }
}

/// Trait for connections the inference pipeline can query
///
/// # Examples
///
/// ```no_run
/// use lifeguard_schema::connection::{Connection, ConnectionError, DbValue, Row};
///
/// struct Client;
///
/// impl Connection for Client {
///     fn engine(&self) -> &str {
///         "postgres"
///     }
///
///     fn identity(&self) -> String {
///         "postgres://localhost/app".to_string()
///     }
///
///     fn query_all(&self, _query: &str, _params: &[DbValue]) -> Result<Vec<Row>, ConnectionError> {
///         Ok(Vec::new())
///     }
/// }
/// ```
pub trait Connection {
    /// Engine identifier, e.g. `"postgres"` or `"sqlite"`
    fn engine(&self) -> &str;

    /// Stable identity used to key cache entries
    ///
    /// Two connections with the same identity share cache entries; anything
    /// else (even another database on the same server) must differ.
    fn identity(&self) -> String;

    /// Execute a query and return all rows
    ///
    /// Postgres-style queries use `$1`, `$2`, ... placeholders bound from
    /// `params`; PRAGMA queries carry their arguments inline.
    fn query_all(&self, query: &str, params: &[DbValue]) -> Result<Vec<Row>, ConnectionError>;

    /// Migration directory associated with this connection, if it has its own
    fn migrations_dir(&self) -> Option<PathBuf> {
        None
    }
}

impl<C: Connection + ?Sized> Connection for &C {
    fn engine(&self) -> &str {
        (**self).engine()
    }

    fn identity(&self) -> String {
        (**self).identity()
    }

    fn query_all(&self, query: &str, params: &[DbValue]) -> Result<Vec<Row>, ConnectionError> {
        (**self).query_all(query, params)
    }

    fn migrations_dir(&self) -> Option<PathBuf> {
        (**self).migrations_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_accessors() {
        let row = Row::from_pairs([
            ("name", DbValue::from("email")),
            ("notnull", DbValue::Int(1)),
            ("is_nullable", DbValue::from("YES")),
            ("dflt_value", DbValue::Null),
            ("ordinal", DbValue::from("3")),
        ]);

        assert_eq!(row.text("name").unwrap(), "email");
        assert!(row.bool("notnull").unwrap());
        assert!(row.bool("is_nullable").unwrap());
        assert_eq!(row.opt_text("dflt_value").unwrap(), None);
        assert_eq!(row.int("ordinal").unwrap(), 3);
    }

    #[test]
    fn test_row_decode_errors() {
        let row = Row::from_pairs([("name", DbValue::Null)]);
        assert!(matches!(row.text("name"), Err(ConnectionError::Decode(_))));
        assert!(matches!(row.int("missing"), Err(ConnectionError::Decode(_))));
        assert!(matches!(
            Row::from_pairs([("flag", "maybe")]).bool("flag"),
            Err(ConnectionError::Decode(_))
        ));
    }
}
