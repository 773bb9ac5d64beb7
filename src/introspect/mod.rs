//! Table introspection
//!
//! Each supported engine gets an [`Adapter`] that runs its catalog queries and
//! returns loosely shaped pieces (columns, primary key, foreign keys, indices,
//! check constraints). [`introspect`] picks the adapter from the connection's
//! engine identifier and cross-references the pieces into one [`Table`].
//!
//! A failure in any sub-query fails the whole call; partial tables are never
//! returned.

mod postgres;
mod sqlite;

pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

use crate::connection::{Connection, ConnectionError};
use crate::error::{query_failed, SchemaError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Postgres,
    Sqlite,
}

impl AdapterKind {
    /// Parse an engine identifier such as `"postgresql"` or `"sqlite3"`
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnsupportedAdapter` carrying the identifier when
    /// no adapter handles it.
    pub fn from_engine(engine: &str) -> Result<Self, SchemaError> {
        match engine.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(AdapterKind::Postgres),
            "sqlite" | "sqlite3" => Ok(AdapterKind::Sqlite),
            _ => Err(SchemaError::UnsupportedAdapter(engine.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Postgres => "postgres",
            AdapterKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action taken on dependent rows when the referenced row changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Parse the SQL spelling (`"ON DELETE"` operand), unknown spellings are `NoAction`
    pub fn from_sql(action: &str) -> Self {
        match action.trim().to_ascii_uppercase().as_str() {
            "RESTRICT" => ReferentialAction::Restrict,
            "CASCADE" => ReferentialAction::Cascade,
            "SET NULL" => ReferentialAction::SetNull,
            "SET DEFAULT" => ReferentialAction::SetDefault,
            _ => ReferentialAction::NoAction,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

/// Per-column metadata resolved by introspection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMeta {
    pub nullable: bool,
    /// Raw default expression as the catalog reports it
    pub default: Option<String>,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub check_constraints: Vec<String>,
    /// Covered by at least one non-primary index
    pub index: bool,
    /// First covering index, in adapter order
    pub index_name: Option<String>,
    /// Labels of a user-defined enum type, in declaration order
    pub enum_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub raw_type: String,
    pub meta: ColumnMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPrimaryKey {
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawForeignKey {
    /// Constraint name; SQLite does not report one
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    /// Access method (`btree`, `gin`, ...) when the engine reports one
    pub kind: Option<String>,
}

/// A check constraint as read from the catalog
///
/// `columns` is empty when the engine cannot attribute the constraint; the
/// columns are then inferred from the identifiers in `expression`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCheck {
    pub columns: Vec<String>,
    pub expression: String,
}

/// Introspected table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    /// Namespace the table was read from, if the engine has one
    pub schema: Option<String>,
    pub adapter: AdapterKind,
    /// Columns in ordinal order
    pub columns: Vec<Column>,
    pub primary_key: RawPrimaryKey,
    pub foreign_keys: Vec<RawForeignKey>,
    pub indices: Vec<RawIndex>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `schema.table` when a namespace is known, otherwise just the table
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// Table reference as requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    /// Split `schema.table`; a bare name has no schema
    pub fn parse(table: &str) -> Self {
        match table.trim().split_once('.') {
            Some((schema, name)) if !schema.is_empty() && !name.is_empty() => Self {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            },
            _ => Self {
                schema: None,
                name: table.trim().to_string(),
            },
        }
    }
}

/// Catalog access for one engine family
///
/// Implementations only run queries and decode rows; cross-referencing is
/// shared and lives in [`Adapter::introspect`].
pub trait Adapter {
    fn kind(&self) -> AdapterKind;

    /// Namespace reported on the resulting [`Table`]
    fn namespace(&self, target: &TableRef) -> Option<String> {
        target.schema.clone()
    }

    /// Columns in ordinal order, with nullability, raw default and enum labels
    fn columns(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<Column>, ConnectionError>;

    /// Primary-key column names in key order
    fn primary_key(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<String>, ConnectionError>;

    fn foreign_keys(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawForeignKey>, ConnectionError>;

    /// Non-primary indices, in the order used to resolve `index_name`
    fn indices(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawIndex>, ConnectionError>;

    fn check_constraints(&self, conn: &dyn Connection, target: &TableRef) -> Result<Vec<RawCheck>, ConnectionError>;

    /// Run every catalog query and assemble the table
    fn introspect(&self, conn: &dyn Connection, table: &str) -> Result<Table, SchemaError> {
        let target = TableRef::parse(table);

        let columns = self.columns(conn, &target).map_err(|e| query_failed(table, e))?;
        if columns.is_empty() {
            return Err(SchemaError::introspection(table, "table not found"));
        }
        let primary_key = self.primary_key(conn, &target).map_err(|e| query_failed(table, e))?;
        let foreign_keys = self.foreign_keys(conn, &target).map_err(|e| query_failed(table, e))?;
        let indices = self.indices(conn, &target).map_err(|e| query_failed(table, e))?;
        let checks = self
            .check_constraints(conn, &target)
            .map_err(|e| query_failed(table, e))?;

        log::debug!(
            "Introspected {}: {} columns, {} foreign keys, {} indices",
            table,
            columns.len(),
            foreign_keys.len(),
            indices.len()
        );

        assemble(
            Table {
                name: target.name.clone(),
                schema: self.namespace(&target),
                adapter: self.kind(),
                columns,
                primary_key: RawPrimaryKey { columns: primary_key },
                foreign_keys,
                indices,
            },
            checks,
        )
    }
}

/// Adapter implementation for an engine family
pub fn adapter_for(kind: AdapterKind) -> &'static dyn Adapter {
    match kind {
        AdapterKind::Postgres => &PostgresAdapter,
        AdapterKind::Sqlite => &SqliteAdapter,
    }
}

/// Introspect `table` over `conn`
///
/// The adapter is chosen from `conn.engine()`. `table` may be qualified as
/// `schema.table`.
///
/// # Errors
///
/// * `SchemaError::UnsupportedAdapter` for an unknown engine
/// * `SchemaError::IntrospectionFailed` when a catalog query fails or the
///   table has no columns
pub fn introspect(conn: &dyn Connection, table: &str) -> Result<Table, SchemaError> {
    let kind = AdapterKind::from_engine(conn.engine())?;

    #[cfg(feature = "tracing")]
    let _span = crate::metrics::tracing_helpers::introspect_span(kind.as_str(), table).entered();

    #[cfg(feature = "metrics")]
    let start = std::time::Instant::now();

    let result = adapter_for(kind).introspect(conn, table);

    #[cfg(feature = "metrics")]
    crate::metrics::METRICS.record_introspection(start.elapsed(), kind.as_str());

    result
}

/// Resolve per-column key, index and check metadata
fn assemble(mut table: Table, checks: Vec<RawCheck>) -> Result<Table, SchemaError> {
    for pk in &table.primary_key.columns {
        if table.column(pk).is_none() {
            return Err(SchemaError::introspection(
                &table.name,
                format!("primary key column '{}' not found", pk),
            ));
        }
    }

    let column_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let mut attributed: Vec<(Vec<String>, String)> = Vec::with_capacity(checks.len());
    for check in checks {
        let columns = if check.columns.is_empty() {
            columns_mentioned(&check.expression, &column_names)
        } else {
            check.columns
        };
        attributed.push((columns, check.expression));
    }

    for column in &mut table.columns {
        let name = column.name.as_str();
        column.meta.primary_key = table.primary_key.columns.iter().any(|c| c == name);
        column.meta.foreign_key = table
            .foreign_keys
            .iter()
            .any(|fk| fk.columns.iter().any(|c| c == name));

        column.meta.index_name = table
            .indices
            .iter()
            .find(|ix| ix.columns.iter().any(|c| c == name))
            .map(|ix| ix.name.clone());
        column.meta.index = column.meta.index_name.is_some();

        for (columns, expression) in &attributed {
            if columns.iter().any(|c| c == name) && !column.meta.check_constraints.contains(expression) {
                column.meta.check_constraints.push(expression.clone());
            }
        }
    }

    Ok(table)
}

/// Column names occurring as whole identifiers in a check expression
fn columns_mentioned(expression: &str, columns: &[String]) -> Vec<String> {
    let words: Vec<String> = expression
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect();

    columns
        .iter()
        .filter(|c| words.iter().any(|w| *w == c.to_ascii_lowercase()))
        .cloned()
        .collect()
}

/// Double-quote an identifier for inline use in PRAGMA and catalog SQL
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
