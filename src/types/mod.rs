//! Canonical column types and default values
//!
//! Each adapter compiles its own raw type spellings (`int4`, `character varying(255)`,
//! `INTEGER`, `text[]`) into [`CanonicalType`], and raw default expressions into
//! [`DefaultValue`]. Both compilers are pure and total: an unknown type degrades
//! to [`CanonicalType::String`], an unknown default is kept as an expression.

mod default;
mod postgres;
mod sqlite;

pub use default::compile_default;

use crate::error::SchemaError;
use crate::introspect::{AdapterKind, Column};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Adapter-independent field type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum CanonicalType {
    /// Integer primary or foreign key
    Identity,
    /// UUID primary or foreign key
    Guid,
    /// UUID column that is not a key
    Uuid,
    Integer,
    Float,
    Decimal,
    Boolean,
    String,
    Binary,
    Date,
    Time,
    /// Timestamp without time zone
    NaiveDateTime,
    /// Timestamp with time zone
    UtcDateTime,
    /// JSON document
    Map,
    Array(Box<CanonicalType>),
    /// Closed set of labels (database enum type)
    Enum(Vec<String>),
}

impl CanonicalType {
    pub fn array_of(inner: CanonicalType) -> Self {
        CanonicalType::Array(Box::new(inner))
    }

    /// Integer storage, keyed or not
    pub fn is_integer_affinity(&self) -> bool {
        matches!(self, CanonicalType::Integer | CanonicalType::Identity)
    }

    /// UUID storage, keyed or not
    pub fn is_uuid_affinity(&self) -> bool {
        matches!(self, CanonicalType::Uuid | CanonicalType::Guid)
    }
}

/// Compiled column default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    /// `now()`, `CURRENT_TIMESTAMP` and friends
    CurrentTimestamp,
    CurrentDate,
    CurrentTime,
    /// Sequence, identity or autoincrement generated
    AutoIncrement,
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    /// Anything else, kept verbatim (trimmed)
    Expression(String),
}

impl DefaultValue {
    /// Whether the database computes the value at insert time
    pub fn is_database_generated(&self) -> bool {
        matches!(
            self,
            DefaultValue::CurrentTimestamp
                | DefaultValue::CurrentDate
                | DefaultValue::CurrentTime
                | DefaultValue::AutoIncrement
        )
    }
}

/// Compile a raw column type, reporting unmapped tokens as an error value
///
/// `sometype[]` is compiled as an array of `sometype`.
pub fn try_compile_type(adapter: AdapterKind, raw: &str) -> Result<CanonicalType, SchemaError> {
    let trimmed = raw.trim();
    if let Some(base) = trimmed.strip_suffix("[]") {
        return try_compile_type(adapter, base).map(CanonicalType::array_of);
    }

    let token = normalize_token(trimmed);
    let compiled = match adapter {
        AdapterKind::Postgres => postgres::compile(&token),
        AdapterKind::Sqlite => sqlite::compile(&token),
    };

    compiled.ok_or_else(|| SchemaError::TypeMappingFallback {
        adapter: adapter.to_string(),
        raw_type: raw.to_string(),
    })
}

/// Compile a raw column type; unmapped tokens fall back to `String`
pub fn compile_type(adapter: AdapterKind, raw: &str) -> CanonicalType {
    let trimmed = raw.trim();
    if let Some(base) = trimmed.strip_suffix("[]") {
        return CanonicalType::array_of(compile_type(adapter, base));
    }

    try_compile_type(adapter, trimmed).unwrap_or_else(|fallback| {
        log::warn!("{}", fallback);
        CanonicalType::String
    })
}

/// Compile a column's type and default together, applying the key and
/// boolean-affinity upgrades
///
/// The upgrades read only the column metadata; a column named `id` without
/// primary-key metadata stays a plain integer.
pub fn compile_column(adapter: AdapterKind, column: &Column) -> (CanonicalType, Option<DefaultValue>) {
    let default = column
        .meta
        .default
        .as_deref()
        .and_then(|raw| compile_default(adapter, raw));

    if let Some(labels) = &column.meta.enum_values {
        let mut ty = CanonicalType::Enum(labels.clone());
        let mut raw = column.raw_type.trim();
        while let Some(element) = raw.strip_suffix("[]") {
            ty = CanonicalType::array_of(ty);
            raw = element.trim_end();
        }
        return (ty, default);
    }

    let mut ty = compile_type(adapter, &column.raw_type);

    // Engines without a native boolean store flags as integers.
    if ty == CanonicalType::Integer && matches!(default, Some(DefaultValue::Boolean(_))) {
        ty = CanonicalType::Boolean;
    }

    let keyed = column.meta.primary_key || column.meta.foreign_key;
    if keyed {
        if ty.is_integer_affinity() {
            ty = CanonicalType::Identity;
        } else if ty.is_uuid_affinity() {
            ty = CanonicalType::Guid;
        }
    }

    (ty, default)
}

/// Lowercase, collapse whitespace and drop a trailing `(n[, m])` modifier
fn normalize_token(raw: &str) -> String {
    let lowered = raw.to_ascii_lowercase();
    let without_modifier = match (lowered.find('('), lowered.rfind(')')) {
        (Some(open), Some(close)) if close > open => {
            format!("{}{}", &lowered[..open], &lowered[close + 1..])
        }
        _ => lowered,
    };
    without_modifier.split_whitespace().collect::<Vec<_>>().join(" ")
}
