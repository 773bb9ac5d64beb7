//! Error types for schema inference and caching

use crate::connection::ConnectionError;

/// Schema inference and cache errors
///
/// Only [`SchemaError::UnsupportedAdapter`], [`SchemaError::IntrospectionFailed`],
/// [`SchemaError::UnknownField`] and [`SchemaError::Config`] are surfaced as hard
/// failures. The remaining variants describe conditions the pipeline degrades
/// around (fallback type, cache miss) and are logged rather than returned from
/// the public cache lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// The connection reported an engine no adapter handles
    #[error("Unsupported database adapter: {0}")]
    UnsupportedAdapter(String),

    /// A catalog query failed or the table does not exist
    #[error("Introspection of table '{table}' failed: {cause}")]
    IntrospectionFailed { table: String, cause: String },

    /// Raw column type had no mapping; the column was compiled as a string
    #[error("No {adapter} type mapping for '{raw_type}', falling back to string")]
    TypeMappingFallback { adapter: String, raw_type: String },

    /// Stored cache entry was computed against a different migration corpus
    #[error("Cached schema for '{table}' is stale (stored digest {stored}, current digest {current})")]
    CacheDigestMismatch {
        table: String,
        stored: String,
        current: String,
    },

    /// Persisted cache entry is corrupt, unparsable or of another format version
    #[error("Failed to (de)serialize cache entry {path}: {message}")]
    Serialization { path: String, message: String },

    /// Projection or override referenced a field the schema does not have
    #[error("Schema '{schema}' has no field named '{field}'")]
    UnknownField { schema: String, field: String },

    /// Filesystem error while reading migrations or writing cache files
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SchemaError {
    pub(crate) fn introspection(table: &str, cause: impl std::fmt::Display) -> Self {
        SchemaError::IntrospectionFailed {
            table: table.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        SchemaError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Whether the pipeline treats this error as a soft cache miss
    pub fn is_cache_miss(&self) -> bool {
        matches!(
            self,
            SchemaError::CacheDigestMismatch { .. } | SchemaError::Serialization { .. }
        )
    }
}

impl From<config::ConfigError> for SchemaError {
    fn from(err: config::ConfigError) -> Self {
        SchemaError::Config(err.to_string())
    }
}

/// Wrap a connection error raised while introspecting `table`
pub(crate) fn query_failed(table: &str, err: ConnectionError) -> SchemaError {
    SchemaError::introspection(table, err)
}

pub type Result<T> = std::result::Result<T, SchemaError>;
