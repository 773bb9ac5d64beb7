//! # Lifeguard Schema
//!
//! Schema inference for Lifeguard ORM: introspect a live Postgres or SQLite
//! table, compile it into a database-agnostic [`Schema`], and keep that schema
//! cached against a digest of the migration directory.
//!
//! Entity source generation from a [`Schema`] lives in the
//! `lifeguard-schema-codegen` crate.
//!
//! ```no_run
//! use lifeguard_schema::{CacheConfig, SchemaCache};
//! use lifeguard_schema::mock::MockConnection;
//!
//! let cache = SchemaCache::new(CacheConfig::new("target/lifeguard-schema"));
//! let conn = MockConnection::postgres("postgres://localhost/app");
//! let users = cache.fetch(&conn, "users")?;
//! println!("{} has {} fields", users.source, users.len());
//! # Ok::<(), lifeguard_schema::SchemaError>(())
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod inference;
pub mod introspect;
pub mod metrics;
pub mod mock;
pub mod schema;
pub mod types;

pub use cache::{CacheConfig, CacheEntry, SchemaCache, WarmUpReport};
pub use config::SchemaConfig;
pub use connection::{Connection, ConnectionError, DbValue, Row};
pub use error::{Result, SchemaError};
pub use inference::{infer_schema, infer_schema_with};
pub use introspect::{introspect, AdapterKind, ReferentialAction, Table};
pub use schema::{Field, FieldMeta, FieldOverride, ForeignKey, Index, Indices, PrimaryKey, Schema};
pub use types::{compile_column, compile_default, compile_type, try_compile_type, CanonicalType, DefaultValue};
