//! Inference pipeline: introspect, then compile

use crate::connection::Connection;
use crate::error::SchemaError;
use crate::introspect::introspect;
use crate::schema::{FieldOverride, Schema};

/// Infer the canonical schema of `table`, bypassing any cache
pub fn infer_schema(conn: &dyn Connection, table: &str) -> Result<Schema, SchemaError> {
    let raw = introspect(conn, table)?;
    let schema = Schema::from_table(&raw);
    log::debug!(
        "Inferred schema for {} ({} fields, primary key {:?})",
        schema.source,
        schema.len(),
        schema.primary_key.fields
    );
    Ok(schema)
}

/// Infer `table` and apply caller-declared field overrides
pub fn infer_schema_with(
    conn: &dyn Connection,
    table: &str,
    overrides: &[FieldOverride],
) -> Result<Schema, SchemaError> {
    infer_schema(conn, table)?.apply_overrides(overrides)
}
