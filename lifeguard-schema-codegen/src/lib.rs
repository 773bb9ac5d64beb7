//! Lifeguard Schema Codegen
//!
//! Renders an inferred [`Schema`] into a `LifeModel` entity struct and writes
//! it to disk, either replacing the whole file or syncing only the generated
//! struct inside a file that carries hand-written code.
//!
//! ```no_run
//! use lifeguard_schema::mock::MockConnection;
//! use lifeguard_schema::{CacheConfig, SchemaCache};
//! use lifeguard_schema_codegen::{regenerate, RenderMode};
//!
//! let cache = SchemaCache::new(CacheConfig::new("target/lifeguard-schema"));
//! let conn = MockConnection::postgres("postgres://localhost/app");
//! let outcome = regenerate(&cache, &conn, "users", "src/entities/user.rs", RenderMode::Sync)?;
//! println!("user.rs: {outcome:?}");
//! # Ok::<(), lifeguard_schema_codegen::CodegenError>(())
//! ```

pub mod entity;
pub mod error;
pub mod sync;
pub mod writer;

pub use entity::{RenderedEntity, RenderedField};
pub use error::{CodegenError, Result};
pub use sync::{locate, sync_source, Region};
pub use writer::EntityWriter;

use lifeguard_schema::{Connection, Schema, SchemaCache};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// How generated source meets an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Overwrite the whole file
    Replace,
    /// Rewrite only the generated struct, keep everything else
    #[default]
    Sync,
}

/// What [`write_entity`] did on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Source text for `schema`
///
/// Sync mode needs the current file contents; without them there is no region
/// to patch and the call fails rather than producing a whole new file.
pub fn generate_source(schema: &Schema, mode: RenderMode, existing: Option<&str>) -> Result<String> {
    let writer = EntityWriter::new();
    match (mode, existing) {
        (RenderMode::Replace, _) => writer.render_file(schema),
        (RenderMode::Sync, Some(existing)) => sync_source(existing, &writer.render(schema)?),
        (RenderMode::Sync, None) => Err(CodegenError::CodeRegionNotFound {
            table: schema.table_name().to_string(),
        }),
    }
}

/// Write the entity for `schema` to `path`
///
/// A missing file is created from a full render in either mode. The file is
/// only rewritten when its contents change.
pub fn write_entity(path: impl AsRef<Path>, schema: &Schema, mode: RenderMode) -> Result<WriteOutcome> {
    let path = path.as_ref();
    let existing = match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(CodegenError::io(path, err)),
    };

    let Some(existing) = existing else {
        let source = generate_source(schema, RenderMode::Replace, None)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CodegenError::io(parent, e))?;
        }
        fs::write(path, source).map_err(|e| CodegenError::io(path, e))?;
        log::info!("created {} for {}", path.display(), schema.source);
        return Ok(WriteOutcome::Created);
    };

    let source = generate_source(schema, mode, Some(&existing))?;
    if source == existing {
        log::debug!("{} is up to date", path.display());
        return Ok(WriteOutcome::Unchanged);
    }
    fs::write(path, source).map_err(|e| CodegenError::io(path, e))?;
    log::info!("updated {} for {} ({:?})", path.display(), schema.source, mode);
    Ok(WriteOutcome::Updated)
}

/// Fetch `table` through the schema cache and write its entity to `path`
pub fn regenerate(
    cache: &SchemaCache,
    conn: &dyn Connection,
    table: &str,
    path: impl AsRef<Path>,
    mode: RenderMode,
) -> Result<WriteOutcome> {
    let schema = cache.fetch(conn, table)?;
    write_entity(path, &schema, mode)
}
