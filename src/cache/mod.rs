//! Schema cache
//!
//! Two tiers keyed by (connection identity, table): an in-process map of
//! shared entries over per-table JSON files. An entry is only served while
//! the digest of the migration directory matches the digest it was stored
//! with; any mismatch or unreadable file is a miss.
//!
//! ```no_run
//! use lifeguard_schema::cache::{CacheConfig, SchemaCache};
//! use lifeguard_schema::mock::MockConnection;
//!
//! let cache = SchemaCache::new(CacheConfig::new("target/lifeguard-schema"));
//! cache.init()?;
//! let conn = MockConnection::sqlite("sqlite://app.db");
//! let report = cache.warm_up(&conn, &["users", "posts"])?;
//! println!("{} tables cached", report.succeeded.len());
//! # Ok::<(), lifeguard_schema::SchemaError>(())
//! ```

pub mod digest;
pub mod store;

pub use digest::{empty_digest, migrations_digest};
pub use store::{CacheEntry, FORMAT_VERSION};

use crate::config::SchemaConfig;
use crate::connection::Connection;
use crate::error::SchemaError;
use crate::inference::infer_schema;
use crate::introspect::AdapterKind;
use crate::schema::Schema;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Cache settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false every lookup misses and nothing is stored
    pub enabled: bool,
    /// Root of the persisted tier
    pub directory: PathBuf,
    /// Migration directory used for connections that do not name their own
    pub migrations_dir: PathBuf,
}

impl CacheConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        SchemaConfig::default().into()
    }
}

impl From<SchemaConfig> for CacheConfig {
    fn from(config: SchemaConfig) -> Self {
        Self {
            enabled: config.enabled,
            directory: config.directory,
            migrations_dir: config.migrations_dir,
        }
    }
}

/// Outcome of a batch warm-up or refresh
#[derive(Debug, Default)]
pub struct WarmUpReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, SchemaError)>,
}

impl WarmUpReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

type EntryKey = (String, String);

/// Digest-validated schema cache
pub struct SchemaCache {
    config: CacheConfig,
    entries: RwLock<HashMap<EntryKey, Arc<CacheEntry>>>,
}

impl SchemaCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Build a cache from `config/config.toml` and the environment
    pub fn from_config() -> Result<Self, SchemaError> {
        Ok(Self::new(SchemaConfig::load()?.into()))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Create the cache directory
    pub fn init(&self) -> Result<(), SchemaError> {
        if self.config.enabled {
            fs::create_dir_all(&self.config.directory).map_err(|e| SchemaError::io(&self.config.directory, e))?;
            log::debug!("Schema cache initialised at {}", self.config.directory.display());
        }
        Ok(())
    }

    /// Drop the in-memory tier; persisted entries stay
    pub fn teardown(&self) {
        self.write_entries().clear();
    }

    /// Cached schema for `table`, if one is stored against the current digest
    pub fn get(&self, conn: &dyn Connection, table: &str) -> Option<Schema> {
        if !self.config.enabled {
            return None;
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::cache_span("get", table).entered();

        let identity = conn.identity();
        let current = match self.current_digest(conn) {
            Ok(digest) => digest,
            Err(e) => {
                log::warn!("Cannot digest migrations for {}: {}", table, e);
                return None;
            }
        };

        let hit = self.lookup(&identity, table, &current).map(|entry| entry.schema.clone());

        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_lookup(hit.is_some());

        if hit.is_some() {
            log::debug!("Schema cache hit for {}", table);
        } else {
            log::debug!("Schema cache miss for {}", table);
        }
        hit
    }

    /// Store `schema` for `table` against the current migration digest
    ///
    /// Does nothing when the cache is disabled.
    pub fn put(&self, conn: &dyn Connection, table: &str, schema: &Schema) -> Result<(), SchemaError> {
        if !self.config.enabled {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::cache_span("put", table).entered();

        let identity = conn.identity();
        let digest = self.current_digest(conn)?;
        let entry = CacheEntry::new(&identity, table, digest, schema.clone());

        store::write_entry(&self.entry_path(&identity, table), &entry)?;
        self.write_entries()
            .insert((identity, table.to_string()), Arc::new(entry));
        Ok(())
    }

    /// Cached schema, or infer it and store the result
    ///
    /// A failure to store is logged; the inferred schema is still returned.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnsupportedAdapter` or
    /// `SchemaError::IntrospectionFailed` from inference.
    pub fn fetch(&self, conn: &dyn Connection, table: &str) -> Result<Schema, SchemaError> {
        AdapterKind::from_engine(conn.engine())?;

        if let Some(schema) = self.get(conn, table) {
            return Ok(schema);
        }

        let schema = infer_schema(conn, table)?;
        if let Err(e) = self.put(conn, table, &schema) {
            log::warn!("Failed to cache schema for {}: {}", table, e);
        }
        Ok(schema)
    }

    /// Fetch every table, collecting per-table failures
    ///
    /// # Errors
    ///
    /// Only an unsupported adapter fails the whole batch.
    pub fn warm_up(&self, conn: &dyn Connection, tables: &[&str]) -> Result<WarmUpReport, SchemaError> {
        AdapterKind::from_engine(conn.engine())?;

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::cache_span("warm_up", &tables.join(",")).entered();

        let mut report = WarmUpReport::default();
        for table in tables {
            match self.fetch(conn, table) {
                Ok(_) => report.succeeded.push(table.to_string()),
                Err(e) => {
                    log::warn!("Schema warm-up failed for {}: {}", table, e);
                    report.failed.push((table.to_string(), e));
                }
            }
        }
        log::debug!(
            "Schema warm-up: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Drop every entry for this connection, in memory and on disk
    pub fn clear(&self, conn: &dyn Connection) -> Result<(), SchemaError> {
        let identity = conn.identity();
        self.write_entries().retain(|(id, _), _| *id != identity);
        store::clear_identity_dir(&store::identity_dir(&self.config.directory, &identity))
    }

    /// Drop every entry for every connection
    ///
    /// Only identity directories and the entry files inside them are removed;
    /// the cache root and anything else stored there are left in place.
    pub fn clear_all(&self) -> Result<(), SchemaError> {
        self.write_entries().clear();
        for dir in store::identity_dirs(&self.config.directory)? {
            store::clear_identity_dir(&dir)?;
        }
        Ok(())
    }

    /// Re-infer `tables`, or every table cached for this connection
    pub fn refresh(&self, conn: &dyn Connection, tables: Option<&[&str]>) -> Result<WarmUpReport, SchemaError> {
        AdapterKind::from_engine(conn.engine())?;

        let identity = conn.identity();
        let tables: Vec<String> = match tables {
            Some(tables) => tables.iter().map(|t| t.to_string()).collect(),
            None => self.cached_tables(&identity)?,
        };

        for table in &tables {
            self.write_entries().remove(&(identity.clone(), table.clone()));
            store::remove_entry(&self.entry_path(&identity, table))?;
        }

        let names: Vec<&str> = tables.iter().map(String::as_str).collect();
        self.warm_up(conn, &names)
    }

    /// File backing the entry for (`identity`, `table`)
    ///
    /// Stable across runs, so build scripts can register it as an input.
    pub fn entry_path(&self, identity: &str, table: &str) -> PathBuf {
        store::entry_file(&store::identity_dir(&self.config.directory, identity), table)
    }

    /// `cargo:rerun-if-changed` lines for the given tables and the migration
    /// directory
    pub fn rerun_directives(&self, conn: &dyn Connection, tables: &[&str]) -> Vec<String> {
        let identity = conn.identity();
        let mut lines: Vec<String> = tables
            .iter()
            .map(|table| format!("cargo:rerun-if-changed={}", self.entry_path(&identity, table).display()))
            .collect();
        lines.push(format!("cargo:rerun-if-changed={}", self.migrations_dir(conn).display()));
        lines
    }

    /// Print [`SchemaCache::rerun_directives`] for a build script
    pub fn emit_rerun_directives(&self, conn: &dyn Connection, tables: &[&str]) {
        for line in self.rerun_directives(conn, tables) {
            println!("{}", line);
        }
    }

    fn migrations_dir(&self, conn: &dyn Connection) -> PathBuf {
        conn.migrations_dir()
            .unwrap_or_else(|| self.config.migrations_dir.clone())
    }

    fn current_digest(&self, conn: &dyn Connection) -> Result<String, SchemaError> {
        migrations_digest(&self.migrations_dir(conn))
    }

    fn lookup(&self, identity: &str, table: &str, current: &str) -> Option<Arc<CacheEntry>> {
        let key = (identity.to_string(), table.to_string());

        let cached = self.read_entries().get(&key).cloned();
        if let Some(entry) = cached {
            if entry.digest == current {
                return Some(entry);
            }
            log::debug!("{}", stale(table, &entry.digest, current));
            self.write_entries().remove(&key);
        }

        let path = self.entry_path(identity, table);
        match store::read_entry(&path) {
            Ok(Some(entry)) if entry.identity != identity || entry.table != table => {
                log::warn!("Ignoring cache file {} written for another table or connection", path.display());
                None
            }
            Ok(Some(entry)) if entry.digest != current => {
                log::debug!("{}", stale(table, &entry.digest, current));
                None
            }
            Ok(Some(entry)) => {
                let entry = Arc::new(entry);
                self.write_entries().insert(key, Arc::clone(&entry));
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Unreadable schema cache entry: {}", e);
                None
            }
        }
    }

    fn cached_tables(&self, identity: &str) -> Result<Vec<String>, SchemaError> {
        let mut tables: Vec<String> = self
            .read_entries()
            .keys()
            .filter(|(id, _)| id == identity)
            .map(|(_, table)| table.clone())
            .collect();

        for path in store::entry_files(&store::identity_dir(&self.config.directory, identity))? {
            match store::read_entry(&path) {
                Ok(Some(entry)) => tables.push(entry.table),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable cache entry {}: {}", path.display(), e),
            }
        }

        tables.sort();
        tables.dedup();
        Ok(tables)
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<EntryKey, Arc<CacheEntry>>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<EntryKey, Arc<CacheEntry>>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn stale(table: &str, stored: &str, current: &str) -> SchemaError {
    SchemaError::CacheDigestMismatch {
        table: table.to_string(),
        stored: stored.to_string(),
        current: current.to_string(),
    }
}
