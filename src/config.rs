//! Schema cache configuration
//!
//! [`SchemaConfig::load`] reads the `[schema_cache]` section of
//! `config/config.toml`, then environment variables such as
//! `LIFEGUARD_SCHEMA_CACHE__ENABLED=false`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config/config.toml";
const SECTION: &str = "schema_cache";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

fn default_enabled() -> bool {
    true
}

fn default_directory() -> PathBuf {
    PathBuf::from("target/lifeguard-schema")
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            directory: default_directory(),
            migrations_dir: default_migrations_dir(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("LIFEGUARD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl SchemaConfig {
    /// Load from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from `path` (optional) and the environment
    ///
    /// A missing `[schema_cache]` section yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(environment());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if path.exists() {
                    log::warn!(
                        "Failed to load config file {}, falling back to env: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder().add_source(environment()).build().map_err(|env_err| {
                    ConfigError::Message(format!(
                        "Failed to load configuration from file and env: {}, then env-only error: {}",
                        err, env_err
                    ))
                })?
            }
        };

        match settings.get::<SchemaConfig>(SECTION) {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(SchemaConfig::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Schema cache configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }
}
