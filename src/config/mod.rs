//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod publish;
mod storage;

pub use publish::{PublishConfig, SchedulerConfig};
pub use storage::{StorageConfig, StorageType};

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "galley.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "GALLEY_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "GALLEY";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "GALLEY_LOG";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Content store configuration.
    pub content: ContentConfig,
    /// Publish retry and timeout configuration.
    pub publish: PublishConfig,
    /// Publish scheduler configuration.
    pub scheduler: SchedulerConfig,
    /// Capability lists.
    pub permissions: PermissionsConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `galley.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("permissions.approvers")
                    .with_list_parse_key("permissions.publishers"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Config for tests: in-memory storage, no scheduler, everyone allowed.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig {
                storage_type: StorageType::Memory,
                ..Default::default()
            },
            scheduler: SchedulerConfig {
                enabled: false,
                ..Default::default()
            },
            permissions: PermissionsConfig {
                allow_all: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Content store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Root directory holding `live/` and `collections/`.
    pub root: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: "./data/content".to_string(),
        }
    }
}

/// Who may approve and publish.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Grant every capability to every actor. Development only.
    pub allow_all: bool,
    /// Emails allowed to review and approve.
    pub approvers: Vec<String>,
    /// Emails allowed to trigger and resolve publishes.
    pub publishers: Vec<String>,
}
