//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What ingestion does with a line that is not a valid record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Abort the run with `MalformedRecord`
    #[default]
    Fail,
    /// Log, count and drop the line; it takes no offset
    Skip,
}

impl MalformedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedPolicy::Fail => "fail",
            MalformedPolicy::Skip => "skip",
        }
    }
}

impl std::str::FromStr for MalformedPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(MalformedPolicy::Fail),
            "skip" => Ok(MalformedPolicy::Skip),
            other => Err(ConfigError::Invalid(format!(
                "malformed policy must be \"fail\" or \"skip\", got {:?}",
                other
            ))),
        }
    }
}

/// Block engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root for `databases/` and `blocks/`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Records per block
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Field separator in source lines
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default)]
    pub malformed: MalformedPolicy,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("tsblock"))
        .unwrap_or_else(|| PathBuf::from("./tsblock_data"))
}

fn default_block_size() -> usize {
    1000
}

fn default_delimiter() -> char {
    ','
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            block_size: default_block_size(),
            delimiter: default_delimiter(),
            malformed: MalformedPolicy::default(),
        }
    }
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Builder: records per block
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Builder: malformed line policy
    pub fn malformed(mut self, policy: MalformedPolicy) -> Self {
        self.malformed = policy;
        self
    }

    /// Builder: field separator
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Directory holding one database per source
    pub fn databases_dir(&self) -> PathBuf {
        self.data_dir.join("databases")
    }

    /// Database file for a source
    pub fn database_path(&self, source: &str) -> PathBuf {
        self.databases_dir().join(format!("data_{}.db", source))
    }

    /// Block namespace for a source
    pub fn blocks_dir(&self, source: &str) -> PathBuf {
        self.data_dir.join("blocks").join(source)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::Invalid("block_size must be at least 1".into()));
        }
        if self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(ConfigError::Invalid(
                "delimiter cannot be a line terminator".into(),
            ));
        }
        if self.delimiter.is_ascii_digit() || self.delimiter == '-' {
            return Err(ConfigError::Invalid(format!(
                "delimiter {:?} would collide with integer fields",
                self.delimiter
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })?;
        config.storage.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.storage.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tsblock").join("config.toml")),
            Some(PathBuf::from("./tsblock.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = std::env::var("TSBLOCK_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(size) = std::env::var("TSBLOCK_BLOCK_SIZE") {
            match size.parse() {
                Ok(n) => self.storage.block_size = n,
                Err(_) => tracing::warn!("Ignoring invalid TSBLOCK_BLOCK_SIZE={:?}", size),
            }
        }
        if let Ok(policy) = std::env::var("TSBLOCK_MALFORMED") {
            match policy.parse() {
                Ok(p) => self.storage.malformed = p,
                Err(e) => tracing::warn!("Ignoring TSBLOCK_MALFORMED: {}", e),
            }
        }

        if let Ok(level) = std::env::var("TSBLOCK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TSBLOCK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for crate::storage::StorageError {
    fn from(err: ConfigError) -> Self {
        crate::storage::StorageError::Config(err.to_string())
    }
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# tsblock Configuration
#
# Environment variables override these settings:
# - TSBLOCK_DATA_DIR
# - TSBLOCK_BLOCK_SIZE
# - TSBLOCK_MALFORMED
# - TSBLOCK_LOG_LEVEL
# - TSBLOCK_LOG_FORMAT

[storage]
# Root directory; holds databases/ and blocks/
data_dir = "~/.local/share/tsblock"

# Records per block
block_size = 1000

# Field separator in source lines
delimiter = ","

# Malformed lines: "fail" aborts the run, "skip" drops the line and continues
malformed = "fail"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
