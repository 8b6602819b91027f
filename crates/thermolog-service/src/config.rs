//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thermolog_store::{MAX_PARTITION_NAME_LEN, RetryConfig, ScanOptions};

/// Server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Query tuning.
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path is not empty and the table prefix yields valid partition names
    /// - Query span, page size and retry delays are within bounds
    ///
    /// # Example
    ///
    /// ```
    /// use thermolog_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.query.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
                Ok(_) => {}
            },
        }

        errors
    }
}

/// Default partition table prefix.
pub const DEFAULT_TABLE_PREFIX: &str = "rpi-temperature-";

/// Length of the `YYYY-MM-DD` suffix appended to the prefix.
const DATE_SUFFIX_LEN: usize = 10;

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
    /// Prefix of every partition name; the ISO date is appended.
    pub table_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: thermolog_store::default_db_path(),
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }

        if let Some(c) = self
            .table_prefix
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            errors.push(ValidationError::new(
                "storage.table_prefix",
                format!(
                    "invalid character '{}': only letters, digits, '_', '-' and '.' are allowed",
                    c
                ),
            ));
        } else if self.table_prefix.len() + DATE_SUFFIX_LEN > MAX_PARTITION_NAME_LEN {
            errors.push(ValidationError::new(
                "storage.table_prefix",
                format!(
                    "prefix is too long (maximum {} characters)",
                    MAX_PARTITION_NAME_LEN - DATE_SUFFIX_LEN
                ),
            ));
        }

        errors
    }
}

/// Maximum span of a range query, in days.
pub const MAX_SPAN_DAYS_LIMIT: u32 = 366;

/// Query configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Calendar days a range query may cover, counted back from its end date.
    pub max_span_days: u32,
    /// Records examined per store page.
    pub page_size: u32,
    /// Stop scanning a partition after this many readings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scan_results: Option<usize>,
    /// Retry policy for failed store pages.
    pub retry: RetrySettings,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_span_days: 7,
            page_size: thermolog_store::DEFAULT_PAGE_SIZE,
            max_scan_results: None,
            retry: RetrySettings::default(),
        }
    }
}

impl QueryConfig {
    /// Validate query configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(1..=MAX_SPAN_DAYS_LIMIT).contains(&self.max_span_days) {
            errors.push(ValidationError::new(
                "query.max_span_days",
                format!(
                    "span of {} days is out of range (1-{})",
                    self.max_span_days, MAX_SPAN_DAYS_LIMIT
                ),
            ));
        }

        if self.page_size == 0 {
            errors.push(ValidationError::new(
                "query.page_size",
                "page size must be at least 1",
            ));
        }

        if self.max_scan_results == Some(0) {
            errors.push(ValidationError::new(
                "query.max_scan_results",
                "result cap must be at least 1 (omit it for no cap)",
            ));
        }

        errors.extend(self.retry.validate());
        errors
    }

    /// Scanner options for these settings.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            page_size: self.page_size,
            max_results: self.max_scan_results,
            retry: self.retry.to_retry_config(),
        }
    }
}

/// Retry settings as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on the backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl RetrySettings {
    /// Validate retry settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.initial_delay_ms > self.max_delay_ms {
            errors.push(ValidationError::new(
                "query.retry.initial_delay_ms",
                format!(
                    "initial delay {}ms exceeds max delay {}ms",
                    self.initial_delay_ms, self.max_delay_ms
                ),
            ));
        }
        errors
    }

    /// Convert to the store's retry policy.
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `query.retry.max_delay_ms`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("thermolog")
        .join("server.toml")
}
