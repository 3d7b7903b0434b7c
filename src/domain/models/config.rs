use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for skinmarket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Read-side cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-request limits
    #[serde(default)]
    pub requests: RequestConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".skinmarket/skinmarket.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// sqlx connection URL for the configured path.
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for daily-rotated JSON log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Coherent cache configuration.
///
/// TTLs bound how stale a parameterized list or stats entry may become when
/// a write cannot name it for invalidation. Lists change most often and are
/// cheapest to recompute, stats are the most expensive, so
/// `list <= record <= stats` is enforced at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Maximum number of live entries across all namespaces
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,

    /// TTL for single records fetched by id
    #[serde(default = "default_record_ttl_secs")]
    pub record_ttl_secs: u64,

    /// TTL for single records fetched by a secondary unique field
    #[serde(default = "default_record_ttl_secs")]
    pub lookup_ttl_secs: u64,

    /// TTL for cached account balances
    #[serde(default = "default_balance_ttl_secs")]
    pub balance_ttl_secs: u64,

    /// TTL for filtered / paginated lists
    #[serde(default = "default_list_ttl_secs")]
    pub list_ttl_secs: u64,

    /// TTL for aggregate statistics
    #[serde(default = "default_stats_ttl_secs")]
    pub stats_ttl_secs: u64,
}

const fn default_max_capacity() -> u64 {
    10_000
}

const fn default_record_ttl_secs() -> u64 {
    300
}

const fn default_balance_ttl_secs() -> u64 {
    60
}

const fn default_list_ttl_secs() -> u64 {
    120
}

const fn default_stats_ttl_secs() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            record_ttl_secs: default_record_ttl_secs(),
            lookup_ttl_secs: default_record_ttl_secs(),
            balance_ttl_secs: default_balance_ttl_secs(),
            list_ttl_secs: default_list_ttl_secs(),
            stats_ttl_secs: default_stats_ttl_secs(),
        }
    }
}

/// Per-request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RequestConfig {
    /// Deadline applied to each request pipeline, in milliseconds (0 = none)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

const fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RequestConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}
