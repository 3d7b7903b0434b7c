use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory, relative to the working directory.
pub const CONFIG_DIR: &str = ".skinmarket";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid cache max_capacity: {0}. Must be at least 1")]
    InvalidCacheCapacity(u64),

    #[error("Invalid {0}: must be greater than 0")]
    ZeroTtl(&'static str),

    #[error(
        "Invalid cache TTLs: list_ttl_secs ({list}) <= record_ttl_secs ({record}) <= stats_ttl_secs ({stats}) must hold"
    )]
    TtlOrdering { list: u64, record: u64, stats: u64 },
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .skinmarket/config.yaml (project config, created by init)
    /// 3. .skinmarket/local.yaml (project local overrides, optional)
    /// 4. Environment variables (SKINMARKET_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("SKINMARKET_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
            .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml")))
            .merge(Env::prefixed("SKINMARKET_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let cache = &config.cache;
        if cache.max_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity(cache.max_capacity));
        }

        let ttls = [
            ("record_ttl_secs", cache.record_ttl_secs),
            ("lookup_ttl_secs", cache.lookup_ttl_secs),
            ("balance_ttl_secs", cache.balance_ttl_secs),
            ("list_ttl_secs", cache.list_ttl_secs),
            ("stats_ttl_secs", cache.stats_ttl_secs),
        ];
        if let Some((name, _)) = ttls.iter().find(|(_, ttl)| *ttl == 0) {
            return Err(ConfigError::ZeroTtl(name));
        }

        if cache.list_ttl_secs > cache.record_ttl_secs || cache.record_ttl_secs > cache.stats_ttl_secs {
            return Err(ConfigError::TtlOrdering {
                list: cache.list_ttl_secs,
                record: cache.record_ttl_secs,
                stats: cache.stats_ttl_secs,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".skinmarket/skinmarket.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cache.stats_ttl_secs, 600);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /custom/market.db
  max_connections: 5
logging:
  level: debug
  format: pretty
cache:
  list_ttl_secs: 30
requests:
  timeout_ms: 250
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/custom/market.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.cache.list_ttl_secs, 30);
        assert_eq!(config.cache.record_ttl_secs, 300, "Unset fields keep their defaults");
        assert_eq!(config.requests.timeout_ms, 250);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel error, got {other}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_database_section() {
        let mut config = Config::default();
        config.database.path = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyDatabasePath
        ));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxConnections(0)
        ));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.cache.balance_ttl_secs = 0;

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ZeroTtl(name) => assert_eq!(name, "balance_ttl_secs"),
            other => panic!("Expected ZeroTtl error, got {other}"),
        }
    }

    #[test]
    fn test_validate_ttl_ordering() {
        let mut config = Config::default();
        config.cache.list_ttl_secs = config.cache.record_ttl_secs + 1;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::TtlOrdering { .. }
        ));

        let mut config = Config::default();
        config.cache.stats_ttl_secs = config.cache.record_ttl_secs - 1;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::TtlOrdering { .. }
        ));
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = Config::default();
        config.cache.max_capacity = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidCacheCapacity(0)
        ));
    }

    #[test]
    fn test_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: info\n  format: json").unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("SKINMARKET_LOGGING__LEVEL", Some("debug")),
                ("SKINMARKET_CACHE__LIST_TTL_SECS", Some("15")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.logging.level, "debug", "Env should beat the file");
                assert_eq!(config.logging.format, "json");
                assert_eq!(config.cache.list_ttl_secs, 15);
            },
        );
    }

    #[test]
    fn test_env_override_is_validated() {
        let file = NamedTempFile::new().unwrap();
        temp_env::with_var("SKINMARKET_DATABASE__MAX_CONNECTIONS", Some("0"), || {
            assert!(ConfigLoader::load_from_file(file.path()).is_err());
        });
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "database:\n  max_connections: 4\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "database:\n  max_connections: 8\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.database.max_connections, 8, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
