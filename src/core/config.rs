//! Configuration management for the document gateway
//!
//! Settings are layered: defaults, then an optional TOML file, then `DOCGW_*`
//! environment variables. The binary applies command line overrides last and
//! calls [`Config::validate`] before anything starts.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "doc-gateway.toml";

/// Available document store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Process-local in-memory store
    Memory,
}

impl std::str::FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(StorageType::Memory),
            other => Err(Error::config(format!(
                "Invalid storage type: {}. Valid options: memory",
                other
            ))),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: SocketAddr,

    /// Largest request body the body parser accepts, in bytes
    pub max_body_size: usize,

    /// Number of runtime worker threads (0 = one per CPU)
    pub worker_threads: usize,

    /// Allowed CORS origins (empty = any origin)
    pub cors_origins: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type
    pub storage_type: StorageType,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 3345)),
            max_body_size: 1024,
            worker_threads: 0,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, or from `doc-gateway.toml`
    /// when it exists, then apply environment overrides.
    ///
    /// An explicit path that cannot be read is an error; the implicit file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Config::default(),
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(addr) = lookup("DOCGW_HTTP_ADDR") {
            self.server.http_addr = addr
                .parse()
                .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;
        }

        if let Some(size) = lookup("DOCGW_MAX_BODY_SIZE") {
            self.server.max_body_size = size
                .parse()
                .map_err(|e| Error::config(format!("Invalid max body size: {}", e)))?;
        }

        if let Some(workers) = lookup("DOCGW_WORKER_THREADS") {
            self.server.worker_threads = workers
                .parse()
                .map_err(|e| Error::config(format!("Invalid worker threads: {}", e)))?;
        }

        if let Some(level) = lookup("DOCGW_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("DOCGW_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.max_body_size == 0 {
            return Err(Error::config("Max body size must be greater than zero"));
        }

        if self.server.worker_threads > 1024 {
            return Err(Error::config("Too many worker threads (maximum 1024)"));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(Error::config(format!("Invalid log level: {}", other))),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            other => return Err(Error::config(format!("Invalid log format: {}", other))),
        }

        Ok(())
    }

    /// Get the number of runtime worker threads to start
    pub fn optimal_worker_threads(&self) -> usize {
        if self.server.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.server.worker_threads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.http_addr.port(), 3345);
        assert_eq!(config.server.max_body_size, 1024);
        assert_eq!(config.storage.storage_type, StorageType::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            http_addr = "0.0.0.0:9000"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.http_addr.port(), 9000);
        assert_eq!(config.server.max_body_size, 1024);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nstorage_type = \"memory\"\n[server]\nmax_body_size = 4096").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.max_body_size, 4096);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = Config::load(Some(Path::new("/nonexistent/doc-gateway.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_storage_type_rejected() {
        let result = Config::from_toml("[storage]\nstorage_type = \"disk\"");
        assert!(result.is_err());
        assert!("disk".parse::<StorageType>().is_err());
        assert_eq!("memory".parse::<StorageType>().unwrap(), StorageType::Memory);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DOCGW_HTTP_ADDR", "127.0.0.1:8088"),
            ("DOCGW_MAX_BODY_SIZE", "2048"),
            ("DOCGW_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.http_addr.port(), 8088);
        assert_eq!(config.server.max_body_size, 2048);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "DOCGW_WORKER_THREADS").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.max_body_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.worker_threads = 4096;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_optimal_worker_threads() {
        let mut config = Config::default();
        assert!(config.optimal_worker_threads() >= 1);

        config.server.worker_threads = 3;
        assert_eq!(config.optimal_worker_threads(), 3);
    }
}
