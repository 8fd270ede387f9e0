//! CLI configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// File holding the hex private key used for signing
    pub key_file: Option<PathBuf>,

    /// `tracing` filter directive, e.g. `info` or `ledger_core=debug`
    pub log_filter: String,

    /// Emit log lines as JSON
    pub json_logs: bool,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            key_file: None,
            log_filter: "warn".to_string(),
            json_logs: false,
            pretty: true,
        }
    }
}

impl CliConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signing key file
    pub fn with_key_file(mut self, path: PathBuf) -> Self {
        self.key_file = Some(path);
        self
    }

    /// Set the log filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;

        let config: CliConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).map_err(|source| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid("log_filter must not be empty".to_string()));
        }

        EnvFilter::try_new(&self.log_filter)
            .map_err(|e| ConfigError::Invalid(format!("log_filter: {}", e)))?;

        if let Some(path) = &self.key_file {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("key_file must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.log_filter, "warn");
        assert!(config.key_file.is_none());
        assert!(config.pretty);
    }

    #[test]
    fn test_config_builder() {
        let config = CliConfig::new()
            .with_key_file(PathBuf::from("/tmp/key"))
            .with_log_filter("ledger_core=debug")
            .with_pretty(false);

        assert_eq!(config.key_file, Some(PathBuf::from("/tmp/key")));
        assert_eq!(config.log_filter, "ledger_core=debug");
        assert!(!config.pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = CliConfig::new().with_log_filter("  ");
        assert!(config.validate().is_err());

        let config = CliConfig::new().with_key_file(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.toml");

        let config = CliConfig::new()
            .with_key_file(dir.path().join("signer.key"))
            .with_log_filter("debug");
        config.save_to_file(&path).unwrap();

        let loaded = CliConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, "pretty = false\n").unwrap();

        let loaded = CliConfig::load_from_file(&path).unwrap();
        assert!(!loaded.pretty);
        assert_eq!(loaded.log_filter, "warn");
    }

    #[test]
    fn test_missing_file() {
        let err = CliConfig::load_from_file("/nonexistent/ledger.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
