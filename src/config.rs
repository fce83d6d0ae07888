//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

fn default_data_file() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("energy-index").join("energy.bin").to_string_lossy().to_string())
        .unwrap_or_else(|| "./energy.bin".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

impl StorageConfig {
    /// Snapshot path with a leading `~/` expanded to the home directory
    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.data_file)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Text import configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_has_header")]
    pub has_header: bool,

    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Directory for per-import log files; no logs when unset
    pub log_dir: Option<String>,
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_has_header() -> bool {
    true
}

fn default_timestamp_format() -> String {
    crate::import::DEFAULT_TIMESTAMP_FORMAT.to_string()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: default_has_header(),
            timestamp_format: default_timestamp_format(),
            log_dir: None,
        }
    }
}

impl ImportConfig {
    /// Delimiter as a single byte; falls back to `;` when the setting is unusable
    pub fn delimiter_byte(&self) -> u8 {
        match self.delimiter.as_bytes() {
            [b] => *b,
            _ => {
                tracing::warn!("Invalid delimiter {:?}, using ';'", self.delimiter);
                b';'
            }
        }
    }

    /// Importer configured from these settings
    pub fn importer(&self) -> crate::import::CsvImporter {
        let importer = crate::import::CsvImporter::new()
            .with_delimiter(self.delimiter_byte())
            .with_header(self.has_header)
            .with_timestamp_format(&self.timestamp_format);

        match &self.log_dir {
            Some(dir) => importer.with_log_dir(dir),
            None => importer,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
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
            file: None,
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

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
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
        Ok(config)
    }

    /// Candidate config files, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("energy-index").join("config.toml")),
            Some(PathBuf::from("/etc/energy-index/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load from default locations or environment
    pub fn load_default() -> ConfigDiscovery {
        Self::load_first(&Self::default_paths())
    }

    /// Load the first existing file of `paths` that parses
    ///
    /// Files that exist but fail to load are recorded in the result and
    /// skipped. Without any usable file the config comes from the environment.
    pub fn load_first(paths: &[PathBuf]) -> ConfigDiscovery {
        let mut failures = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    return ConfigDiscovery {
                        config,
                        source: Some(path.clone()),
                        failures,
                    }
                }
                Err(e) => failures.push(e),
            }
        }

        ConfigDiscovery {
            config: Self::from_env(),
            source: None,
            failures,
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_file) = lookup("ENERGY_INDEX_DATA_FILE") {
            self.storage.data_file = data_file;
        }

        if let Some(log_dir) = lookup("ENERGY_INDEX_IMPORT_LOG_DIR") {
            self.import.log_dir = Some(log_dir);
        }

        if let Some(level) = lookup("ENERGY_INDEX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("ENERGY_INDEX_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Result of searching the config locations
///
/// Loading happens before logging is set up, so the outcome is kept here
/// and reported through [`ConfigDiscovery::log`] afterwards.
#[derive(Debug, Default)]
pub struct ConfigDiscovery {
    pub config: Config,
    /// File the config came from; `None` means defaults plus environment
    pub source: Option<PathBuf>,
    /// Files that exist but could not be loaded
    pub failures: Vec<ConfigError>,
}

impl ConfigDiscovery {
    /// A config given explicitly on the command line
    pub fn explicit(config: Config, path: &Path) -> Self {
        Self {
            config,
            source: Some(path.to_path_buf()),
            failures: Vec::new(),
        }
    }

    pub fn log(&self) {
        for failure in &self.failures {
            tracing::warn!("{}, skipping", failure);
        }

        match &self.source {
            Some(path) => tracing::info!("Loaded config from {:?}", path),
            None => tracing::debug!("Using default config with environment overrides"),
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
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Energy Index Configuration
#
# Environment variables override these settings:
# - ENERGY_INDEX_DATA_FILE
# - ENERGY_INDEX_IMPORT_LOG_DIR
# - ENERGY_INDEX_LOG_LEVEL
# - ENERGY_INDEX_LOG_FORMAT

[storage]
# Snapshot file holding the index between runs
data_file = "~/.local/share/energy-index/energy.bin"

[import]
# Field delimiter of the meter export
delimiter = ";"

# Whether the first line is a header
has_header = true

# Timestamp layout (strftime format)
timestamp_format = "%d.%m.%Y %H:%M"

# Directory for per-import log files (disabled when unset)
# log_dir = "./import-logs"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/energy-index/energy-index.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();

        assert_eq!(config.import.delimiter, ";");
        assert!(config.import.has_header);
        assert_eq!(config.import.timestamp_format, "%d.%m.%Y %H:%M");
        assert!(config.import.log_dir.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[import]\ndelimiter = \",\"\n").unwrap();

        assert_eq!(config.import.delimiter_byte(), b',');
        assert!(config.import.has_header);
        assert_eq!(config.logging.level, "info");
        assert!(!config.storage.data_file.is_empty());
    }

    #[test]
    fn test_invalid_delimiter_falls_back() {
        let config = Config::parse("[import]\ndelimiter = \"::\"\n").unwrap();
        assert_eq!(config.import.delimiter_byte(), b';');
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ENERGY_INDEX_DATA_FILE", "/tmp/energy.bin"),
            ("ENERGY_INDEX_IMPORT_LOG_DIR", "/tmp/logs"),
            ("ENERGY_INDEX_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.storage.data_file, "/tmp/energy.bin");
        assert_eq!(config.import.log_dir.as_deref(), Some("/tmp/logs"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_data_path_expands_home() {
        let storage = StorageConfig {
            data_file: "./data/energy.bin".to_string(),
        };
        assert_eq!(storage.data_path(), PathBuf::from("./data/energy.bin"));

        if let Some(home) = dirs::home_dir() {
            let storage = StorageConfig {
                data_file: "~/energy.bin".to_string(),
            };
            assert_eq!(storage.data_path(), home.join("energy.bin"));
        }
    }

    #[test]
    fn test_load_first_skips_broken_files() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let valid = dir.path().join("valid.toml");
        std::fs::write(&broken, "[import\ndelimiter = ").unwrap();
        std::fs::write(&valid, "[import]\ndelimiter = \",\"\n").unwrap();

        let paths = vec![dir.path().join("absent.toml"), broken.clone(), valid.clone()];
        let found = Config::load_first(&paths);

        assert_eq!(found.source.as_deref(), Some(valid.as_path()));
        assert_eq!(found.config.import.delimiter, ",");
        assert_eq!(found.failures.len(), 1);
        assert!(matches!(&found.failures[0], ConfigError::Parse { path, .. } if *path == broken));
    }

    #[test]
    fn test_load_first_without_usable_file() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("config.toml");
        std::fs::write(&broken, "not = [toml").unwrap();

        let found = Config::load_first(&[broken, dir.path().join("absent.toml")]);

        assert!(found.source.is_none());
        assert_eq!(found.failures.len(), 1);
        assert_eq!(found.config.import.delimiter, ";");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();

        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[storage\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
