//! Configuration module for the audit service.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub connection: ConnectionConfig,
    pub logging: LoggingConfig,
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Seconds a writer waits on a locked database before failing.
    pub busy_timeout_secs: u64,
}

/// Reconnection settings used while the store is unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Delay before the first retry (in milliseconds).
    pub initial_backoff_ms: u64,
    /// Upper bound for the delay between retries (in milliseconds).
    pub max_backoff_ms: u64,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Connection attempts before giving up. `0` retries forever.
    pub max_attempts: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/tfm/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("tfm")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("tfm");
        Self {
            path: data_dir.join("auditorias.db"),
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            multiplier: 2.0,
            max_attempts: 5,
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

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"store.max_connections"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- store ---
        if self.store.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "store.path".into(),
                message: "must not be empty".into(),
            });
        }
        if self.store.max_connections == 0 {
            errors.push(ValidationError {
                field: "store.max_connections".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- connection ---
        if self.connection.initial_backoff_ms == 0 {
            errors.push(ValidationError {
                field: "connection.initial_backoff_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.connection.max_backoff_ms < self.connection.initial_backoff_ms {
            errors.push(ValidationError {
                field: "connection.max_backoff_ms".into(),
                message: format!(
                    "max_backoff_ms ({}) must not be below initial_backoff_ms ({})",
                    self.connection.max_backoff_ms, self.connection.initial_backoff_ms
                ),
            });
        }
        if self.connection.multiplier.is_nan() || self.connection.multiplier < 1.0 {
            errors.push(ValidationError {
                field: "connection.multiplier".into(),
                message: "must be at least 1.0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use tfm_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .store_path(PathBuf::from("/var/lib/tfm/auditorias.db"))
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- store ---

    pub fn store_path(mut self, path: PathBuf) -> Self {
        self.config.store.path = path;
        self
    }

    pub fn store_max_connections(mut self, n: u32) -> Self {
        self.config.store.max_connections = n;
        self
    }

    pub fn store_busy_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.store.busy_timeout_secs = seconds;
        self
    }

    // --- connection ---

    pub fn connection_initial_backoff_ms(mut self, ms: u64) -> Self {
        self.config.connection.initial_backoff_ms = ms;
        self
    }

    pub fn connection_max_backoff_ms(mut self, ms: u64) -> Self {
        self.config.connection.max_backoff_ms = ms;
        self
    }

    pub fn connection_multiplier(mut self, multiplier: f64) -> Self {
        self.config.connection.multiplier = multiplier;
        self
    }

    pub fn connection_max_attempts(mut self, n: u32) -> Self {
        self.config.connection.max_attempts = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert!(cfg.store.path.ends_with("tfm/auditorias.db"));
        assert_eq!(cfg.store.max_connections, 5);
        assert_eq!(cfg.store.busy_timeout_secs, 5);
        assert_eq!(cfg.connection.initial_backoff_ms, 500);
        assert_eq!(cfg.connection.max_backoff_ms, 30_000);
        assert_eq!(cfg.connection.max_attempts, 5);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, "pretty");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn default_path_ends_with_tfm_config() {
        assert!(Config::default_path().ends_with("tfm/config.yaml"));
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
store:
  path: /tmp/tfm-test.db
  max_connections: 2
  busy_timeout_secs: 10
connection:
  initial_backoff_ms: 100
  max_backoff_ms: 1000
  multiplier: 3.0
  max_attempts: 0
logging:
  level: debug
  format: json
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.store.path, PathBuf::from("/tmp/tfm-test.db"));
        assert_eq!(cfg.store.max_connections, 2);
        assert_eq!(cfg.store.busy_timeout_secs, 10);
        assert_eq!(cfg.connection.initial_backoff_ms, 100);
        assert_eq!(cfg.connection.max_backoff_ms, 1000);
        assert_eq!(cfg.connection.multiplier, 3.0);
        assert_eq!(cfg.connection.max_attempts, 0);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, "json");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_partial_yaml_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"logging:\n  level: warn\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.logging.format, "pretty");
        assert_eq!(cfg.store.max_connections, 5);
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.store.max_connections, 5);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_max_connections() {
        let mut cfg = Config::default();
        cfg.store.max_connections = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "store.max_connections"));
    }

    #[test]
    fn validate_catches_inverted_backoff_bounds() {
        let mut cfg = Config::default();
        cfg.connection.initial_backoff_ms = 5_000;
        cfg.connection.max_backoff_ms = 1_000;
        let errors = cfg.validate();
        assert!(errors.iter().any(
            |e| e.field == "connection.max_backoff_ms" && e.message.contains("must not be below")
        ));
    }

    #[test]
    fn validate_catches_shrinking_multiplier() {
        let mut cfg = Config::default();
        cfg.connection.multiplier = 0.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "connection.multiplier"));
    }

    #[test]
    fn validate_catches_invalid_logging_values() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".to_string();
        cfg.logging.format = "xml".to_string();
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"logging.level"));
        assert!(fields.contains(&"logging.format"));
    }

    // -- Builder --

    #[test]
    fn builder_overrides_defaults() {
        let cfg = ConfigBuilder::new()
            .store_path(PathBuf::from("/tmp/x.db"))
            .store_max_connections(1)
            .connection_max_attempts(2)
            .logging_format("json")
            .build();
        assert_eq!(cfg.store.path, PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.store.max_connections, 1);
        assert_eq!(cfg.connection.max_attempts, 2);
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn build_validated_reports_errors() {
        let result = ConfigBuilder::new().store_max_connections(0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "store.max_connections: must be greater than 0");
    }
}
