//! Configuration management.

mod file_config;

pub use file_config::{ConfigFile, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::search::{BatchingKind, SearchDefaults};

/// Root of the KITopen publication database
pub const DEFAULT_BASE_URL: &str = "https://publikationen.bibliothek.kit.edu";

/// The report endpoint that serves CSV-in-ZIP exports
pub const DEFAULT_SEARCH_URL: &str = "https://publikationen.bibliothek.kit.edu/auswertungen/report.php";

/// Prefix of environment variable overrides, e.g. `KITOPEN_PREFETCH=2` or
/// `KITOPEN_HTTP__REQUEST_TIMEOUT_SECS=120`
pub const ENV_PREFIX: &str = "KITOPEN";

/// Application configuration.
///
/// Built once and shared read-only between all searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URL of the publication database
    pub base_url: String,

    /// Export endpoint queried by every batch
    pub search_url: String,

    /// How a search is split into requests
    pub batching: BatchingKind,

    /// Number of upcoming batches to request in the background (0 = strictly lazy)
    pub prefetch: usize,

    /// Where export archives are extracted (system temp directory when unset)
    pub temp_dir: Option<PathBuf>,

    /// Values for options a search leaves unset
    pub defaults: SearchDefaults,

    pub http: HttpConfig,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            batching: BatchingKind::default(),
            prefetch: 0,
            temp_dir: None,
            defaults: SearchDefaults::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Deadline for a single export request, response body included
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_secs)
    }

    /// Check the values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("base_url", &self.base_url), ("search_url", &self.search_url)] {
            url::Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{} \"{}\": {}", name, value, e)))?;
        }

        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request deadline in seconds
    pub request_timeout_secs: u64,

    pub connect_timeout_secs: u64,

    /// Overrides the default `kitopen/<version>` user agent
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            user_agent: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,

    /// `"json"` for structured output, anything else for human-readable lines
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a file, with environment overrides on top
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Get the configuration from the first config file found (if any) and
/// environment variables, falling back to the built-in defaults
pub fn get_config() -> Result<Config, ConfigError> {
    if let Some(path) = find_config_file() {
        return load_config(&path);
    }

    let settings = config::Config::builder().add_source(environment()).build()?;
    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// `./kitopen.toml`, then `<config dir>/kitopen/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("kitopen.toml");
    if local.is_file() {
        return Some(local);
    }

    default_config_path().filter(|path| path.is_file())
}

/// Where `kitopen config init` writes by default
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kitopen").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::AuthorFilter;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(config.batching, BatchingKind::NoSplit);
        assert_eq!(config.prefetch, 0);
        assert!(config.temp_dir.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.defaults.default_start, "2000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kitopen.toml");
        std::fs::write(
            &path,
            r#"
batching = "year_split"
prefetch = 2

[defaults]
default_author = "KOPMANN, A*"
default_view = "full"

[http]
request_timeout_secs = 120
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.batching, BatchingKind::YearSplit);
        assert_eq!(config.prefetch, 2);
        assert_eq!(config.defaults.default_author, AuthorFilter::from("KOPMANN, A*"));
        assert_eq!(config.defaults.default_view.name(), "full");
        assert_eq!(config.http.request_timeout_secs, 120);
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.search_url, DEFAULT_SEARCH_URL);
    }

    #[test]
    fn test_load_config_rejects_bad_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kitopen.toml");
        std::fs::write(&path, "search_url = \"not a url\"\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_config_rejects_unknown_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kitopen.toml");
        std::fs::write(&path, "[defaults]\ndefault_view = \"everything\"\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let mut config = Config::default();
        config.http.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
