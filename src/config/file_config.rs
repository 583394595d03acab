//! Configuration file support for kitopen.
//!
//! The file is plain TOML mirroring [`Config`]; every key is optional and
//! environment variables (`KITOPEN_*`, nested keys joined with `__`) take
//! precedence when loaded through [`super::load_config`].
//!
//! # Configuration File Format
//!
//! ```toml
//! base_url = "https://publikationen.bibliothek.kit.edu"
//! search_url = "https://publikationen.bibliothek.kit.edu/auswertungen/report.php"
//! batching = "year_split"
//! prefetch = 1
//!
//! [defaults]
//! default_author = "MUSTERMANN, M*"
//! default_start = "2000"
//! default_end = ""
//! default_view = "basic"
//!
//! [http]
//! request_timeout_secs = 60
//! connect_timeout_secs = 10
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// A configuration file on disk and its parsed contents
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    pub config: Config,
}

impl ConfigFile {
    /// Load configuration from a TOML file, without environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        let config = toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// A file at `path` holding the built-in defaults
    pub fn create_default(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Config::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        toml::to_string_pretty(&self.config).map_err(|e| ConfigFileError::Serialize(e.to_string()))
    }

    /// Save configuration to the file, creating parent directories
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let content = self.to_toml()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(&self.path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
