//! Client configuration persisted as TOML under the app directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_dirs;

/// Default filename used to store the client configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Backend used when no configuration file exists yet.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Persisted client settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the attendance backend.
    pub backend_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

/// Errors raised while loading or saving the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The app directory could not be resolved or created.
    #[error("No usable config directory: {0}")]
    ConfigDir(#[from] app_dirs::AppDirError),
    /// Reading the config file failed.
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Serializing the config to TOML failed.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Writing the config file failed.
    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from disk, returning defaults if the file is missing.
pub fn load_or_default() -> Result<ClientConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load configuration from an explicit path, returning defaults if missing.
pub fn load_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Save configuration to the default location and return the path written.
pub fn save(config: &ClientConfig) -> Result<PathBuf, ConfigError> {
    let path = config_path()?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to an explicit path.
pub fn save_to(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ClientConfig {
            backend_url: "https://attendance.example.edu".to_string(),
        };
        save_to(&config, &path).unwrap();
        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "backend_url = \"http://api:9000\"\nextra = 1\n").unwrap();
        let config = load_from(&path).unwrap();
        assert_eq!(config.backend_url, "http://api:9000");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "backend_url = [not toml").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
