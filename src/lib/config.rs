//! This module loads the client configuration and finds its local paths.
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

/// The directory name used under the local config and data paths.
pub const APPLICATION_NAME: &str = "chunkform";

/// Prefix for environment variables that override the config file.
pub const ENV_PREFIX: &str = "CHUNKFORM";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid base url {0:?}, expected an absolute http or https url")]
    InvalidBaseUrl(String),
    #[error("Failed to find the local {0} path")]
    MissingDirectory(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Where the API lives, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Where `client.log` is written. Defaults to the local data path.
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
}

impl ClientConfig {
    /// Loads the config file, if there is one, then applies environment
    /// overrides. A `base_url` given here wins over both and is the only
    /// value validated.
    pub fn load(config_file_path: &Path, base_url: Option<String>) -> Result<Self, ConfigError> {
        Self::load_with_env(
            config_file_path,
            Environment::with_prefix(ENV_PREFIX),
            base_url,
        )
    }

    fn load_with_env(
        config_file_path: &Path,
        env: Environment,
        base_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_override_option("base_url", base_url)?
            .add_source(
                File::from(config_file_path)
                    .required(false)
                    .format(FileFormat::Toml),
            )
            .add_source(env)
            .build()?
            .try_deserialize::<ClientConfig>()?;

        config.validate()?;

        Ok(config)
    }

    /// Checks that the base URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
            _ => Err(ConfigError::InvalidBaseUrl(self.base_url.clone())),
        }
    }

    pub fn log_directory(&self) -> Result<PathBuf, ConfigError> {
        match &self.log_directory {
            Some(path) => Ok(path.clone()),
            None => default_log_directory(),
        }
    }
}

/// Finds the location of this app's config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_base_path()?
        .join(APPLICATION_NAME)
        .join("config.toml"))
}

/// Finds the location for this app's local data.
pub fn default_log_directory() -> Result<PathBuf, ConfigError> {
    Ok(data_base_path()?.join(APPLICATION_NAME))
}

fn config_base_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        Ok(PathBuf::from(path))
    } else if let Some(home) = dirs::home_dir() {
        Ok(home.join(".config"))
    } else {
        Err(ConfigError::MissingDirectory("config"))
    }
}

fn data_base_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var("XDG_DATA_HOME") {
        Ok(PathBuf::from(path))
    } else if let Some(home) = dirs::home_dir() {
        Ok(home.join(".local/share"))
    } else {
        Err(ConfigError::MissingDirectory("data"))
    }
}
