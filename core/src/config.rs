use crate::errors::{MedQueryError, MedQueryResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used under the config and data directories
pub const APP_NAME: &str = "medquery";

/// Environment variable holding the backend base URL
pub const BACKEND_URL_ENV: &str = "MEDQUERY_BACKEND_URL";

const DEFAULT_PLACEHOLDER_INTERVAL_MS: u64 = 3_500;
const DEFAULT_WIDTH: usize = 80;

/// Configuration struct for the chat client
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub backend_url: Option<String>,
    pub storage_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub placeholder_interval_ms: Option<u64>,
    pub show_citations: Option<bool>,
    pub width: Option<usize>,
}

impl ClientConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> MedQueryResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            MedQueryError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| MedQueryError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> MedQueryResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            MedQueryError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                MedQueryError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            MedQueryError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Configuration taken from the environment (and a `.env` file if present)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            backend_url: std::env::var(BACKEND_URL_ENV)
                .ok()
                .filter(|url| !url.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Loads the default config file and layers the environment on top of it
    pub fn load() -> MedQueryResult<Self> {
        let file_config = Self::load_from_file(&get_default_config_file(APP_NAME)?)?;
        Ok(file_config.merge(&Self::from_env()))
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            backend_url: other.backend_url.clone().or_else(|| self.backend_url.clone()),
            storage_file: other
                .storage_file
                .clone()
                .or_else(|| self.storage_file.clone()),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
            placeholder_interval_ms: other
                .placeholder_interval_ms
                .or(self.placeholder_interval_ms),
            show_citations: other.show_citations.or(self.show_citations),
            width: other.width.or(self.width),
        }
    }

    /// Backend base URL. Missing configuration only fails here, at first use.
    pub fn backend_url(&self) -> MedQueryResult<&str> {
        self.backend_url.as_deref().ok_or_else(|| {
            MedQueryError::ConfigError(format!(
                "Backend URL is not configured; set {} or pass --backend-url",
                BACKEND_URL_ENV
            ))
        })
    }

    pub fn placeholder_interval(&self) -> Duration {
        Duration::from_millis(
            self.placeholder_interval_ms
                .unwrap_or(DEFAULT_PLACEHOLDER_INTERVAL_MS),
        )
    }

    pub fn show_citations(&self) -> bool {
        self.show_citations.unwrap_or(false)
    }

    pub fn width(&self) -> usize {
        self.width.unwrap_or(DEFAULT_WIDTH)
    }

    /// File backing the persisted session id
    pub fn storage_path(&self) -> MedQueryResult<PathBuf> {
        match &self.storage_file {
            Some(path) => Ok(path.clone()),
            None => get_default_storage_file(APP_NAME),
        }
    }
}

/// Helper function to get default config directory
fn get_default_config_dir(app_name: &str) -> MedQueryResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        MedQueryError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> MedQueryResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}

/// Helper function to get the default key-value storage file
pub fn get_default_storage_file(app_name: &str) -> MedQueryResult<PathBuf> {
    let data_dir = dirs::data_local_dir().ok_or_else(|| {
        MedQueryError::ConfigError("Could not determine local data directory".to_string())
    })?;

    Ok(data_dir.join(app_name).join("storage.json"))
}
