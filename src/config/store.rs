//! Durable storage for `AppConfig`.
//!
//! Config location:
//!   packaged build:  <exe dir>/AppData/config.json
//!   development run: <user config dir>/HdSome/config.json
//!
//! Loading never fails — a missing or unreadable file yields the defaults
//! plus a status describing why. Values that don't fit the schema fall back
//! to their defaults one at a time. Saving always rewrites the whole document.

use super::AppConfig;
use crate::fsutil::write_atomic;
use crate::host_env::HostEnvironment;
use serde_json::Value;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";

/// Resolve the config file location for this environment.
pub fn config_path(env: &HostEnvironment) -> PathBuf {
    let dir = if env.is_packaged {
        env.exe_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("AppData")
    } else {
        env.user_config_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&env.app_name)
    };
    dir.join(CONFIG_FILE_NAME)
}

/// How `load` obtained its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    Loaded,
    /// No file yet — first run.
    Missing,
    /// Valid JSON, but the listed values (JSON pointers) didn't fit and
    /// were replaced by their defaults. Everything else was kept.
    Repaired(Vec<String>),
    /// File present but unreadable or not a JSON object.
    Corrupt(String),
}

/// Result of `ConfigStore::load`.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: AppConfig,
    pub status: ConfigStatus,
}

impl ConfigLoad {
    /// True when nothing usable was read, so the file should be written
    /// fresh. A repaired document still carries the user's values.
    pub fn used_defaults(&self) -> bool {
        matches!(self.status, ConfigStatus::Missing | ConfigStatus::Corrupt(_))
    }
}

/// Reads and writes `config.json` at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_env(env: &HostEnvironment) -> Self {
        Self::new(config_path(env))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> ConfigLoad {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("[CONFIG] No config at {}, using defaults", self.path.display());
                return ConfigLoad {
                    config: AppConfig::default(),
                    status: ConfigStatus::Missing,
                };
            }
            Err(e) => {
                log::warn!("[CONFIG] Failed to read config: {}, using defaults", e);
                return ConfigLoad {
                    config: AppConfig::default(),
                    status: ConfigStatus::Corrupt(e.to_string()),
                };
            }
        };

        let raw = match serde_json::from_str::<Value>(&contents) {
            Ok(raw) if raw.is_object() => raw,
            Ok(_) => {
                log::warn!("[CONFIG] Config root is not an object, using defaults");
                return ConfigLoad {
                    config: AppConfig::default(),
                    status: ConfigStatus::Corrupt("config root is not an object".to_string()),
                };
            }
            Err(e) => {
                log::warn!("[CONFIG] Failed to parse config: {}, using defaults", e);
                return ConfigLoad {
                    config: AppConfig::default(),
                    status: ConfigStatus::Corrupt(e.to_string()),
                };
            }
        };

        let (config, rejected) = AppConfig::from_value_lenient(&raw);
        if rejected.is_empty() {
            log::debug!("[CONFIG] Loaded from {}", self.path.display());
            return ConfigLoad {
                config,
                status: ConfigStatus::Loaded,
            };
        }
        log::warn!(
            "[CONFIG] Invalid values in {} replaced by defaults: {}",
            self.path.display(),
            rejected.join(", ")
        );
        ConfigLoad {
            config,
            status: ConfigStatus::Repaired(rejected),
        }
    }

    /// Overwrite the config file with `config`.
    pub async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, json.as_bytes())
            .await
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;
        log::info!("[CONFIG] Saved to {}", self.path.display());
        Ok(())
    }

    /// Load, mutate, save. Returns the document that was written.
    pub async fn update<F>(&self, mutate: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.load().await.config;
        mutate(&mut config);
        self.save(&config).await?;
        Ok(config)
    }

    /// Switch storage to a custom root. The path must be absolute.
    pub async fn set_custom_storage_path(&self, path: &str) -> Result<AppConfig, ConfigError> {
        let trimmed = path.trim();
        if trimmed.is_empty() || !Path::new(trimmed).is_absolute() {
            return Err(ConfigError::InvalidCustomPath(path.to_string()));
        }
        let trimmed = trimmed.to_string();
        self.update(move |config| {
            config.file_storage.custom_path = Some(trimmed);
            config.file_storage.use_custom_path = true;
        })
        .await
    }

    pub async fn reset_to_default_storage_path(&self) -> Result<AppConfig, ConfigError> {
        self.update(|config| {
            config.file_storage.custom_path = None;
            config.file_storage.use_custom_path = false;
        })
        .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to write config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Custom storage path must be a non-empty absolute path, got {0:?}")]
    InvalidCustomPath(String),

    #[error("Folder name must be a single path component, got {0:?}")]
    InvalidFolderName(String),
}
