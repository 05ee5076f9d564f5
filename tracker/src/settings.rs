//! Application settings.
//!
//! Loaded from an optional JSON file, then overridden by `TRACKER_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use sheet_sync::SyncConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracker_api::ServerConfig;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "TRACKER_";

/// Errors while loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidOverride { key: String, value: String },
}

/// Settings for both the server and the sync client
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerConfig,
    pub sync: SyncConfig,
}

impl AppSettings {
    /// Load settings from `path` (defaults when absent) and the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(std::env::vars())?;
        Ok(settings)
    }

    /// Read a settings file. A missing file gives defaults and one that
    /// does not parse is logged and replaced by defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match serde_json::from_str::<AppSettings>(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("Failed to parse settings file, using defaults: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// Apply `TRACKER_*` overrides. Unrelated variables are ignored.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "BIND_ADDRESS" => self.server.bind_address = value,
                "PORT" => self.server.port = parse(&key, &value)?,
                "BASE_URL" => self.sync.base_url = value,
                "QUEUE_PATH" => {
                    self.sync.queue_path = (!value.is_empty()).then(|| PathBuf::from(value));
                }
                "SAVE_TIMEOUT_SECS" => self.sync.save_timeout_secs = parse(&key, &value)?,
                "RETRY_INTERVAL_SECS" => {
                    let secs: u64 = parse(&key, &value)?;
                    self.sync.retry_interval_secs = (secs > 0).then_some(secs);
                }
                "NOTIFICATIONS" => self.sync.notifications = parse_bool(&key, &value)?,
                _ => tracing::debug!("Ignoring unknown setting {}", key),
            }
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
