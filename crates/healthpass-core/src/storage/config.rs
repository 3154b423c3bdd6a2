//! TOML-based application configuration.
//!
//! Stores user preferences for the notification subsystem:
//! - Whether notifications are enabled at all
//! - The "coming up" pre-alert window
//! - The foreground polling interval
//!
//! Configuration is stored at `~/.config/healthpass/config.toml`.

use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minutes before the anchor at which the "coming up" notice fires.
    /// Zero disables pre-alerts.
    #[serde(default = "default_pre_alert_minutes")]
    pub pre_alert_minutes: u32,
    /// Foreground watch-loop polling interval.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_pre_alert_minutes() -> u32 {
    5
}
fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pre_alert_minutes: default_pre_alert_minutes(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/healthpass/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/healthpass"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// The pre-alert window as a duration.
    pub fn pre_alert(&self) -> Duration {
        Duration::minutes(i64::from(self.notifications.pre_alert_minutes))
    }

    /// Set a config value by dot-separated key. Returns error if the key is
    /// unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        match key {
            "notifications.enabled" => {
                self.notifications.enabled = value.parse().map_err(|_| {
                    invalid(format!("cannot parse '{value}' as bool"))
                })?;
            }
            "notifications.pre_alert_minutes" => {
                self.notifications.pre_alert_minutes = value.parse().map_err(|_| {
                    invalid(format!("cannot parse '{value}' as integer"))
                })?;
            }
            "notifications.poll_interval_secs" => {
                let secs: u64 = value.parse().map_err(|_| {
                    invalid(format!("cannot parse '{value}' as integer"))
                })?;
                if secs == 0 {
                    return Err(invalid("polling interval must be positive".to_string()));
                }
                self.notifications.poll_interval_secs = secs;
            }
            _ => return Err(invalid("unknown config key".to_string())),
        }
        Ok(())
    }
}
