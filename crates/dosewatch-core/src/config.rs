//! TOML-based application configuration.
//!
//! Stores:
//! - Reminder tuning (grace period, miss threshold)
//! - Twilio credentials for the notification gateway
//!
//! Configuration is stored at `~/.config/dosewatch/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::store::data_dir;

/// Reminder workflow tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderSection {
    /// Wait after the initial call before checking confirmation.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
    /// Unconfirmed-cycle count at which a miss escalates to an alert text.
    #[serde(default = "default_miss_threshold")]
    pub miss_threshold: u32,
}

/// Twilio credentials for the shipped gateway adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// E.164 number calls and texts originate from.
    #[serde(default)]
    pub from_number: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dosewatch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminder: ReminderSection,
    #[serde(default)]
    pub twilio: TwilioConfig,
}

fn default_grace_period_secs() -> u64 {
    300
}
fn default_miss_threshold() -> u32 {
    3
}

impl Default for ReminderSection {
    fn default() -> Self {
        Self {
            grace_period_secs: default_grace_period_secs(),
            miss_threshold: default_miss_threshold(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reminder: ReminderSection::default(),
            twilio: TwilioConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: "~/.config/dosewatch".into(),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or unreadable.
    pub fn load() -> Self {
        Self::path()
            .ok()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|text| toml::from_str(&text).ok())
            .unwrap_or_default()
    }

    /// Persist configuration to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, text).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value by key (CLI surface).
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "grace_period_secs" => Some(self.reminder.grace_period_secs.to_string()),
            "miss_threshold" => Some(self.reminder.miss_threshold.to_string()),
            "account_sid" => Some(self.twilio.account_sid.clone()),
            "auth_token" => Some(self.twilio.auth_token.clone()),
            "from_number" => Some(self.twilio.from_number.clone()),
            _ => None,
        }
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "grace_period_secs" => {
                self.reminder.grace_period_secs =
                    value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("expected seconds, got '{value}'"),
                    })?;
            }
            "miss_threshold" => {
                self.reminder.miss_threshold =
                    value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("expected a count, got '{value}'"),
                    })?;
            }
            "account_sid" => self.twilio.account_sid = value.to_string(),
            "auth_token" => self.twilio.auth_token = value.to_string(),
            "from_number" => self.twilio.from_number = value.to_string(),
            _ => {
                return Err(ConfigError::MissingKey(key.to_string()));
            }
        }
        self.save()
    }
}
