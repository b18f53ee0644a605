//! Configuration management for Podium.
//!
//! Provides configuration loading from TOML files with support for
//! multiple file locations and defaults for every optional section.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::model::{TIMESTAMP_FORMAT, UserId};
use crate::schedule::ScheduleWindow;

#[cfg(test)]
mod tests;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path to the configuration file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML parse error.
        source: toml::de::Error,
    },

    /// No configuration file exists in any searched location.
    #[error(
        "no config file found \
         (tried PODIUM_CONFIG, ./config.toml, ~/.config/podium/config.toml)"
    )]
    NotFound,

    /// The file parsed but its values are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// The conference this deployment serves. Required.
    pub conference: ConferenceConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,

    /// Database location.
    #[serde(default)]
    pub storage: Option<StorageConfig>,

    /// Reminder timing.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Optional file logging. When absent, logs go to stdout only.
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

/// Conference name, site and time window.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConferenceConfig {
    pub name: String,

    #[serde(default)]
    pub url: Option<String>,

    /// First moment a report may start, `dd/mm/YYYY HH:MM:SS`.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub starts_at: NaiveDateTime,

    /// Last moment a report may start.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub ends_at: NaiveDateTime,

    /// Offset of conference-local time from UTC, in hours.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl ConferenceConfig {
    /// Bounds a schedule row's start time must fall within.
    pub fn window(&self) -> ScheduleWindow {
        ScheduleWindow {
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        }
    }

    /// The conference-local offset. Falls back to UTC for out-of-range
    /// values, which [`Config::validate`] rejects anyway.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

fn default_utc_offset_hours() -> i32 {
    3
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(|e| {
        serde::de::Error::custom(format!("'{raw}' is not a {TIMESTAMP_FORMAT} timestamp: {e}"))
    })
}

/// Telegram bot configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. The `TELEGRAM_BOT_TOKEN` environment variable takes precedence.
    #[serde(default)]
    pub token: Option<String>,

    /// User ids allowed to upload the schedule and export evaluations.
    #[serde(default)]
    pub admins: Vec<UserId>,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StorageConfig {
    /// Database URL, e.g. `sqlite:podium.db`. Defaults to the user config directory.
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Timing of the reminder scheduler and message self-deletion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// How long before a report starts the reminder goes out.
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: i64,

    /// Delay after a day's last report before the daily digest.
    #[serde(default = "default_day_grace_minutes")]
    pub day_grace_minutes: i64,

    /// Delay after the conference end before the final digest.
    #[serde(default = "default_conference_grace_hours")]
    pub conference_grace_hours: i64,

    #[serde(default = "default_reminder_ttl_secs")]
    pub reminder_ttl_secs: u64,

    #[serde(default = "default_broadcast_ttl_secs")]
    pub broadcast_ttl_secs: u64,

    #[serde(default = "default_export_ttl_secs")]
    pub export_ttl_secs: u64,
}

impl NotificationConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn reminder_ttl(&self) -> Duration {
        Duration::from_secs(self.reminder_ttl_secs)
    }

    pub fn broadcast_ttl(&self) -> Duration {
        Duration::from_secs(self.broadcast_ttl_secs)
    }

    pub fn export_ttl(&self) -> Duration {
        Duration::from_secs(self.export_ttl_secs)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            lead_minutes: default_lead_minutes(),
            day_grace_minutes: default_day_grace_minutes(),
            conference_grace_hours: default_conference_grace_hours(),
            reminder_ttl_secs: default_reminder_ttl_secs(),
            broadcast_ttl_secs: default_broadcast_ttl_secs(),
            export_ttl_secs: default_export_ttl_secs(),
        }
    }
}

const MINUTES_PER_YEAR: i64 = 365 * 24 * 60;
const HOURS_PER_YEAR: i64 = 365 * 24;

/// Reminder periods must be positive and at most a year.
fn check_period(name: &str, value: i64, max: i64) -> Result<(), ConfigError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be within 1..={max}, got {value}"
        )))
    }
}

fn default_tick_secs() -> u64 {
    15
}

fn default_lead_minutes() -> i64 {
    10
}

fn default_day_grace_minutes() -> i64 {
    60
}

fn default_conference_grace_hours() -> i64 {
    48
}

fn default_reminder_ttl_secs() -> u64 {
    7
}

fn default_broadcast_ttl_secs() -> u64 {
    3
}

fn default_export_ttl_secs() -> u64 {
    60
}

/// Log file rotation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// File logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Directory for log files.
    #[serde(default = "default_log_directory")]
    pub directory: String,

    /// Number of rotated files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub rotation: Rotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            max_files: default_max_files(),
            rotation: Rotation::default(),
        }
    }
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_max_files() -> usize {
    7
}

impl Config {
    /// Load configuration from file system.
    ///
    /// Priority order:
    /// 1. `path`, when given
    /// 2. PODIUM_CONFIG environment variable
    /// 3. ./config.toml (local directory)
    /// 4. ~/.config/podium/config.toml (user config)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if no file exists, and the errors of
    /// [`Config::load_from`] for the file that was found.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        if let Ok(path) = std::env::var("PODIUM_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Self::load_from(p);
            }
        }

        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Self::load_from(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config/podium/config.toml");
            if user_config.exists() {
                return Self::load_from(user_config);
            }
        }

        Err(ConfigError::NotFound)
    }

    /// Load and validate configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read,
    /// [`ConfigError::ParseError`] if it is not valid TOML, and
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that TOML parsing cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let conference = &self.conference;
        if conference.starts_at > conference.ends_at {
            return Err(ConfigError::Invalid(format!(
                "conference.starts_at ({}) is after conference.ends_at ({})",
                conference.starts_at, conference.ends_at
            )));
        }
        if !(-23..=23).contains(&conference.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "conference.utc_offset_hours must be within -23..=23, got {}",
                conference.utc_offset_hours
            )));
        }
        let n = &self.notifications;
        if n.tick_secs == 0 {
            return Err(ConfigError::Invalid(
                "notifications.tick_secs must be positive".to_string(),
            ));
        }
        check_period("notifications.lead_minutes", n.lead_minutes, MINUTES_PER_YEAR)?;
        check_period(
            "notifications.day_grace_minutes",
            n.day_grace_minutes,
            MINUTES_PER_YEAR,
        )?;
        check_period(
            "notifications.conference_grace_hours",
            n.conference_grace_hours,
            HOURS_PER_YEAR,
        )?;
        Ok(())
    }

    /// Whether `user` may upload schedules and export evaluations.
    pub fn is_admin(&self, user: UserId) -> bool {
        self.telegram
            .as_ref()
            .is_some_and(|t| t.admins.contains(&user))
    }
}
