//! Configuration management for fortum-sync
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{Result, SyncError};
use crate::fortum::Locale;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod defaults;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "FORTUM_SYNC_CONFIG";

/// Environment variable overriding `fortum.session_token`
pub const SESSION_TOKEN_ENV: &str = "FORTUM_SYNC_SESSION_TOKEN";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider API access
    pub fortum: FortumConfig,

    /// Polling schedule
    pub schedule: ScheduleConfig,

    /// Statistics import
    pub statistics: StatisticsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Provider API access parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FortumConfig {
    /// Market locale (FI, SV or NO); selects URLs and currency
    pub locale: String,

    /// Session token obtained from a logged-in browser session
    pub session_token: String,

    /// Metering point numbers to query
    pub metering_points: Vec<String>,

    /// Time series resolution requested from the API
    pub resolution: String,

    /// How many days back each fetch covers
    pub lookback_days: u32,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Polling schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local time of day (HH:MM) after which yesterday's data is expected
    pub publication_time: String,

    /// Minutes between coordinator ticks; also the retry cadence while
    /// waiting for yesterday's data
    pub update_interval_minutes: u64,

    /// IANA time zone used for calendar dates and the publication threshold
    pub timezone: String,
}

/// Statistics import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Whether fetched data is imported as statistics at all
    pub enabled: bool,

    /// Source name recorded in statistic metadata
    pub source: String,

    /// Statistic id of the energy series
    pub energy_statistic_id: String,

    /// Statistic id of the cost series
    pub cost_statistic_id: String,

    /// Display name of the energy series
    pub energy_name: String,

    /// Display name of the cost series
    pub cost_name: String,

    /// Readings that make up a complete hour (4 for 15-minute data)
    pub samples_per_hour: u32,

    /// Apply the completeness gate to the cost series as well
    pub gate_cost_series: bool,

    /// JSON file backing the statistics store; empty keeps it in memory
    pub store_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console level override
    pub console_level: Option<String>,

    /// Optional file level override
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the environment-selected or default locations
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::load_default_locations()?,
        };

        if let Ok(token) = std::env::var(SESSION_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            config.fortum.session_token = token;
        }

        Ok(config)
    }

    fn load_default_locations() -> Result<Self> {
        let default_paths = [
            "fortum_sync.yaml",
            "/data/fortum_sync.yaml",
            "/etc/fortum-sync/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.fortum.locale()?;

        if self.fortum.lookback_days == 0 {
            return Err(SyncError::validation(
                "fortum.lookback_days",
                "Must be greater than 0",
            ));
        }

        if self.fortum.request_timeout_secs == 0 {
            return Err(SyncError::validation(
                "fortum.request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        self.schedule.publication_time()?;
        self.schedule.timezone()?;

        if self.schedule.update_interval_minutes == 0 {
            return Err(SyncError::validation(
                "schedule.update_interval_minutes",
                "Must be greater than 0",
            ));
        }

        if self.statistics.energy_statistic_id.trim().is_empty() {
            return Err(SyncError::validation(
                "statistics.energy_statistic_id",
                "Statistic id cannot be empty",
            ));
        }

        if self.statistics.cost_statistic_id.trim().is_empty() {
            return Err(SyncError::validation(
                "statistics.cost_statistic_id",
                "Statistic id cannot be empty",
            ));
        }

        if self.statistics.energy_statistic_id == self.statistics.cost_statistic_id {
            return Err(SyncError::validation(
                "statistics.cost_statistic_id",
                "Must differ from the energy statistic id",
            ));
        }

        if self.statistics.samples_per_hour == 0 {
            return Err(SyncError::validation(
                "statistics.samples_per_hour",
                "Must be greater than 0",
            ));
        }

        if self.statistics.enabled {
            match self.fortum.samples_per_hour() {
                Some(expected) if expected != self.statistics.samples_per_hour => {
                    return Err(SyncError::validation(
                        "statistics.samples_per_hour".to_string(),
                        format!(
                            "Resolution {} delivers {} readings per hour, not {}",
                            self.fortum.resolution, expected, self.statistics.samples_per_hour
                        ),
                    ));
                }
                Some(_) => {}
                None => {
                    return Err(SyncError::validation(
                        "fortum.resolution".to_string(),
                        format!(
                            "Hourly statistics need a 15-minute or hourly resolution, got {}",
                            self.fortum.resolution
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl FortumConfig {
    /// Parsed market locale
    pub fn locale(&self) -> Result<Locale> {
        self.locale.parse()
    }

    /// Readings per hour delivered at the configured resolution, if the
    /// resolution is sub-daily
    pub fn samples_per_hour(&self) -> Option<u32> {
        match self.resolution.trim().to_ascii_uppercase().as_str() {
            "FIFTEEN_MINUTE" | "QUARTER_HOUR" | "PER_15_MIN" | "15MIN" => Some(4),
            "HOUR" => Some(1),
            _ => None,
        }
    }
}

impl ScheduleConfig {
    /// Parsed publication threshold
    pub fn publication_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.publication_time.trim(), "%H:%M").map_err(|e| {
            SyncError::validation(
                "schedule.publication_time".to_string(),
                format!("Expected HH:MM, got '{}': {}", self.publication_time, e),
            )
        })
    }

    /// Parsed time zone
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            SyncError::validation("schedule.timezone".to_string(), e.to_string())
        })
    }

    /// Interval between coordinator ticks
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_minutes.saturating_mul(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fortum.locale, "FI");
        assert_eq!(config.schedule.publication_time, "15:00");
        assert_eq!(config.schedule.update_interval_minutes, 30);
        assert_eq!(config.statistics.samples_per_hour, 4);
        assert!(config.statistics.gate_cost_series);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.fortum.locale = "DE".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.schedule.publication_time = "25:00".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.schedule.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_schedule_helpers() {
        let schedule = ScheduleConfig::default();
        assert_eq!(
            schedule.publication_time().unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap()
        );
        assert_eq!(schedule.timezone().unwrap(), chrono_tz::Europe::Helsinki);
        assert_eq!(schedule.update_interval(), Duration::from_secs(1800));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "fortum:\n  locale: SV\nschedule:\n  publication_time: \"14:30\"\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.fortum.locale, "SV");
        assert_eq!(config.fortum.lookback_days, 2);
        assert_eq!(config.schedule.publication_time, "14:30");
        assert_eq!(config.schedule.update_interval_minutes, 30);
        assert!(config.validate().is_ok());
    }
}
