//! Engine configuration loaded from environment variables
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add custom-date fire time and snooze interval
//! - 1.0.0: Initial implementation with database path and log filter

use anyhow::{Context, Result};
use chrono::NaiveTime;
use std::env;

/// Default time-of-day for custom-date occurrences (local midnight).
const DEFAULT_CUSTOM_FIRE_TIME: &str = "00:00";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite reminder store (`:memory:` for a throwaway store)
    pub database_path: String,
    /// Default log filter when RUST_LOG is not set
    pub log_level: String,
    /// Time-of-day at which custom-date occurrences fire
    pub custom_fire_time: NaiveTime,
    /// How far a snooze pushes a reminder forward
    pub snooze_minutes: i64,
    /// How long a banner stays visible before it is swept
    pub banner_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Every variable has a default, so an empty environment yields a
    /// working configuration.
    pub fn from_env() -> Result<Self> {
        let database_path =
            env::var("CHIME_DATABASE_PATH").unwrap_or_else(|_| "chime.db".to_string());
        let log_level = env::var("CHIME_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let custom_fire_time = env::var("CHIME_CUSTOM_FIRE_TIME")
            .unwrap_or_else(|_| DEFAULT_CUSTOM_FIRE_TIME.to_string());
        let custom_fire_time = NaiveTime::parse_from_str(&custom_fire_time, "%H:%M")
            .with_context(|| format!("CHIME_CUSTOM_FIRE_TIME is not HH:MM: {custom_fire_time}"))?;

        let snooze_minutes = env::var("CHIME_SNOOZE_MINUTES")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<i64>()
            .context("CHIME_SNOOZE_MINUTES is not a number")?;

        let banner_timeout_secs = env::var("CHIME_BANNER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<u64>()
            .context("CHIME_BANNER_TIMEOUT_SECS is not a number")?;

        Ok(Config {
            database_path,
            log_level,
            custom_fire_time,
            snooze_minutes,
            banner_timeout_secs,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: ":memory:".to_string(),
            log_level: "info".to_string(),
            custom_fire_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            snooze_minutes: 10,
            banner_timeout_secs: 15,
        }
    }
}
