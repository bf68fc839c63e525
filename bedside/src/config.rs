use std::{path::PathBuf, time::Duration};

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Shortest scheduler poll interval, in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Longest delay after sunset or sunrise before the next pair is computed.
pub const MAX_NIGHT_BUFFER_MINUTES: i64 = 24 * 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("poll_interval_ms must be at least {min}, got {0}", min = MIN_POLL_INTERVAL_MS)]
    PollInterval(u64),
    #[error(
        "night_buffer_minutes must be between 0 and {max}, got {0}",
        max = MAX_NIGHT_BUFFER_MINUTES
    )]
    NightBuffer(i64),
}

/// A point on the globe, in degrees. North and east are positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Set from the command line.
    pub latitude: f64,
    pub longitude: f64,

    pub assets_dir: PathBuf,
    /// Where the preview display writes its frames.
    pub output_dir: PathBuf,

    pub queue_capacity: usize,
    pub settle_secs: u64,
    /// 0 turns periodic redraws off.
    pub redraw_interval_secs: u64,
    pub poll_interval_ms: u64,
    /// Delay after the later of sunrise and sunset before the next pair is
    /// computed.
    pub night_buffer_minutes: i64,

    pub weather_url: String,
    pub http_timeout_secs: u64,

    pub pet: PetConfig,
    pub clock: ClockConfig,
    pub tree: TreeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            assets_dir: PathBuf::from("assets"),
            output_dir: PathBuf::from("frames"),
            queue_capacity: bedside_core::queue::DEFAULT_CAPACITY,
            settle_secs: 2,
            redraw_interval_secs: 6 * 60 * 60,
            poll_interval_ms: 1000,
            night_buffer_minutes: 5,
            weather_url: "https://api.open-meteo.com".to_string(),
            http_timeout_secs: 30,
            pet: PetConfig::default(),
            clock: ClockConfig::default(),
            tree: TreeConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub const fn location(&self) -> Location {
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    #[must_use]
    pub const fn redraw_interval(&self) -> Option<Duration> {
        match self.redraw_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Check the settings that have no sensible meaning outside a range.
    ///
    /// # Errors
    ///
    /// The first setting that is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::PollInterval(self.poll_interval_ms));
        }
        if !(0..=MAX_NIGHT_BUFFER_MINUTES).contains(&self.night_buffer_minutes) {
            return Err(ConfigError::NightBuffer(self.night_buffer_minutes));
        }

        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    #[must_use]
    pub fn night_buffer(&self) -> TimeDelta {
        TimeDelta::minutes(
            self.night_buffer_minutes
                .clamp(0, MAX_NIGHT_BUFFER_MINUTES),
        )
    }

    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetConfig {
    pub sleep_at: NaiveTime,
    pub wake_at: NaiveTime,
    pub z: i32,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            sleep_at: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default(),
            wake_at: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            z: -99,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub enabled: bool,
    /// Top left corner of the first glyph.
    pub x: u32,
    pub y: u32,
    pub period_secs: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            x: 560,
            y: 24,
            period_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub enabled: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
