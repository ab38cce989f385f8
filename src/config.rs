//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{BaseStationError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub recording: RecordingConfig,

    #[serde(default)]
    pub status: StatusConfig,
}

/// Radio bridge serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Serial device path; empty probes the default candidates
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Device expiry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_vehicle_timeout_ms")]
    pub vehicle_timeout_ms: u64,

    #[serde(default = "default_beacon_timeout_ms")]
    pub beacon_timeout_ms: u64,

    #[serde(default = "default_buoy_timeout_ms")]
    pub buoy_timeout_ms: u64,
}

/// Session log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecordingConfig {
    #[serde(default)]
    pub enabled_at_start: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

/// Periodic status line configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StatusConfig {
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

// Default value functions
fn default_baud_rate() -> u32 { 115200 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_vehicle_timeout_ms() -> u64 { 10000 }
fn default_beacon_timeout_ms() -> u64 { 30000 }
fn default_buoy_timeout_ms() -> u64 { 10000 }

fn default_log_dir() -> String { "./replay".to_string() }
fn default_flush_interval_ms() -> u64 { 5000 }

fn default_report_interval_ms() -> u64 { 10000 }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            vehicle_timeout_ms: default_vehicle_timeout_ms(),
            beacon_timeout_ms: default_beacon_timeout_ms(),
            buoy_timeout_ms: default_buoy_timeout_ms(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled_at_start: false,
            log_dir: default_log_dir(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

/// Accepted bridge baud rates
const VALID_BAUD_RATES: [u32; 4] = [115200, 230400, 460800, 921600];

/// Accepted range for device timeouts
const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 100..=3_600_000;

/// Accepted range for periodic task intervals
const INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 100..=600_000;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields take their defaults.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sailing_basestation::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Link port may be empty (auto-detect)
        if !VALID_BAUD_RATES.contains(&self.link.baud_rate) {
            return Err(BaseStationError::Config(
                toml::de::Error::custom("baud_rate must be one of: 115200, 230400, 460800, 921600")
            ));
        }

        if self.link.reconnect_interval_ms == 0 || self.link.reconnect_interval_ms > 60000 {
            return Err(BaseStationError::Config(
                toml::de::Error::custom("reconnect_interval_ms must be between 1 and 60000")
            ));
        }

        for (name, value) in [
            ("vehicle_timeout_ms", self.registry.vehicle_timeout_ms),
            ("beacon_timeout_ms", self.registry.beacon_timeout_ms),
            ("buoy_timeout_ms", self.registry.buoy_timeout_ms),
        ] {
            if !TIMEOUT_RANGE_MS.contains(&value) {
                return Err(BaseStationError::Config(
                    toml::de::Error::custom(format!("{} must be between 100 and 3600000", name))
                ));
            }
        }

        if self.recording.log_dir.is_empty() {
            return Err(BaseStationError::Config(
                toml::de::Error::custom("recording log_dir cannot be empty")
            ));
        }

        if !INTERVAL_RANGE_MS.contains(&self.recording.flush_interval_ms) {
            return Err(BaseStationError::Config(
                toml::de::Error::custom("flush_interval_ms must be between 100 and 600000")
            ));
        }

        if !INTERVAL_RANGE_MS.contains(&self.status.report_interval_ms) {
            return Err(BaseStationError::Config(
                toml::de::Error::custom("report_interval_ms must be between 100 and 600000")
            ));
        }

        Ok(())
    }
}
