//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The UTC offset used to bucket sessions into local calendar days
//! - Sweep batch size and cadence
//! - Default planned session duration
//!
//! Configuration is stored at `~/.config/studytrack/config.toml`.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// General preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Minutes east of UTC; streaks and daily buckets use this offset.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_planned_minutes")]
    pub default_planned_minutes: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            default_planned_minutes: default_planned_minutes(),
        }
    }
}

/// Recurrence/overdue sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Per-run cap on goals touched by each sweep pass.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
    /// Suggested cadence for external schedulers; the core never owns a
    /// timer.
    #[serde(default = "default_sweep_interval")]
    pub interval_minutes: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
            interval_minutes: default_sweep_interval(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studytrack/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

fn default_planned_minutes() -> u32 {
    25
}

fn default_batch_limit() -> u32 {
    100
}

fn default_sweep_interval() -> u32 {
    60
}

impl Config {
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file does
    /// not exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// The configured local offset. Rejects offsets outside +/-24h at the
    /// setter, so this cannot fail for persisted values.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.general.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
    }

    pub fn set_offset_minutes(&mut self, minutes: i32) -> Result<(), ConfigError> {
        if FixedOffset::east_opt(minutes * 60).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "general.utc_offset_minutes".to_string(),
                message: format!("{minutes} is not a valid UTC offset in minutes"),
            });
        }
        self.general.utc_offset_minutes = minutes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.general.utc_offset_minutes, 0);
        assert_eq!(config.general.default_planned_minutes, 25);
        assert_eq!(config.sweep.batch_limit, 100);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[general]\nutc_offset_minutes = 120\n").unwrap();
        assert_eq!(config.general.utc_offset_minutes, 120);
        assert_eq!(config.sweep.batch_limit, 100);
        assert_eq!(config.offset().local_minus_utc(), 120 * 60);
    }

    #[test]
    fn rejects_absurd_offset() {
        let mut config = Config::default();
        assert!(config.set_offset_minutes(26 * 60).is_err());
        assert!(config.set_offset_minutes(-90).is_ok());
    }
}
