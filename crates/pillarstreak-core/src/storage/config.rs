//! TOML-based engine configuration.
//!
//! Stores:
//! - Rotation strategy and optional random seed
//! - Day boundary (UTC offset)
//! - History retention window
//! - Completion reward
//!
//! Configuration is stored at `~/.config/pillarstreak/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::calendar::Calendar;
use crate::error::{ConfigError, Result};
use crate::rotation::{StrategyRegistry, ROUND_ROBIN};
use crate::streak::PILLAR_COMPLETED_XP;

/// Rotation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Seed for the weighted-random source. Unset draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Day-boundary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// History retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Reward settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_pillar_completed_xp")]
    pub pillar_completed_xp: u32,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/pillarstreak/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

// Default functions
fn default_strategy() -> String {
    ROUND_ROBIN.into()
}
fn default_retention_days() -> u32 {
    90
}
fn default_pillar_completed_xp() -> u32 {
    PILLAR_COMPLETED_XP
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            seed: None,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            pillar_completed_xp: default_pillar_completed_xp(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => parse_number(value).ok_or_else(|| {
                        invalid(format!("cannot parse '{value}' as number"))
                    })?,
                    // Optional numbers (the seed) are null until set.
                    serde_json::Value::Null => {
                        if value == "none" || value.is_empty() {
                            serde_json::Value::Null
                        } else {
                            parse_number(value).ok_or_else(|| {
                                invalid(format!("cannot parse '{value}' as number"))
                            })?
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Reject values the engine cannot honour.
    ///
    /// Unknown strategy names are rejected here even though the registry
    /// would quietly fall back to round-robin: a typo in the config file
    /// should be visible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !StrategyRegistry::builtin().contains(&self.rotation.strategy) {
            return Err(ConfigError::InvalidValue {
                key: "rotation.strategy".into(),
                message: format!(
                    "unknown strategy '{}' (expected one of {:?})",
                    self.rotation.strategy,
                    StrategyRegistry::builtin().names()
                ),
            });
        }
        if self.calendar.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::InvalidValue {
                key: "calendar.utc_offset_minutes".into(),
                message: "offset must be within ±1439 minutes".into(),
            });
        }
        Ok(())
    }

    /// Day boundary described by this config.
    pub fn calendar(&self) -> Calendar {
        Calendar::with_offset_minutes(self.calendar.utc_offset_minutes)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config is invalid.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<i64>() {
        Some(serde_json::Value::Number(n.into()))
    } else if let Ok(n) = value.parse::<u64>() {
        Some(serde_json::Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
    }
}
