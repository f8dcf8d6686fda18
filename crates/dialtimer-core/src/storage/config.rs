//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Countdown ceiling (12 or 24 hours) and dial quantization step
//! - Dial geometry and drag sensitivity
//! - Particle field tuning
//!
//! Configuration is stored at `~/.config/dialtimer/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::dial::MapperTuning;
use crate::error::{ConfigError, Result};
use crate::particles::FieldConfig;

/// Countdown configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Longest settable countdown. 12 or 24.
    #[serde(default = "default_max_hours")]
    pub max_hours: u32,
    /// Dial release rounds to this. 15 or 30.
    #[serde(default = "default_quantize_step_secs")]
    pub quantize_step_secs: u32,
}

/// Dial layout and drag sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialConfig {
    /// Layout used by hosts that do not compute their own.
    #[serde(default = "default_center_x")]
    pub center_x: f64,
    #[serde(default = "default_center_y")]
    pub center_y: f64,
    #[serde(default = "default_inner_radius")]
    pub inner_radius: f64,
    #[serde(default = "default_outer_radius")]
    pub outer_radius: f64,
    #[serde(default = "default_ms_per_speed")]
    pub ms_per_speed: f64,
    #[serde(default = "default_max_adjust_ms")]
    pub max_adjust_ms: f64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dialtimer/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub dial: DialConfig,
    #[serde(default)]
    pub particles: FieldConfig,
}

// Default functions
fn default_max_hours() -> u32 {
    12
}
fn default_quantize_step_secs() -> u32 {
    15
}
fn default_center_x() -> f64 {
    400.0
}
fn default_center_y() -> f64 {
    385.0
}
fn default_inner_radius() -> f64 {
    150.0
}
fn default_outer_radius() -> f64 {
    250.0
}
fn default_ms_per_speed() -> f64 {
    60_000.0
}
fn default_max_adjust_ms() -> f64 {
    120_000.0
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            max_hours: default_max_hours(),
            quantize_step_secs: default_quantize_step_secs(),
        }
    }
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            center_x: default_center_x(),
            center_y: default_center_y(),
            inner_radius: default_inner_radius(),
            outer_radius: default_outer_radius(),
            ms_per_speed: default_ms_per_speed(),
            max_adjust_ms: default_max_adjust_ms(),
        }
    }
}

impl Config {
    pub fn max_time_ms(&self) -> u64 {
        u64::from(self.timer.max_hours) * 60 * 60 * 1000
    }

    pub fn quantize_step_ms(&self) -> u64 {
        u64::from(self.timer.quantize_step_secs) * 1000
    }

    pub fn mapper_tuning(&self) -> MapperTuning {
        MapperTuning {
            ms_per_speed: self.dial.ms_per_speed,
            max_adjust_ms: self.dial.max_adjust_ms,
        }
    }

    /// Reject values the engine and field cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &str, message: &str) -> ConfigError {
            ConfigError::InvalidValue {
                key: key.into(),
                message: message.into(),
            }
        }

        if !matches!(self.timer.max_hours, 12 | 24) {
            return Err(invalid("timer.max_hours", "must be 12 or 24"));
        }
        if !matches!(self.timer.quantize_step_secs, 15 | 30) {
            return Err(invalid("timer.quantize_step_secs", "must be 15 or 30"));
        }
        if !(self.dial.inner_radius >= 0.0 && self.dial.inner_radius < self.dial.outer_radius) {
            return Err(invalid(
                "dial.inner_radius",
                "must be non-negative and below dial.outer_radius",
            ));
        }
        if !(self.dial.ms_per_speed >= 0.0 && self.dial.max_adjust_ms >= 0.0) {
            return Err(invalid("dial.max_adjust_ms", "sensitivity must be non-negative"));
        }
        let p = &self.particles;
        if !(p.damping > 0.0 && p.damping <= 1.0) {
            return Err(invalid("particles.damping", "must be in (0, 1]"));
        }
        if !(p.min_speed >= 0.0 && p.min_speed <= p.max_speed) {
            return Err(invalid("particles.min_speed", "must be in [0, particles.max_speed]"));
        }
        if !(p.size_min > 0.0 && p.size_min <= p.size_max) {
            return Err(invalid("particles.size_min", "must be positive and at most particles.size_max"));
        }
        if p.alpha_min > p.alpha_max {
            return Err(invalid("particles.alpha_min", "must not exceed particles.alpha_max"));
        }
        Ok(())
    }

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
        let unparsable = |expected: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{value}' as {expected}"),
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
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
                        value.parse::<bool>().map_err(|_| unparsable("bool"))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| unparsable("number"))?
                        } else {
                            return Err(unparsable("number"));
                        }
                    }
                    // Unset optionals: take JSON literals, fall back to a string.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|_| unparsable("JSON"))?
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
    /// Returns an error if the config file exists but cannot be read, parsed
    /// or validated, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path. Only a missing file is replaced by
    /// defaults; an unreadable one is reported and left alone.
    pub fn load_from(path: &Path) -> Result<Self> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string()).into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
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

    /// Set a config value by key without saving. Returns error if key is
    /// unknown or the result does not validate.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str("[timer]\nmax_hours = 24\n").unwrap();
        assert_eq!(cfg.max_time_ms(), 24 * 3_600_000);
        assert_eq!(cfg.quantize_step_ms(), 15_000);
        assert_eq!(cfg.particles.count, 2500);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.max_hours").as_deref(), Some("12"));
        assert_eq!(cfg.get("particles.pulse_on_contact").as_deref(), Some("true"));
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("timer.quantize_step_secs", "30").unwrap();
        assert_eq!(cfg.quantize_step_ms(), 30_000);
        cfg.apply("particles.damping", "0.9").unwrap();
        assert_eq!(cfg.particles.damping, 0.9);
    }

    #[test]
    fn apply_sets_unset_seed() {
        let mut cfg = Config::default();
        cfg.apply("particles.seed", "7").unwrap();
        assert_eq!(cfg.particles.seed, Some(7));
    }

    #[test]
    fn apply_rejects_invalid_values() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timer.max_hours", "10").is_err());
        assert!(cfg.apply("particles.pulse_on_contact", "maybe").is_err());
        assert!(cfg.apply("timer.nonexistent", "1").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn validate_catches_inverted_radii() {
        let mut cfg = Config::default();
        cfg.dial.inner_radius = 300.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "dial.inner_radius"
        ));
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn unreadable_file_is_reported_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let bytes = b"[timer]\nmax_hours = 24\n# note \xff\n";
        std::fs::write(&path, bytes).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::LoadFailed { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn saved_values_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.apply("timer.max_hours", "24").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().timer.max_hours, 24);
    }

    #[test]
    fn mapper_tuning_follows_dial_section() {
        let cfg = Config::default();
        let tuning = cfg.mapper_tuning();
        assert_eq!(tuning.ms_per_speed, 60_000.0);
        assert_eq!(tuning.max_adjust_ms, 120_000.0);
    }
}
