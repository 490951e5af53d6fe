//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timeout and retry budgets for store reads
//! - Defaults for newly created goals
//!
//! Configuration is stored at `~/.config/habit-chronicle/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::goal::Cadence;
use crate::retry::RetryOptions;

/// Timeout and retry budgets applied to every store read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Defaults for `goal add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsConfig {
    #[serde(default = "default_duration_days")]
    pub default_duration_days: u32,
    #[serde(default)]
    pub default_cadence: Cadence,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/habit-chronicle/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub goals: GoalsConfig,
}

fn default_timeout_ms() -> u64 {
    10_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_duration_days() -> u32 {
    30
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions {
            max_attempts: self.max_attempts,
            initial_delay_ms: self.initial_delay_ms,
            backoff_multiplier: self.backoff_multiplier,
            max_delay_ms: self.max_delay_ms,
        }
    }
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            default_duration_days: default_duration_days(),
            default_cadence: Cadence::Daily,
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
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| invalid(e.to_string()))?,
                serde_json::Value::Number(n) if n.is_f64() => value
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Check values that serde accepts but the retry loop cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let net = &self.network;
        if net.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "network.timeout_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if net.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "network.max_attempts".into(),
                message: "must be at least 1".into(),
            });
        }
        if !net.backoff_multiplier.is_finite() || net.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "network.backoff_multiplier".into(),
                message: "must be a finite number >= 1.0".into(),
            });
        }
        if net.max_delay_ms < net.initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                key: "network.max_delay_ms".into(),
                message: "must not be smaller than network.initial_delay_ms".into(),
            });
        }
        if self.goals.default_duration_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "goals.default_duration_days".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing the defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, writing defaults");
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
            .into()),
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

    /// Update a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value has the wrong type,
    /// or the resulting config fails validation. `self` is left unchanged on
    /// error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default config");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[network]\ntimeout_ms = 500\n").unwrap();
        assert_eq!(parsed.network.timeout_ms, 500);
        assert_eq!(parsed.network.max_attempts, 3);
        assert_eq!(parsed.goals.default_duration_days, 30);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("network.max_attempts").as_deref(), Some("3"));
        assert_eq!(cfg.get("goals.default_cadence").as_deref(), Some("daily"));
        assert_eq!(cfg.get("network.backoff_multiplier").as_deref(), Some("2.0"));
        assert!(cfg.get("network.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_integer() {
        let mut cfg = Config::default();
        cfg.apply("network.timeout_ms", "2500").unwrap();
        assert_eq!(cfg.network.timeout_ms, 2500);
    }

    #[test]
    fn apply_updates_float() {
        let mut cfg = Config::default();
        cfg.apply("network.backoff_multiplier", "1.5").unwrap();
        assert_eq!(cfg.network.backoff_multiplier, 1.5);
    }

    #[test]
    fn apply_updates_enum_string() {
        let mut cfg = Config::default();
        cfg.apply("goals.default_cadence", "weekly").unwrap();
        assert_eq!(cfg.goals.default_cadence, Cadence::Weekly);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(cfg.apply("network.nonexistent", "1").is_err());
        assert!(cfg.apply("nope", "1").is_err());
    }

    #[test]
    fn apply_rejects_wrong_type_and_keeps_old_value() {
        let mut cfg = Config::default();
        assert!(cfg.apply("network.max_attempts", "many").is_err());
        assert!(cfg.apply("goals.default_cadence", "monthly").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn apply_rejects_invalid_budget() {
        let mut cfg = Config::default();
        assert!(cfg.apply("network.max_attempts", "0").is_err());
        assert!(cfg.apply("network.backoff_multiplier", "0.5").is_err());
        assert_eq!(cfg.network.max_attempts, 3);
    }

    #[test]
    fn network_config_builds_retry_options() {
        let net = NetworkConfig::default();
        let options = net.retry_options();
        assert_eq!(options, RetryOptions::default());
        assert_eq!(net.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_reads_saved_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.apply("goals.default_duration_days", "66").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.goals.default_duration_days, 66);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network\ntimeout_ms = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Config(ConfigError::LoadFailed { .. })
        ));
    }
}
