//! TOML-based application configuration.
//!
//! Holds the deployment settings that are not edited through the timer or
//! voice commands:
//! - Remote synthesis endpoints
//! - Local synthesis and playback commands
//! - Ducking level
//! - The fixed closing schedule
//! - Station tick cadence
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::closing::{default_closing_announcements, ClosingAnnouncement, ClosingSchedule};
use crate::error::{ConfigError, CoreError};

/// Remote synthesis endpoints sharing the `{text, voiceId}` request shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub primary_url: String,
    #[serde(default)]
    pub secondary_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// On-device synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVoiceConfig {
    #[serde(default = "default_local_command")]
    pub command: String,
    /// Language family prefix used to pick a voice (e.g. "pt").
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_one")]
    pub rate: f32,
    #[serde(default = "default_one")]
    pub pitch: f32,
}

/// External player used for remote audio payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_command")]
    pub command: String,
    /// `{volume}` is replaced by the 0-100 playback volume. Audio is written
    /// to the player's stdin.
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuckingConfig {
    /// Media volume multiplier while an announcement is in progress.
    #[serde(default = "default_duck_level")]
    pub level: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingConfig {
    #[serde(default = "default_closing_announcements")]
    pub announcements: Vec<ClosingAnnouncement>,
    /// Name used in the spoken closing messages.
    #[serde(default = "default_venue")]
    pub venue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_rollover_check_secs")]
    pub rollover_check_secs: u64,
    /// Closing announcements go to the front of the speech queue.
    #[serde(default = "default_true")]
    pub closing_priority: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub local: LocalVoiceConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub ducking: DuckingConfig,
    #[serde(default)]
    pub closing: ClosingConfig,
    #[serde(default)]
    pub station: StationConfig,
}

fn default_timeout_secs() -> u64 {
    20
}
fn default_local_command() -> String {
    "espeak-ng".into()
}
fn default_language() -> String {
    "pt".into()
}
fn default_one() -> f32 {
    1.0
}
fn default_player_command() -> String {
    "ffplay".into()
}
fn default_player_args() -> Vec<String> {
    ["-nodisp", "-autoexit", "-loglevel", "quiet", "-volume", "{volume}", "-"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_duck_level() -> f32 {
    0.2
}
fn default_venue() -> String {
    "a academia".into()
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_rollover_check_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            primary_url: String::new(),
            secondary_url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LocalVoiceConfig {
    fn default() -> Self {
        Self {
            command: default_local_command(),
            language: default_language(),
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            args: default_player_args(),
        }
    }
}

impl Default for DuckingConfig {
    fn default() -> Self {
        Self {
            level: default_duck_level(),
        }
    }
}

impl Default for ClosingConfig {
    fn default() -> Self {
        Self {
            announcements: default_closing_announcements(),
            venue: default_venue(),
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            rollover_check_secs: default_rollover_check_secs(),
            closing_priority: true,
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
        if parts.peek().is_none() {
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
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else {
                        let n = value
                            .parse::<f64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    }
                }
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

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from `<data_dir>/config.toml`, writing defaults when absent.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults when absent.
    ///
    /// A file that exists but does not parse or validate is an error: unlike
    /// the stored blobs, this file is edited by hand and silently replacing it
    /// would discard the operator's work.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to `<data_dir>/config.toml`.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (key, value) in [
            ("remote.primary_url", &self.remote.primary_url),
            ("remote.secondary_url", &self.remote.secondary_url),
        ] {
            if !value.is_empty() {
                url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                    key: key.into(),
                    message: e.to_string(),
                })?;
            }
        }
        if !(0.0..=1.0).contains(&self.ducking.level) {
            return Err(ConfigError::InvalidValue {
                key: "ducking.level".into(),
                message: format!("{} is outside 0.0..=1.0", self.ducking.level),
            }
            .into());
        }
        if self.station.tick_ms == 0 || self.station.rollover_check_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "station".into(),
                message: "intervals must be positive".into(),
            }
            .into());
        }
        self.closing_schedule()?;
        Ok(())
    }

    /// The validated closing schedule.
    pub fn closing_schedule(&self) -> Result<ClosingSchedule, CoreError> {
        Ok(ClosingSchedule::new(self.closing.announcements.clone())?)
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

    /// Change a value by dot-separated key without saving.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let next: Config = serde_json::from_value(json)?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Change a value by dot-separated key and save to the default path.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.apply(key, value)?;
        self.save()
    }
}
