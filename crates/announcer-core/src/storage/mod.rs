mod config;
pub mod credentials;
pub mod database;

pub use config::{
    ClosingConfig, Config, DuckingConfig, LocalVoiceConfig, PlayerConfig, RemoteConfig,
    StationConfig,
};
pub use database::{load_json, save_json, Database, KvStore, MemoryStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the announcer data directory, creating it if needed.
///
/// `ANNOUNCER_DATA_DIR` wins when set. Otherwise `~/.config/announcer/`, or
/// `~/.config/announcer-dev/` when `ANNOUNCER_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("ANNOUNCER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ANNOUNCER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("announcer-dev")
            } else {
                base_dir.join("announcer")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
