mod config;
pub mod database;

pub use config::{CalendarConfig, Config, HistoryConfig, RewardsConfig, RotationConfig};
pub use database::{Database, STATE_KEY};

use std::path::PathBuf;

use crate::error::{Result, StorageError};

/// Returns `~/.config/pillarstreak[-dev]/` based on PILLARSTREAK_ENV.
///
/// Set PILLARSTREAK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PILLARSTREAK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pillarstreak-dev")
    } else {
        base_dir.join("pillarstreak")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
