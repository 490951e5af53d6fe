mod config;
pub mod database;

pub use config::{Config, GoalsConfig, NetworkConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// `HABIT_CHRONICLE_HOME` overrides the location outright. Otherwise this is
/// `~/.config/habit-chronicle[-dev]/`, with the `-dev` suffix selected by
/// `HABIT_CHRONICLE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("HABIT_CHRONICLE_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("HABIT_CHRONICLE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("habit-chronicle-dev")
            } else {
                base_dir.join("habit-chronicle")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
