pub mod config;
pub mod database;
pub mod metrics_db;
pub mod reminder_db;

pub use config::Config;
pub use database::Database;
pub use metrics_db::MetricsDb;
pub use reminder_db::SqliteReminderStore;

use std::path::PathBuf;

/// Returns `~/.config/healthpass[-dev]/` based on HEALTHPASS_ENV.
///
/// Set HEALTHPASS_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HEALTHPASS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("healthpass-dev")
    } else {
        base_dir.join("healthpass")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
