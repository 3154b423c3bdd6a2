//! Configuration management commands for CLI.

use clap::Subcommand;
use healthpass_core::storage::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a value by dot-separated key (e.g. notifications.pre_alert_minutes)
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}
