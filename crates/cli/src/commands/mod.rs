pub mod doctor;
pub mod serve;

use scopepilot_config::{AppConfig, ConfigError};
use std::path::Path;

/// Load the config file (explicit path or the default location), then apply
/// environment overrides and validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config.validate()?;
            Ok(config)
        }
        None => AppConfig::load(),
    }
}
