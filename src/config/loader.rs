//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::TelemetryConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_DATABASE_URL: &str = "COLDWATCH_DATABASE_URL";
pub const ENV_BIND_ADDRESS: &str = "COLDWATCH_BIND_ADDRESS";
pub const ENV_ADMIN_API_KEY: &str = "COLDWATCH_ADMIN_API_KEY";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<TelemetryConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => TelemetryConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay values from a variable lookup (the process environment in
/// production). Empty values are ignored.
pub fn apply_overrides<F>(config: &mut TelemetryConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = lookup(ENV_DATABASE_URL) {
        config.database.url = Some(url);
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.server.bind_address = addr;
    }
    if let Some(key) = lookup(ENV_ADMIN_API_KEY) {
        config.admin.api_key = key;
    }
}
