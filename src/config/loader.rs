use super::types::*;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON config file: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing required database setting: {0}")]
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML (or `.json`) file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config: Config = if is_json {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };

    validate_config(&config)?;
    Ok(config)
}

/// Validate the parts of the configuration that must hold for the process to start.
///
/// Incomplete database settings are not rejected here: they are reported as a
/// configuration error on every cycle so the agent keeps running.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.backup.cooldown > MAX_COOLDOWN_MINUTES {
        return Err(ConfigError::ValidationError(format!(
            "backup.cooldown must not exceed {} minutes",
            MAX_COOLDOWN_MINUTES
        )));
    }

    if config.backup.dump_command.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "backup.dump_command must not be empty".to_string(),
        ));
    }

    if let Some(ref discord) = config.discord {
        if discord.token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "discord.token must not be empty".to_string(),
            ));
        }
        if discord.channel_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "discord.channel_id must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Check that the connection settings a cycle needs are present
pub fn validate_database(database: &DatabaseConfig) -> Result<()> {
    match database.first_missing_field() {
        Some(field) => Err(ConfigError::MissingField(field)),
        None => Ok(()),
    }
}
