//! Configuration validation utilities.

use sparkl_core::Snowflake;

use super::error::{ConfigError, ConfigResult};
use super::schema::{ClientConfig, LogOutput, LoggingConfig, SparklConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SparklConfig) -> ConfigResult<()> {
    validate_client_config(&config.client)?;
    validate_guilds(config)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_client_config(client: &ClientConfig) -> ConfigResult<()> {
    validate_prefix(&client.prefix, "client.prefix")
}

/// Guild keys must be numeric ids and every guild prefix must be usable.
fn validate_guilds(config: &SparklConfig) -> ConfigResult<()> {
    for (id, guild) in &config.guilds {
        if id.parse::<Snowflake>().is_err() {
            return Err(ConfigError::InvalidGuildId(id.clone()));
        }
        validate_prefix(&guild.prefix, &format!("guilds.{id}.prefix"))?;
    }
    Ok(())
}

fn validate_prefix(prefix: &str, field: &str) -> ConfigResult<()> {
    if prefix.is_empty() {
        return Err(ConfigError::missing_field(field));
    }
    if prefix.trim().is_empty() {
        return Err(ConfigError::validation(format!(
            "{field} cannot be whitespace only"
        )));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}
