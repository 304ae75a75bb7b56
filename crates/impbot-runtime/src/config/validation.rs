//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ImpbotConfig, LogOutput, LoggingConfig, RetryConfig, StdioConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ImpbotConfig) -> ConfigResult<()> {
    if config.bot.shutdown_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Shutdown timeout must be greater than 0",
        ));
    }
    if let Some(database) = &config.bot.database
        && database.as_os_str().is_empty()
    {
        return Err(ConfigError::missing_field("bot.database"));
    }

    validate_logging_config(&config.logging)?;
    validate_retry_config(&config.connections.retry)?;
    validate_stdio_config(&config.connections.stdio)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if logging.filters.keys().any(|module| module.is_empty()) {
        return Err(ConfigError::validation("Log filter module cannot be empty"));
    }
    Ok(())
}

/// Validates retry configuration.
fn validate_retry_config(retry: &RetryConfig) -> ConfigResult<()> {
    if retry.initial_delay_ms == 0 {
        return Err(ConfigError::validation(
            "Initial retry delay must be greater than 0",
        ));
    }

    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(ConfigError::validation(
            "Max retry delay must be greater than or equal to initial delay",
        ));
    }

    if retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::validation(
            "Backoff multiplier must be at least 1.0",
        ));
    }

    Ok(())
}

fn validate_stdio_config(stdio: &StdioConfig) -> ConfigResult<()> {
    if stdio.user.is_empty() {
        return Err(ConfigError::missing_field("connections.stdio.user"));
    }
    if stdio.user.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "Console user name cannot contain whitespace",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&ImpbotConfig::default()).is_ok());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = ImpbotConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
        config.logging.file_path = Some("impbot.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_retry_bounds() {
        let mut config = ImpbotConfig::default();
        config.connections.retry.max_delay_ms = 10;
        assert!(validate_config(&config).is_err());

        let mut config = ImpbotConfig::default();
        config.connections.retry.backoff_multiplier = 0.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_stdio_user() {
        let mut config = ImpbotConfig::default();
        config.connections.stdio.user = "two words".to_string();
        assert!(validate_config(&config).is_err());
    }
}
