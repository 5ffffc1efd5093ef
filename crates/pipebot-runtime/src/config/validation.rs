//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotSettings, LogOutput, LoggingConfig, PipebotConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &PipebotConfig) -> ConfigResult<()> {
    validate_bot_settings(&config.bot)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_settings(bot: &BotSettings) -> ConfigResult<()> {
    if bot.name.trim().is_empty() {
        return Err(ConfigError::validation("bot.name must not be empty"));
    }

    if bot.name.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "bot.name cannot contain whitespace",
        ));
    }

    if bot.poll_interval_ms == 0 {
        return Err(ConfigError::validation(
            "bot.poll_interval_ms must be greater than 0",
        ));
    }

    if bot.queue_capacity == 0 {
        return Err(ConfigError::validation(
            "bot.queue_capacity must be greater than 0",
        ));
    }

    if bot.max_in_flight == Some(0) {
        return Err(ConfigError::validation(
            "bot.max_in_flight must be greater than 0 when set",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if logging.filters.keys().any(|module| module.is_empty()) {
        return Err(ConfigError::validation(
            "logging.filters keys must be module paths",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&PipebotConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_bot_settings() {
        let cases: [fn(&mut BotSettings); 5] = [
            |b| b.name.clear(),
            |b| b.name = "two words".into(),
            |b| b.poll_interval_ms = 0,
            |b| b.queue_capacity = 0,
            |b| b.max_in_flight = Some(0),
        ];
        for mutate in cases {
            let mut config = PipebotConfig::default();
            mutate(&mut config.bot);
            assert!(matches!(
                validate_config(&config),
                Err(ConfigError::ValidationError { .. })
            ));
        }
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = PipebotConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("pipebot.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
