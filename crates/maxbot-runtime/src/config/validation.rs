//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ApiConfig, LogOutput, MaxBotConfig, PollingConfig, WebhookConfig};

/// Validates the entire configuration.
///
/// The token is not checked here; an empty token is a startup fault raised
/// when the bot is built.
pub fn validate_config(config: &MaxBotConfig) -> ConfigResult<()> {
    validate_api_config(&config.api)?;
    validate_polling_config(&config.polling)?;
    validate_webhook_config(&config.webhook)?;

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output is 'file' but logging.file_path is not set",
        ));
    }

    Ok(())
}

fn validate_api_config(api: &ApiConfig) -> ConfigResult<()> {
    let rest = api
        .base_url
        .strip_prefix("https://")
        .or_else(|| api.base_url.strip_prefix("http://"))
        .ok_or_else(|| ConfigError::invalid_url(&api.base_url, "scheme must be http or https"))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    if host.is_empty() {
        return Err(ConfigError::invalid_url(&api.base_url, "missing host"));
    }

    if api.timeout_secs == 0 {
        return Err(ConfigError::validation("api.timeout_secs must be greater than 0"));
    }

    Ok(())
}

fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if let Some(empty) = polling.types.iter().position(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "polling.types[{empty}] is empty"
        )));
    }
    Ok(())
}

fn validate_webhook_config(webhook: &WebhookConfig) -> ConfigResult<()> {
    if webhook.port == 0 {
        return Err(ConfigError::validation("webhook.port must be greater than 0"));
    }
    if webhook.host.is_empty() {
        return Err(ConfigError::validation("webhook.host must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&MaxBotConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_base_url() {
        let mut config = MaxBotConfig::default();
        config.api.base_url = "ftp://example.com".into();
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidUrl { .. })));

        config.api.base_url = "https:///path".into();
        assert!(matches!(validate_config(&config), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_zero_port() {
        let mut config = MaxBotConfig::default();
        config.webhook.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = MaxBotConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("bot.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_update_type() {
        let mut config = MaxBotConfig::default();
        config.polling.types = vec!["message_created".into(), " ".into()];
        assert!(validate_config(&config).is_err());
    }
}
