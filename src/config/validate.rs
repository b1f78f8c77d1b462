//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use fancy_regex::Regex;

use crate::common::error::ConfigError;
use crate::config::types::{Config, PLACEHOLDER_TOKEN};
use crate::plugins::registry::AVAILABLE_PLUGINS;
use crate::whatsapp::phone::{DigitRangePolicy, PhonePolicy};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate Telegram config
    if config.telegram.token.is_empty() {
        errors.push("telegram.token is required".to_string());
    }
    if config.telegram.token == PLACEHOLDER_TOKEN {
        errors.push("telegram.token has not been configured (still using placeholder)".to_string());
    }
    if config.telegram.admin_chat_id.is_none() {
        errors.push("telegram.admin_chat_id is required".to_string());
    }

    // Validate bot config
    if !LOG_LEVELS.contains(&config.bot.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "bot.log_level '{}' is invalid (use: {})",
            config.bot.log_level,
            LOG_LEVELS.join(", ")
        ));
    }
    if config.bot.auto_reconnect && config.bot.max_reconnect_attempts == 0 {
        errors.push("bot.max_reconnect_attempts must be at least 1 when auto_reconnect is on".to_string());
    }
    if config.bot.reconnect_delay_ms == 0 {
        errors.push("bot.reconnect_delay_ms must be non-zero".to_string());
    }

    // Validate WhatsApp config
    let phone = &config.whatsapp.phone;
    if phone.min_digits == 0 || phone.min_digits > phone.max_digits {
        errors.push(format!(
            "whatsapp.phone digit bounds are inconsistent (min {}, max {})",
            phone.min_digits, phone.max_digits
        ));
    } else if let Some(number) = config.pairing_number() {
        let policy = DigitRangePolicy::from_config(phone);
        if policy.normalize(number).is_none() {
            errors.push(format!(
                "whatsapp.pairing_number '{}' is not a valid phone number ({}-{} digits)",
                number, phone.min_digits, phone.max_digits
            ));
        }
    }

    // Validate storage
    if config.database.path.trim().is_empty() {
        errors.push("database.path is required".to_string());
    }

    // Validate plugins
    for (i, name) in config.plugins.order.iter().enumerate() {
        if !AVAILABLE_PLUGINS.contains(&name.trim().to_lowercase().as_str()) {
            errors.push(format!(
                "plugins.order[{}] '{}' is not a known plugin (available: {})",
                i,
                name,
                AVAILABLE_PLUGINS.join(", ")
            ));
        }
    }
    for (i, pattern) in config.plugins.redact.patterns.iter().enumerate() {
        if Regex::new(pattern).is_err() {
            errors.push(format!(
                "plugins.redact.patterns[{}] is not a valid regex: '{}'",
                i, pattern
            ));
        }
    }

    // Validate bridge
    if !config.bridge.message_format.contains("{message}") {
        errors.push("bridge.message_format must contain {message}".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

/// Quick check if config has the minimum required fields populated.
pub fn has_required_fields(config: &Config) -> bool {
    !config.telegram.token.is_empty() && config.telegram.admin_chat_id.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_valid_config() -> Config {
        let mut config = Config::default();
        config.telegram.token = "123456:valid_token_here".to_string();
        config.telegram.admin_chat_id = Some(6387028671);
        config
    }

    #[test]
    fn test_valid_config_passes() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_token_fails() {
        let mut config = make_valid_config();
        config.telegram.token = String::new();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("telegram.token"));
    }

    #[test]
    fn test_placeholder_token_fails() {
        let mut config = make_valid_config();
        config.telegram.token = PLACEHOLDER_TOKEN.to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("placeholder"));
    }

    #[test]
    fn test_missing_admin_chat_fails() {
        let mut config = make_valid_config();
        config.telegram.admin_chat_id = None;

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("admin_chat_id"));
    }

    #[test]
    fn test_unknown_plugin_fails() {
        let mut config = make_valid_config();
        config.plugins.order.push("weather".to_string());

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("'weather'"));
    }

    #[test]
    fn test_invalid_regex_fails() {
        let mut config = make_valid_config();
        config.plugins.redact.patterns = vec!["[invalid".to_string()];

        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a valid regex"));
    }

    #[test]
    fn test_invalid_pairing_number_fails() {
        let mut config = make_valid_config();
        config.whatsapp.pairing_number = Some("12345".to_string());

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("pairing_number"));

        config.whatsapp.pairing_number = Some("+1 (555) 123-4567".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_message_format_requires_message() {
        let mut config = make_valid_config();
        config.bridge.message_format = "{name} said something".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("{message}"));
    }

    #[test]
    fn test_reconnect_limits() {
        let mut config = make_valid_config();
        config.bot.max_reconnect_attempts = 0;
        assert!(validate_config(&config).is_err());

        config.bot.auto_reconnect = false;
        assert!(validate_config(&config).is_ok());

        config.bot.reconnect_delay_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = make_valid_config();
        config.telegram.token = String::new();
        config.bot.log_level = "loud".to_string();

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("telegram.token"));
        assert!(message.contains("bot.log_level"));
    }

    #[test]
    fn test_has_required_fields() {
        let config = make_valid_config();
        assert!(has_required_fields(&config));

        let mut invalid = make_valid_config();
        invalid.telegram.token = String::new();
        assert!(!has_required_fields(&invalid));
    }
}
