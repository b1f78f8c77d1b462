//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `FERRYMAN_TELEGRAM_TOKEN` - Telegram bot token
//! - `FERRYMAN_ADMIN_CHAT_ID` - Telegram admin chat ID
//! - `FERRYMAN_PAIRING_NUMBER` - WhatsApp number for pairing-code login
//! - `FERRYMAN_SESSION_PATH` - WhatsApp session directory
//! - `FERRYMAN_DATABASE_PATH` - Contact store directory
//! - `FERRYMAN_BOT_NAME` - Bot display name
//! - `FERRYMAN_DEBUG` - `true`/`false` debug logging switch

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "FERRYMAN";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like tokens to be provided via
/// environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    // Telegram
    if let Ok(token) = env::var(format!("{}_TELEGRAM_TOKEN", ENV_PREFIX)) {
        config.telegram.token = token;
    }
    if let Ok(chat_id) = env::var(format!("{}_ADMIN_CHAT_ID", ENV_PREFIX)) {
        if let Ok(id) = chat_id.trim().parse() {
            config.telegram.admin_chat_id = Some(id);
        }
    }

    // WhatsApp
    if let Ok(number) = env::var(format!("{}_PAIRING_NUMBER", ENV_PREFIX)) {
        config.whatsapp.pairing_number = Some(number);
    }
    if let Ok(path) = env::var(format!("{}_SESSION_PATH", ENV_PREFIX)) {
        config.whatsapp.session_path = path;
    }

    // Storage
    if let Ok(path) = env::var(format!("{}_DATABASE_PATH", ENV_PREFIX)) {
        config.database.path = path;
    }

    // Bot
    if let Ok(name) = env::var(format!("{}_BOT_NAME", ENV_PREFIX)) {
        config.bot.name = name;
    }
    if let Ok(debug) = env::var(format!("{}_DEBUG", ENV_PREFIX)) {
        match debug.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => config.bot.debug = true,
            "false" | "0" | "no" => config.bot.debug = false,
            _ => {}
        }
    }

    config
}

/// Check if any required environment variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_TELEGRAM_TOKEN", ENV_PREFIX),
        format!("{}_ADMIN_CHAT_ID", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `FERRYMAN_CONFIG` environment variable, otherwise returns "ferryman.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "ferryman.conf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_config() -> Config {
        let mut config = Config::default();
        config.telegram.token = "original_token".to_string();
        config.telegram.admin_chat_id = Some(1);
        config
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "FERRYMAN");
    }

    #[test]
    fn test_get_config_path_default() {
        // Clear the env var first
        env::remove_var("FERRYMAN_CONFIG");
        assert_eq!(get_config_path(), "ferryman.conf");
    }

    #[test]
    fn test_apply_env_overrides_no_vars() {
        // Clear all relevant env vars
        env::remove_var("FERRYMAN_TELEGRAM_TOKEN");
        env::remove_var("FERRYMAN_ADMIN_CHAT_ID");

        let config = make_test_config();
        let result = apply_env_overrides(config);

        // Should remain unchanged
        assert_eq!(result.telegram.token, "original_token");
        assert_eq!(result.telegram.admin_chat_id, Some(1));
    }

    #[test]
    fn test_apply_env_overrides_bot_name() {
        env::set_var("FERRYMAN_BOT_NAME", "Harbor");
        let result = apply_env_overrides(make_test_config());
        env::remove_var("FERRYMAN_BOT_NAME");

        assert_eq!(result.bot.name, "Harbor");
    }
}
