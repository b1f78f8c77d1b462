//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

/// Placeholder shipped in the example configuration.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_TELEGRAM_BOT_TOKEN";

/// Default mirror message format.
pub const DEFAULT_MESSAGE_FORMAT: &str = "📱 *{name}*\n{message}";

/// Plugins loaded when the configuration does not list any.
pub const DEFAULT_PLUGIN_ORDER: &[&str] = &["help", "status", "echo", "pairing"];

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    pub whatsapp: WhatsAppConfig,
    pub database: DatabaseConfig,
    pub plugins: PluginsConfig,
    pub bridge: BridgeConfig,
}

impl Config {
    /// Log level directive, honoring the debug switch.
    pub fn log_level(&self) -> &str {
        if self.bot.debug {
            "debug"
        } else {
            &self.bot.log_level
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.bot.reconnect_delay_ms)
    }

    /// The configured pairing number, if pairing-code mode is selected.
    pub fn pairing_number(&self) -> Option<&str> {
        self.whatsapp
            .pairing_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// General bot behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub name: String,
    pub log_level: String,
    pub debug: bool,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "Ferryman".to_string(),
            log_level: "info".to_string(),
            debug: false,
            auto_reconnect: true,
            max_reconnect_attempts: 10,
            reconnect_delay_ms: 5000,
        }
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    /// Chat that receives status, QR and pairing notifications.
    pub admin_chat_id: Option<i64>,
}

/// WhatsApp client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub session_path: String,
    /// Selects pairing-code authentication when set; QR otherwise.
    pub pairing_number: Option<String>,
    pub pairing: PairingConfig,
    pub phone: PhoneConfig,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            session_path: "./sessions".to_string(),
            pairing_number: None,
            pairing: PairingConfig::default(),
            phone: PhoneConfig::default(),
        }
    }
}

/// Pairing-code request timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Wait after entering `connecting` before requesting a code.
    pub settle_delay_ms: u64,
    /// Wait before serving an operator `/pair` request.
    pub manual_delay_ms: u64,
}

impl PairingConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn manual_delay(&self) -> Duration {
        Duration::from_millis(self.manual_delay_ms)
    }
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 5000,
            manual_delay_ms: 2000,
        }
    }
}

/// Phone number acceptance rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhoneConfig {
    pub min_digits: usize,
    pub max_digits: usize,
    /// Prefixed onto numbers of exactly `min_digits` digits.
    pub default_country_code: Option<String>,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            min_digits: 10,
            max_digits: 15,
            default_country_code: None,
        }
    }
}

/// Contact/message store location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding `contacts.json` and `messages.jsonl`.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data".to_string(),
        }
    }
}

/// Plugin pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub enabled: bool,
    /// Plugin names in execution order.
    pub order: Vec<String>,
    pub redact: RedactConfig,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: DEFAULT_PLUGIN_ORDER.iter().map(|s| s.to_string()).collect(),
            redact: RedactConfig::default(),
        }
    }
}

/// Patterns rewritten out of mirrored text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedactConfig {
    pub patterns: Vec<String>,
}

/// Mirroring into the Telegram group.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enabled: bool,
    /// Create one forum topic per contact.
    pub create_topics: bool,
    pub topic_icon_color: u32,
    /// Supports `{name}`, `{phone}`, `{message}` and `{time}`.
    pub message_format: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            create_topics: true,
            topic_icon_color: 0x6FB9F0,
            message_format: DEFAULT_MESSAGE_FORMAT.to_string(),
        }
    }
}
