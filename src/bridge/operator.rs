//! Operator slash-command handling.
//!
//! Commands arrive from the group-chat side and act on the connection
//! lifecycle or the bridge route. Replies go back to the issuing chat.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bridge::context::BotInfo;
use crate::bridge::formatter::format_uptime;
use crate::common::error::ConnectionError;
use crate::common::types::ChatId;
use crate::config::types::Config;
use crate::store::ContactStore;
use crate::telegram::commands::{OperatorCommand, COMMAND_HELP};
use crate::telegram::delivery::Delivery;
use crate::telegram::transport::GroupMessage;
use crate::whatsapp::lifecycle::{AuthMode, ConnectionState, LifecycleManager, PairingRequest};
use crate::whatsapp::phone::PhonePolicy;

/// Executes parsed operator commands.
pub struct OperatorHandler {
    store: Arc<dyn ContactStore>,
    delivery: Arc<Delivery>,
    phone_policy: Arc<dyn PhonePolicy>,
    bot: BotInfo,
    plugin_names: Vec<&'static str>,
    config_summary: String,
}

impl OperatorHandler {
    pub fn new(
        store: Arc<dyn ContactStore>,
        delivery: Arc<Delivery>,
        phone_policy: Arc<dyn PhonePolicy>,
        bot: BotInfo,
        plugin_names: Vec<&'static str>,
        config_summary: String,
    ) -> Self {
        Self {
            store,
            delivery,
            phone_policy,
            bot,
            plugin_names,
            config_summary,
        }
    }

    /// Execute one command.
    ///
    /// Only lifecycle failures that end the process are returned; everything
    /// else is answered in the chat.
    pub async fn handle(
        &self,
        lifecycle: &mut LifecycleManager,
        message: &GroupMessage,
        command: OperatorCommand,
    ) -> Result<(), ConnectionError> {
        info!(chat_id = message.chat_id, sender = %message.sender, "Operator command: {:?}", command);

        if command.requires_admin() && message.chat_id != self.delivery.admin_chat() {
            self.reply(message, "⛔ This command is only available in the admin chat.")
                .await;
            return Ok(());
        }

        match command {
            OperatorCommand::Start | OperatorCommand::Help => {
                let text = format!("🤖 {} commands:\n{}", self.bot.name, COMMAND_HELP);
                self.reply(message, &text).await;
            }
            OperatorCommand::Status => {
                let text = self.status_text(lifecycle).await;
                self.reply(message, &text).await;
            }
            OperatorCommand::Config => {
                self.reply(message, &self.config_summary).await;
            }
            OperatorCommand::SetBridge => self.handle_set_bridge(message).await,
            OperatorCommand::Qr => self.handle_qr(lifecycle, message).await?,
            OperatorCommand::Pair { phone } => {
                self.handle_pair(lifecycle, message, phone.as_deref()).await?
            }
            OperatorCommand::Unpair => self.handle_unpair(lifecycle, message).await,
            OperatorCommand::Reconnect => {
                if lifecycle.state() == ConnectionState::Connected {
                    self.reply(message, "ℹ️ Already connected to WhatsApp.").await;
                } else {
                    self.reply(message, "🔄 Reconnecting to WhatsApp...").await;
                    lifecycle.reconnect_now().await?;
                }
            }
            OperatorCommand::Unknown(name) => {
                let text = format!("❓ Unknown command /{}\n\n{}", name, COMMAND_HELP);
                self.reply(message, &text).await;
            }
        }
        Ok(())
    }

    async fn status_text(&self, lifecycle: &LifecycleManager) -> String {
        let bridge = match self.store.get_route().await {
            Ok(Some(route)) if route.active => format!("active (chat {})", route.chat_id),
            Ok(_) => "not configured".to_string(),
            Err(e) => {
                warn!("Failed to read bridge route: {}", e);
                "unknown".to_string()
            }
        };
        let plugins = if self.plugin_names.is_empty() {
            "none".to_string()
        } else {
            format!("{} ({})", self.plugin_names.len(), self.plugin_names.join(", "))
        };

        let mut text = format!(
            "📊 {} v{}\nWhatsApp: {}\nAuth: {}\nUptime: {}\nPlugins: {}\nBridge: {}\nReconnect attempts: {}/{}",
            self.bot.name,
            self.bot.version,
            lifecycle.state(),
            lifecycle.auth_mode(),
            format_uptime(self.bot.uptime()),
            plugins,
            bridge,
            lifecycle.attempts(),
            lifecycle.max_attempts(),
        );
        if let Some(reason) = lifecycle.last_disconnect() {
            text.push_str(&format!("\nLast disconnect: {}", reason));
        }
        text
    }

    async fn handle_set_bridge(&self, message: &GroupMessage) {
        if !message.chat_kind.is_group() {
            self.reply(message, "❌ /setbridge only works in a group.").await;
            return;
        }

        match self.store.set_route(message.chat_id).await {
            Ok(route) => {
                info!(chat_id = route.chat_id, "Bridge route set");
                self.reply(message, "✅ WhatsApp chats will be mirrored into this group.")
                    .await;
            }
            Err(e) => {
                warn!(chat_id = message.chat_id, "Failed to set bridge route: {}", e);
                self.reply(message, &format!("❌ Failed to set bridge: {}", e))
                    .await;
            }
        }
    }

    async fn handle_qr(
        &self,
        lifecycle: &mut LifecycleManager,
        message: &GroupMessage,
    ) -> Result<(), ConnectionError> {
        if let AuthMode::PairingCode { .. } = lifecycle.auth_mode() {
            self.reply(message, "ℹ️ Pairing-code login is configured. Use /pair <phone>.")
                .await;
            return Ok(());
        }

        match lifecycle.state() {
            ConnectionState::Connected => {
                self.reply(message, "ℹ️ Already connected to WhatsApp.").await;
            }
            ConnectionState::Disconnected => {
                self.reply(message, "🔄 Reconnecting, a new QR code will follow.")
                    .await;
                lifecycle.reconnect_now().await?;
            }
            ConnectionState::Connecting | ConnectionState::Authenticating => {
                match lifecycle.last_qr() {
                    Some(qr) => {
                        let qr = qr.to_string();
                        self.delivery.deliver_qr(&qr).await;
                    }
                    None => {
                        self.reply(message, "⏳ Waiting for a QR code from WhatsApp...")
                            .await
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_pair(
        &self,
        lifecycle: &mut LifecycleManager,
        message: &GroupMessage,
        phone: Option<&str>,
    ) -> Result<(), ConnectionError> {
        let Some(arg) = phone else {
            self.reply(message, "Usage: /pair <phone number with country code>")
                .await;
            return Ok(());
        };
        let Some(phone) = self.phone_policy.normalize(arg) else {
            self.reply(
                message,
                &format!("❌ '{}' is not a valid phone number.", arg),
            )
            .await;
            return Ok(());
        };

        if lifecycle.is_registered() {
            self.reply(message, "ℹ️ Already linked. Use /unpair first.").await;
            return Ok(());
        }
        if lifecycle.state() == ConnectionState::Connected {
            self.reply(message, "ℹ️ Already connected to WhatsApp.").await;
            return Ok(());
        }

        self.reply(
            message,
            &format!("⏳ Requesting a pairing code for +{}...", phone),
        )
        .await;
        if lifecycle.state() == ConnectionState::Disconnected {
            lifecycle.reconnect_now().await?;
        }
        lifecycle.schedule_pairing(PairingRequest {
            phone,
            requested_by: Some(message.chat_id),
        });
        Ok(())
    }

    async fn handle_unpair(&self, lifecycle: &mut LifecycleManager, message: &GroupMessage) {
        // On success the lifecycle notifies the admin chat itself
        if let Err(e) = lifecycle.logout().await {
            warn!("Logout failed: {}", e);
            self.reply(message, &format!("❌ Logout failed: {}", e)).await;
        }
    }

    async fn reply(&self, message: &GroupMessage, text: &str) {
        self.delivery
            .reply(message.chat_id, message.thread_id, text)
            .await;
    }
}

/// Operator-facing configuration summary. Secrets are left out.
pub fn summarize_config(config: &Config, auth_mode: &AuthMode) -> String {
    let plugins = if config.plugins.enabled {
        config.plugins.order.join(", ")
    } else {
        "disabled".to_string()
    };
    format!(
        "⚙️ Configuration\n\
         Bot: {}\n\
         Auth: {}\n\
         Auto-reconnect: {} (every {}ms, max {})\n\
         Admin chat: {}\n\
         Bridge: {} (topics: {})\n\
         Message format: {}\n\
         Plugins: {}\n\
         Database: {}",
        config.bot.name,
        auth_mode,
        on_off(config.bot.auto_reconnect),
        config.bot.reconnect_delay_ms,
        config.bot.max_reconnect_attempts,
        admin_label(config.telegram.admin_chat_id),
        on_off(config.bridge.enabled),
        on_off(config.bridge.create_topics),
        config.bridge.message_format.replace('\n', "\\n"),
        plugins,
        config.database.path,
    )
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn admin_label(chat: Option<ChatId>) -> String {
    chat.map(|id| id.to_string())
        .unwrap_or_else(|| "not set".to_string())
}
