//! `!status` reports bot and connection status.

use async_trait::async_trait;

use super::{Plugin, PluginContext, PluginOutput};
use crate::bridge::formatter::format_uptime;
use crate::common::error::PluginError;
use crate::common::messages::InboundMessage;
use crate::common::types::Contact;

pub struct StatusPlugin;

#[async_trait]
impl Plugin for StatusPlugin {
    fn name(&self) -> &'static str {
        "status"
    }

    fn matches(&self, message: &InboundMessage, _contact: &Contact) -> bool {
        message.text.to_lowercase().contains("!status")
    }

    async fn handle(
        &self,
        _message: &InboundMessage,
        _contact: &Contact,
        ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let bridge = if ctx.bridge_active { "active" } else { "not configured" };
        Ok(PluginOutput::reply(format!(
            "📊 {} v{}\nConnection: {}\nUptime: {}\nPlugins: {}\nBridge: {}",
            ctx.bot.name,
            ctx.bot.version,
            ctx.connection.state,
            format_uptime(ctx.uptime()),
            ctx.plugins_loaded,
            bridge
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::test_support::{contact, context, message};
    use crate::whatsapp::lifecycle::ConnectionState;

    #[tokio::test]
    async fn test_status_reply() {
        let plugin = StatusPlugin;
        let msg = message("!status");
        assert!(plugin.matches(&msg, &contact()));
        assert!(!plugin.matches(&message("status"), &contact()));

        let output = plugin
            .handle(&msg, &contact(), &context(ConnectionState::Authenticating))
            .await
            .unwrap();
        let reply = output.reply_text.unwrap();
        assert!(reply.contains("Connection: authenticating"));
        assert!(reply.contains("Plugins: 4"));
        assert!(reply.contains("Bridge: not configured"));
    }
}
