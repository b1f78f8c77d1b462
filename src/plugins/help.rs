//! `!help` lists the chat commands.

use async_trait::async_trait;

use super::{Plugin, PluginContext, PluginOutput};
use crate::common::error::PluginError;
use crate::common::messages::InboundMessage;
use crate::common::types::Contact;

const COMMANDS: &str = "\
!help - show this message
!status - bot status
!echo <text> - repeat text back
!pair <phone> - get a pairing code";

pub struct HelpPlugin;

#[async_trait]
impl Plugin for HelpPlugin {
    fn name(&self) -> &'static str {
        "help"
    }

    fn matches(&self, message: &InboundMessage, _contact: &Contact) -> bool {
        message.text.to_lowercase().contains("!help")
    }

    async fn handle(
        &self,
        _message: &InboundMessage,
        _contact: &Contact,
        ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let state = if ctx.is_connected() { "🟢 online" } else { "🔴 offline" };
        Ok(PluginOutput::reply(format!(
            "🤖 {} ({})\n\nCommands:\n{}",
            ctx.bot.name, state, COMMANDS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::test_support::{contact, context, message};
    use crate::whatsapp::lifecycle::ConnectionState;

    #[tokio::test]
    async fn test_help_anywhere_in_text() {
        let plugin = HelpPlugin;
        let msg = message("hey, !HELP please");
        assert!(plugin.matches(&msg, &contact()));

        let output = plugin
            .handle(&msg, &contact(), &context(ConnectionState::Connected))
            .await
            .unwrap();
        let reply = output.reply_text.unwrap();
        assert!(reply.contains("online"));
        assert!(reply.contains("!echo"));
    }
}
