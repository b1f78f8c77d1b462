//! `!echo <text>` replies with the text.

use async_trait::async_trait;

use super::{bang_command, Plugin, PluginContext, PluginOutput};
use crate::common::error::PluginError;
use crate::common::messages::InboundMessage;
use crate::common::types::Contact;

pub struct EchoPlugin;

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn matches(&self, message: &InboundMessage, _contact: &Contact) -> bool {
        matches!(bang_command(&message.text), Some((command, _)) if command == "echo")
    }

    async fn handle(
        &self,
        message: &InboundMessage,
        _contact: &Contact,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let rest = bang_command(&message.text)
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_default();
        if rest.is_empty() {
            return Ok(PluginOutput::reply("Usage: !echo <text>"));
        }
        Ok(PluginOutput::reply(format!("Echo: {}", rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::test_support::{contact, context, message};
    use crate::whatsapp::lifecycle::ConnectionState;

    #[tokio::test]
    async fn test_echo() {
        let plugin = EchoPlugin;
        let msg = message("!echo hi");
        assert!(plugin.matches(&msg, &contact()));

        let output = plugin
            .handle(&msg, &contact(), &context(ConnectionState::Connected))
            .await
            .unwrap();
        assert_eq!(output.reply_text.as_deref(), Some("Echo: hi"));
        assert!(output.rewritten_text.is_none());
    }

    #[test]
    fn test_does_not_match_other_text() {
        let plugin = EchoPlugin;
        assert!(!plugin.matches(&message("echo hi"), &contact()));
        assert!(!plugin.matches(&message("!echoes"), &contact()));
        assert!(plugin.matches(&message("!echo"), &contact()));
    }

    #[tokio::test]
    async fn test_empty_echo_shows_usage() {
        let output = EchoPlugin
            .handle(&message("!echo   "), &contact(), &context(ConnectionState::Connected))
            .await
            .unwrap();
        assert_eq!(output.reply_text.as_deref(), Some("Usage: !echo <text>"));
    }
}
