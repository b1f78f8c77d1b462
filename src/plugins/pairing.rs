//! `!pair <phone>` / `!connect <phone>` requests a pairing code.
//!
//! Expected failures (bad number, already linked, request refused) are
//! replies, not errors.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{bang_command, Plugin, PluginContext, PluginOutput};
use crate::common::error::PluginError;
use crate::common::messages::InboundMessage;
use crate::common::types::Contact;
use crate::telegram::delivery::format_pairing_code;
use crate::whatsapp::phone::PhonePolicy;
use crate::whatsapp::transport::MobileTransport;

pub struct PairingPlugin {
    transport: Arc<dyn MobileTransport>,
    policy: Arc<dyn PhonePolicy>,
}

impl PairingPlugin {
    pub fn new(transport: Arc<dyn MobileTransport>, policy: Arc<dyn PhonePolicy>) -> Self {
        Self { transport, policy }
    }
}

#[async_trait]
impl Plugin for PairingPlugin {
    fn name(&self) -> &'static str {
        "pairing"
    }

    fn matches(&self, message: &InboundMessage, _contact: &Contact) -> bool {
        matches!(
            bang_command(&message.text),
            Some((command, _)) if command == "pair" || command == "connect"
        )
    }

    async fn handle(
        &self,
        message: &InboundMessage,
        contact: &Contact,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        let arg = bang_command(&message.text)
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_default();
        if arg.is_empty() {
            return Ok(PluginOutput::reply(
                "Usage: !pair <phone number with country code>",
            ));
        }

        let Some(phone) = self.policy.normalize(&arg) else {
            return Ok(PluginOutput::reply(format!(
                "❌ '{}' is not a valid phone number. Include the country code, e.g. !pair +15551234567",
                arg
            )));
        };

        if self.transport.is_registered() {
            return Ok(PluginOutput::reply(
                "ℹ️ This bot is already linked to a WhatsApp account.",
            ));
        }

        info!(remote_id = %contact.remote_id, "Pairing code requested for +{}", phone);
        match self.transport.request_pairing_code(&phone).await {
            Ok(code) => Ok(PluginOutput::reply(format!(
                "🔑 Pairing code for +{}: {}",
                phone,
                format_pairing_code(&code)
            ))),
            Err(e) => {
                warn!("Pairing code request failed: {}", e);
                Ok(PluginOutput::reply(format!(
                    "❌ Failed to get a pairing code: {}",
                    e
                )))
            }
        }
    }
}
