//! Message routing between the mobile chat and the bridge group.
//!
//! Inbound mobile messages resolve (or create) their contact, are logged,
//! run through the plugin pipeline, mirrored into the contact's forum thread,
//! and answered when a plugin produced a reply. Messages posted into a
//! contact's thread are forwarded back to that contact.

use std::sync::Arc;

use anyhow::Context as _;
use tracing::{debug, info, warn};

use crate::bridge::context::{BotInfo, ConnectionHandle};
use crate::bridge::formatter::{split_message, topic_name, MessageFormatter, MAX_GROUP_MESSAGE_LEN};
use crate::common::error::{StoreError, StoreResult};
use crate::common::messages::InboundMessage;
use crate::common::types::{
    local_part, ChatId, Contact, ContentType, Direction, NewMessageRecord, Platform, ThreadId,
};
use crate::config::types::BridgeConfig;
use crate::plugins::{Pipeline, PluginContext};
use crate::store::ContactStore;
use crate::telegram::transport::{GroupMessage, GroupTransport};
use crate::whatsapp::transport::{MobileTransport, RawMessage};

/// Mirroring behavior.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub bridge_enabled: bool,
    pub create_topics: bool,
    pub topic_icon_color: u32,
    pub formatter: MessageFormatter,
}

impl RouterSettings {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            bridge_enabled: config.enabled,
            create_topics: config.create_topics,
            topic_icon_color: config.topic_icon_color,
            formatter: MessageFormatter::new(config.message_format.clone()),
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

/// Routes messages in both directions. Owns no persisted state.
pub struct MessageRouter {
    store: Arc<dyn ContactStore>,
    pipeline: Pipeline,
    mobile: Arc<dyn MobileTransport>,
    group: Arc<dyn GroupTransport>,
    bot: BotInfo,
    connection: ConnectionHandle,
    settings: RouterSettings,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn ContactStore>,
        pipeline: Pipeline,
        mobile: Arc<dyn MobileTransport>,
        group: Arc<dyn GroupTransport>,
        bot: BotInfo,
        connection: ConnectionHandle,
        settings: RouterSettings,
    ) -> Self {
        Self {
            store,
            pipeline,
            mobile,
            group,
            bot,
            connection,
            settings,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Route one inbound mobile message.
    ///
    /// Returns the resolved contact, or `None` if the message carried no
    /// recognizable content. Store failures abandon the message.
    pub async fn route_inbound(&self, raw: &RawMessage) -> StoreResult<Option<Contact>> {
        let Some(message) = InboundMessage::normalize(raw) else {
            debug!(id = %raw.id, "Discarding message without recognizable content");
            return Ok(None);
        };

        let mut contact = self.resolve_contact(&message).await?;

        self.store
            .append_message(NewMessageRecord {
                contact_id: contact.id,
                native_id: message.native_id.clone(),
                content: message.text.clone(),
                content_type: message.content_type,
                platform: Platform::WhatsApp,
                direction: Direction::Inbound,
            })
            .await?;

        let ctx = self.plugin_context().await;
        let result = self.pipeline.run(&message, &contact, &ctx).await;

        // Mirroring and replying are independent of each other
        self.mirror(&mut contact, &result.text).await;
        if let Some(reply) = result.reply {
            if let Err(e) = self.mobile.send_text(&contact.remote_id, &reply).await {
                warn!(remote_id = %contact.remote_id, "Failed to send plugin reply: {}", e);
            }
        }

        Ok(Some(contact))
    }

    /// Forward a message posted in a contact's thread back to the contact.
    ///
    /// Returns `true` if the message was forwarded.
    pub async fn route_outbound_from_mirror(&self, message: &GroupMessage) -> StoreResult<bool> {
        let Some(thread_id) = message.thread_id else {
            return Ok(false);
        };
        if message.text.trim().is_empty() {
            return Ok(false);
        }
        if self.active_route_chat().await != Some(message.chat_id) {
            debug!(chat_id = message.chat_id, "Ignoring thread message outside the bridge chat");
            return Ok(false);
        }

        let Some(contact) = self.store.find_by_thread(thread_id).await? else {
            debug!(thread_id, "No contact bound to thread");
            return Ok(false);
        };

        self.store
            .append_message(NewMessageRecord {
                contact_id: contact.id,
                native_id: message.message_id.to_string(),
                content: message.text.clone(),
                content_type: ContentType::Conversation,
                platform: Platform::Telegram,
                direction: Direction::Outbound,
            })
            .await?;

        match self.mobile.send_text(&contact.remote_id, &message.text).await {
            Ok(()) => {
                debug!(remote_id = %contact.remote_id, thread_id, "Forwarded thread message");
                Ok(true)
            }
            Err(e) => {
                warn!(remote_id = %contact.remote_id, "Failed to forward thread message: {}", e);
                Ok(false)
            }
        }
    }

    /// Get-or-create the sender's contact.
    async fn resolve_contact(&self, message: &InboundMessage) -> StoreResult<Contact> {
        if let Some(contact) = self.store.get_contact(&message.sender).await? {
            return Ok(contact);
        }

        let phone = local_part(&message.sender);
        let name = message.push_name.as_deref().unwrap_or(phone);
        match self
            .store
            .create_contact(&message.sender, Some(name), phone)
            .await
        {
            Ok(contact) => {
                info!(remote_id = %contact.remote_id, "New contact: {}", contact.display_name());
                Ok(contact)
            }
            Err(e) if e.is_constraint_violation() => {
                debug!(remote_id = %message.sender, "Contact created concurrently, re-reading");
                self.store
                    .get_contact(&message.sender)
                    .await?
                    .ok_or_else(|| StoreError::ContactNotFound {
                        remote_id: message.sender.clone(),
                    })
            }
            Err(e) => Err(e),
        }
    }

    async fn mirror(&self, contact: &mut Contact, text: &str) {
        if !self.settings.bridge_enabled {
            return;
        }
        let Some(chat_id) = self.active_route_chat().await else {
            return;
        };

        let thread_id = match self.resolve_thread(contact, chat_id).await {
            Ok(thread_id) => thread_id,
            Err(e) => {
                warn!(remote_id = %contact.remote_id, "Skipping mirror: {:#}", e);
                return;
            }
        };

        let formatted = self.settings.formatter.format(contact, text);
        for chunk in split_message(&formatted, MAX_GROUP_MESSAGE_LEN) {
            if let Err(e) = self.group.send_text(chat_id, thread_id, &chunk).await {
                warn!(remote_id = %contact.remote_id, ?thread_id, "Failed to mirror message: {}", e);
                return;
            }
        }
    }

    /// The contact's thread, creating and binding one on first use.
    async fn resolve_thread(
        &self,
        contact: &mut Contact,
        chat_id: ChatId,
    ) -> anyhow::Result<Option<ThreadId>> {
        if let Some(thread_id) = contact.thread_id {
            return Ok(Some(thread_id));
        }
        if !self.settings.create_topics {
            return Ok(None);
        }

        let name = topic_name(contact);
        let thread_id = self
            .group
            .create_thread(chat_id, &name, self.settings.topic_icon_color)
            .await
            .with_context(|| format!("failed to create thread '{}'", name))?;

        *contact = self
            .store
            .bind_thread(&contact.remote_id, thread_id)
            .await
            .with_context(|| format!("failed to bind thread {}", thread_id))?;
        info!(remote_id = %contact.remote_id, thread_id, "Created thread '{}'", name);
        Ok(Some(thread_id))
    }

    async fn active_route_chat(&self) -> Option<ChatId> {
        match self.store.get_route().await {
            Ok(Some(route)) if route.active => Some(route.chat_id),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read bridge route: {}", e);
                None
            }
        }
    }

    async fn plugin_context(&self) -> PluginContext {
        PluginContext {
            bot: self.bot.clone(),
            connection: self.connection.status(),
            plugins_loaded: self.pipeline.len(),
            bridge_active: self.active_route_chat().await.is_some(),
        }
    }
}
