//! Canonical message types for bridge communication.
//!
//! Transport payloads are normalized here into the single shape the router
//! and plugins work with.

use chrono::{DateTime, TimeZone, Utc};

use crate::common::types::ContentType;
use crate::whatsapp::transport::{RawContent, RawMessage};

/// A normalized inbound message from the mobile-chat side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Remote identifier of the sender.
    pub sender: String,
    /// Transport-native message id.
    pub native_id: String,
    /// Text content, or a media placeholder.
    pub text: String,
    pub content_type: ContentType,
    /// Display name advertised by the sender, if any.
    pub push_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Normalize a raw transport message.
    ///
    /// Returns `None` when the message carries no recognizable content.
    pub fn normalize(raw: &RawMessage) -> Option<Self> {
        let (content_type, text) = match raw.content.as_ref()? {
            RawContent::Conversation(text) => (ContentType::Conversation, text.clone()),
            RawContent::ExtendedText { text } => (ContentType::ExtendedText, text.clone()),
            RawContent::Image { caption } => media(ContentType::Image, caption),
            RawContent::Video { caption } => media(ContentType::Video, caption),
            RawContent::Audio => media(ContentType::Audio, &None),
            RawContent::Unsupported(_) => return None,
        };

        if raw.remote_id.is_empty() {
            return None;
        }

        let timestamp = raw
            .timestamp
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);

        Some(Self {
            sender: raw.remote_id.clone(),
            native_id: raw.id.clone(),
            text,
            content_type,
            push_name: raw
                .push_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
            timestamp,
        })
    }
}

fn media(content_type: ContentType, caption: &Option<String>) -> (ContentType, String) {
    let text = caption
        .as_ref()
        .filter(|c| !c.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| content_type.placeholder().unwrap_or_default().to_string());
    (content_type, text)
}
