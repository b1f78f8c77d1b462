//! Shared types used across the application.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned contact identifier.
pub type ContactId = u64;

/// Group chat identifier (negative for Telegram groups).
pub type ChatId = i64;

/// Forum topic (thread) identifier inside a group chat.
pub type ThreadId = i64;

/// A remote contact on the mobile-chat side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    /// Opaque transport identifier, e.g. `5551234@s.whatsapp.net`.
    pub remote_id: String,
    pub name: Option<String>,
    /// Local part of the remote identifier.
    pub phone: String,
    /// Mirror thread, bound once on the first mirrored message.
    pub thread_id: Option<ThreadId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Best human-readable label for this contact.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                if self.phone.is_empty() {
                    local_part(&self.remote_id)
                } else {
                    &self.phone
                }
            })
    }
}

/// Return the part of a remote identifier before `@`.
pub fn local_part(remote_id: &str) -> &str {
    remote_id.split('@').next().unwrap_or(remote_id)
}

/// Direction of a logged message relative to the mobile-chat side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Platform a message was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    WhatsApp,
    Telegram,
}

/// Kind of content carried by a mobile-chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "conversation")]
    Conversation,
    #[serde(rename = "extendedTextMessage")]
    ExtendedText,
    #[serde(rename = "imageMessage")]
    Image,
    #[serde(rename = "videoMessage")]
    Video,
    #[serde(rename = "audioMessage")]
    Audio,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::ExtendedText => "extendedTextMessage",
            Self::Image => "imageMessage",
            Self::Video => "videoMessage",
            Self::Audio => "audioMessage",
        }
    }

    /// Placeholder text for media without a caption.
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Image => Some("[image]"),
            Self::Video => Some("[video]"),
            Self::Audio => Some("[audio]"),
            Self::Conversation | Self::ExtendedText => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record to be appended to the message log.
#[derive(Debug, Clone)]
pub struct NewMessageRecord {
    pub contact_id: ContactId,
    pub native_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub platform: Platform,
    pub direction: Direction,
}

/// An append-only message log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: u64,
    pub contact_id: ContactId,
    pub native_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub platform: Platform,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
}

/// The single binding of the mobile-chat side to a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRoute {
    pub chat_id: ChatId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
