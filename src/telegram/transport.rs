//! Group-chat transport surface.
//!
//! The bot API itself lives behind [`GroupTransport`]; adapters push
//! [`GroupEvent`]s into the bridge's group event queue.

use async_trait::async_trait;
use bytes::Bytes;

use crate::common::error::TransportResult;
use crate::common::types::{ChatId, ThreadId};

/// Commands the bridge issues to the group-chat bot.
#[async_trait]
pub trait GroupTransport: Send + Sync {
    /// Send a text message, optionally into a forum thread.
    async fn send_text(
        &self,
        chat_id: ChatId,
        thread_id: Option<ThreadId>,
        text: &str,
    ) -> TransportResult<()>;

    /// Send a PNG image with a caption.
    async fn send_image(&self, chat_id: ChatId, png: Bytes, caption: &str) -> TransportResult<()>;

    /// Create a forum thread and return its id.
    async fn create_thread(
        &self,
        chat_id: ChatId,
        name: &str,
        icon_color: u32,
    ) -> TransportResult<ThreadId>;
}

/// Events emitted by the group-chat bot.
#[derive(Debug, Clone)]
pub enum GroupEvent {
    Message(GroupMessage),
}

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// A message observed in the group chat.
#[derive(Debug, Clone)]
pub struct GroupMessage {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    /// Forum thread the message was posted in, if any.
    pub thread_id: Option<ThreadId>,
    pub message_id: i64,
    /// Display name of the author.
    pub sender: String,
    pub text: String,
}
