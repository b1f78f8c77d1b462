//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod reconnect;
pub mod types;

pub use error::{AppError, ConfigError, StoreError, TransportError};
pub use messages::InboundMessage;
pub use types::{
    BridgeRoute, ChatId, Contact, ContactId, ContentType, Direction, MessageRecord,
    NewMessageRecord, Platform, ThreadId,
};
