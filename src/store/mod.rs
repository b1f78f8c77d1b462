//! Contact, message log and bridge route persistence.
//!
//! ## Module Structure
//!
//! - `state`: In-memory core shared by every implementation
//! - `memory`: Process-local store
//! - `file`: Durable JSON store under `database.path`

pub mod file;
pub mod memory;
mod state;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::error::StoreResult;
use crate::common::types::{
    BridgeRoute, ChatId, Contact, ContactId, MessageRecord, NewMessageRecord, ThreadId,
};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Persistence seam for contacts, the message log and the bridge route.
///
/// Every operation is atomic with respect to the others.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn get_contact(&self, remote_id: &str) -> StoreResult<Option<Contact>>;

    /// Reverse lookup from a mirror thread to its contact.
    async fn find_by_thread(&self, thread_id: ThreadId) -> StoreResult<Option<Contact>>;

    /// Create a contact. Fails with a constraint violation if `remote_id` exists.
    async fn create_contact(
        &self,
        remote_id: &str,
        name: Option<&str>,
        phone: &str,
    ) -> StoreResult<Contact>;

    /// Bind a mirror thread to a contact.
    ///
    /// Binding the same thread twice is a no-op. Rebinding to a different
    /// thread, or binding a thread owned by another contact, is a constraint
    /// violation.
    async fn bind_thread(&self, remote_id: &str, thread_id: ThreadId) -> StoreResult<Contact>;

    async fn append_message(&self, record: NewMessageRecord) -> StoreResult<MessageRecord>;

    async fn get_route(&self) -> StoreResult<Option<BridgeRoute>>;

    /// Replace the bridge route.
    async fn set_route(&self, chat_id: ChatId) -> StoreResult<BridgeRoute>;

    /// Message log entries for a contact, oldest first.
    async fn messages_for(&self, contact_id: ContactId) -> StoreResult<Vec<MessageRecord>>;
}

fn build_record(id: u64, record: NewMessageRecord, created_at: DateTime<Utc>) -> MessageRecord {
    MessageRecord {
        id,
        contact_id: record.contact_id,
        native_id: record.native_id,
        content: record.content,
        content_type: record.content_type,
        platform: record.platform,
        direction: record.direction,
        created_at,
    }
}
