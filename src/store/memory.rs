//! In-process contact store.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::state::StoreState;
use super::{build_record, ContactStore};
use crate::common::error::StoreResult;
use crate::common::types::{
    BridgeRoute, ChatId, Contact, ContactId, MessageRecord, NewMessageRecord, ThreadId,
};

/// Volatile store. Everything is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    state: StoreState,
    messages: Vec<MessageRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn get_contact(&self, remote_id: &str) -> StoreResult<Option<Contact>> {
        Ok(self.inner.lock().await.state.get_contact(remote_id))
    }

    async fn find_by_thread(&self, thread_id: ThreadId) -> StoreResult<Option<Contact>> {
        Ok(self.inner.lock().await.state.find_by_thread(thread_id))
    }

    async fn create_contact(
        &self,
        remote_id: &str,
        name: Option<&str>,
        phone: &str,
    ) -> StoreResult<Contact> {
        self.inner
            .lock()
            .await
            .state
            .create_contact(remote_id, name, phone, Utc::now())
    }

    async fn bind_thread(&self, remote_id: &str, thread_id: ThreadId) -> StoreResult<Contact> {
        let (contact, _) = self
            .inner
            .lock()
            .await
            .state
            .bind_thread(remote_id, thread_id, Utc::now())?;
        Ok(contact)
    }

    async fn append_message(&self, record: NewMessageRecord) -> StoreResult<MessageRecord> {
        let mut inner = self.inner.lock().await;
        let record = build_record(inner.messages.len() as u64 + 1, record, Utc::now());
        inner.messages.push(record.clone());
        Ok(record)
    }

    async fn get_route(&self) -> StoreResult<Option<BridgeRoute>> {
        Ok(self.inner.lock().await.state.route())
    }

    async fn set_route(&self, chat_id: ChatId) -> StoreResult<BridgeRoute> {
        Ok(self.inner.lock().await.state.set_route(chat_id, Utc::now()))
    }

    async fn messages_for(&self, contact_id: ContactId) -> StoreResult<Vec<MessageRecord>> {
        Ok(self
            .inner
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.contact_id == contact_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{ContentType, Direction, Platform};
    use tokio_test::{assert_err, assert_ok};

    fn record(contact_id: ContactId, content: &str) -> NewMessageRecord {
        NewMessageRecord {
            contact_id,
            native_id: format!("id-{}", content),
            content: content.to_string(),
            content_type: ContentType::Conversation,
            platform: Platform::WhatsApp,
            direction: Direction::Inbound,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_contact() {
        let store = MemoryStore::new();
        assert!(store.get_contact("555@x").await.unwrap().is_none());

        let created = assert_ok!(store.create_contact("555@x", Some("Alice"), "555").await);
        let fetched = store.get_contact("555@x").await.unwrap().unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.name.as_deref(), Some("Alice"));
        assert!(fetched.thread_id.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_contact_is_constraint_violation() {
        let store = MemoryStore::new();
        store.create_contact("555@x", None, "555").await.unwrap();
        let err = assert_err!(store.create_contact("555@x", Some("Other"), "555").await);
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_thread_binding_is_permanent() {
        let store = MemoryStore::new();
        store.create_contact("555@x", None, "555").await.unwrap();

        let bound = store.bind_thread("555@x", 42).await.unwrap();
        assert_eq!(bound.thread_id, Some(42));
        assert_ok!(store.bind_thread("555@x", 42).await);
        assert_err!(store.bind_thread("555@x", 43).await);

        let contact = store.find_by_thread(42).await.unwrap().unwrap();
        assert_eq!(contact.remote_id, "555@x");
        assert_eq!(contact.thread_id, Some(42));
        assert!(store.find_by_thread(43).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_route_replacement() {
        let store = MemoryStore::new();
        assert!(store.get_route().await.unwrap().is_none());

        store.set_route(-1001).await.unwrap();
        store.set_route(-1002).await.unwrap();

        let route = store.get_route().await.unwrap().unwrap();
        assert_eq!(route.chat_id, -1002);
        assert!(route.active);
    }

    #[tokio::test]
    async fn test_message_log() {
        let store = MemoryStore::new();
        let a = store.create_contact("a@x", None, "a").await.unwrap();
        let b = store.create_contact("b@x", None, "b").await.unwrap();

        let first = store.append_message(record(a.id, "one")).await.unwrap();
        store.append_message(record(b.id, "two")).await.unwrap();
        let third = store.append_message(record(a.id, "three")).await.unwrap();
        assert!(third.id > first.id);

        let log = store.messages_for(a.id).await.unwrap();
        let contents: Vec<_> = log.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "three"]);
    }
}
