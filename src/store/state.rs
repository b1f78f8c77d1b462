//! Contact and route state shared by the store implementations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::error::{StoreError, StoreResult};
use crate::common::types::{BridgeRoute, ChatId, Contact, ThreadId};

/// Serialized form of [`StoreState`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Snapshot {
    pub last_contact_id: u64,
    pub contacts: Vec<Contact>,
    pub route: Option<BridgeRoute>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    last_contact_id: u64,
    contacts: HashMap<String, Contact>,
    /// thread id -> remote id
    threads: HashMap<ThreadId, String>,
    route: Option<BridgeRoute>,
}

impl StoreState {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut state = Self {
            last_contact_id: snapshot.last_contact_id,
            route: snapshot.route,
            ..Self::default()
        };
        for contact in snapshot.contacts {
            state.last_contact_id = state.last_contact_id.max(contact.id);
            if let Some(thread_id) = contact.thread_id {
                state.threads.insert(thread_id, contact.remote_id.clone());
            }
            state.contacts.insert(contact.remote_id.clone(), contact);
        }
        state
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut contacts: Vec<Contact> = self.contacts.values().cloned().collect();
        contacts.sort_by_key(|c| c.id);
        Snapshot {
            last_contact_id: self.last_contact_id,
            contacts,
            route: self.route.clone(),
        }
    }

    pub fn get_contact(&self, remote_id: &str) -> Option<Contact> {
        self.contacts.get(remote_id).cloned()
    }

    pub fn find_by_thread(&self, thread_id: ThreadId) -> Option<Contact> {
        self.threads
            .get(&thread_id)
            .and_then(|remote_id| self.contacts.get(remote_id))
            .cloned()
    }

    pub fn create_contact(
        &mut self,
        remote_id: &str,
        name: Option<&str>,
        phone: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Contact> {
        if self.contacts.contains_key(remote_id) {
            return Err(StoreError::constraint(format!(
                "contact '{}' already exists",
                remote_id
            )));
        }

        self.last_contact_id += 1;
        let contact = Contact {
            id: self.last_contact_id,
            remote_id: remote_id.to_string(),
            name: name.map(String::from),
            phone: phone.to_string(),
            thread_id: None,
            created_at: now,
            updated_at: now,
        };
        self.contacts.insert(contact.remote_id.clone(), contact.clone());
        Ok(contact)
    }

    /// Returns the contact and whether anything changed.
    pub fn bind_thread(
        &mut self,
        remote_id: &str,
        thread_id: ThreadId,
        now: DateTime<Utc>,
    ) -> StoreResult<(Contact, bool)> {
        let contact = self
            .contacts
            .get(remote_id)
            .ok_or_else(|| StoreError::ContactNotFound {
                remote_id: remote_id.to_string(),
            })?;

        match contact.thread_id {
            Some(existing) if existing == thread_id => return Ok((contact.clone(), false)),
            Some(existing) => {
                return Err(StoreError::constraint(format!(
                    "contact '{}' is already bound to thread {}",
                    remote_id, existing
                )))
            }
            None => {}
        }

        if let Some(owner) = self.threads.get(&thread_id) {
            return Err(StoreError::constraint(format!(
                "thread {} is already bound to '{}'",
                thread_id, owner
            )));
        }

        let contact = self
            .contacts
            .get_mut(remote_id)
            .ok_or_else(|| StoreError::ContactNotFound {
                remote_id: remote_id.to_string(),
            })?;
        contact.thread_id = Some(thread_id);
        contact.updated_at = now;
        self.threads.insert(thread_id, remote_id.to_string());
        Ok((contact.clone(), true))
    }

    pub fn route(&self) -> Option<BridgeRoute> {
        self.route.clone()
    }

    pub fn set_route(&mut self, chat_id: ChatId, now: DateTime<Utc>) -> BridgeRoute {
        let route = BridgeRoute {
            chat_id,
            active: true,
            created_at: now,
        };
        self.route = Some(route.clone());
        route
    }
}
