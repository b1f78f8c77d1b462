//! Durable JSON store.
//!
//! Contacts and the bridge route live in `contacts.json`, rewritten through a
//! temporary file and an atomic rename. Message records are appended one JSON
//! object per line to `messages.jsonl`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::state::{Snapshot, StoreState};
use super::{build_record, ContactStore};
use crate::common::error::StoreResult;
use crate::common::types::{
    BridgeRoute, ChatId, Contact, ContactId, MessageRecord, NewMessageRecord, ThreadId,
};

const CONTACTS_FILE: &str = "contacts.json";
const CONTACTS_TMP_FILE: &str = "contacts.json.tmp";
const MESSAGES_FILE: &str = "messages.jsonl";

/// Store persisted under a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: StoreState,
    last_message_id: u64,
}

impl JsonFileStore {
    /// Open (or create) a store in `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        let state = match fs::read(dir.join(CONTACTS_FILE)).await {
            Ok(bytes) => StoreState::from_snapshot(serde_json::from_slice::<Snapshot>(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(e.into()),
        };

        repair_log_tail(&dir).await?;
        let last_message_id = read_messages(&dir)
            .await?
            .iter()
            .map(|m| m.id)
            .max()
            .unwrap_or(0);

        debug!(
            "Opened store at {} (last message id {})",
            dir.display(),
            last_message_id
        );

        Ok(Self {
            dir,
            inner: Mutex::new(Inner {
                state,
                last_message_id,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Apply a mutation to a copy of the state and commit it once written.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> StoreResult<(T, bool)>,
    ) -> StoreResult<T> {
        let mut inner = self.inner.lock().await;
        let mut next = inner.state.clone();
        let (value, changed) = f(&mut next)?;
        if changed {
            self.write_snapshot(&next.snapshot()).await?;
            inner.state = next;
        }
        Ok(value)
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.dir.join(CONTACTS_TMP_FILE);

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, self.dir.join(CONTACTS_FILE)).await?;
        Ok(())
    }
}

/// Cut a torn final line left by a crash mid-append, so the next append
/// starts on a fresh line.
async fn repair_log_tail(dir: &Path) -> StoreResult<()> {
    let path = dir.join(MESSAGES_FILE);
    let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if bytes.last().map_or(true, |&b| b == b'\n') {
        return Ok(());
    }

    let keep = bytes
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |n| n + 1);
    warn!(
        "Dropping {} bytes of torn message log tail",
        bytes.len() - keep
    );
    let file = OpenOptions::new().write(true).open(&path).await?;
    file.set_len(keep as u64).await?;
    file.sync_all().await?;
    Ok(())
}

async fn read_messages(dir: &Path) -> StoreResult<Vec<MessageRecord>> {
    let content = match fs::read_to_string(dir.join(MESSAGES_FILE)).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<MessageRecord>(line) {
            Ok(record) => records.push(record),
            // A torn final line from a crash mid-append
            Err(e) => warn!("Skipping unreadable message log line {}: {}", n + 1, e),
        }
    }
    Ok(records)
}

#[async_trait]
impl ContactStore for JsonFileStore {
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
        self.mutate(|state| {
            state
                .create_contact(remote_id, name, phone, Utc::now())
                .map(|c| (c, true))
        })
        .await
    }

    async fn bind_thread(&self, remote_id: &str, thread_id: ThreadId) -> StoreResult<Contact> {
        self.mutate(|state| state.bind_thread(remote_id, thread_id, Utc::now()))
            .await
    }

    async fn append_message(&self, record: NewMessageRecord) -> StoreResult<MessageRecord> {
        let mut inner = self.inner.lock().await;
        let record = build_record(inner.last_message_id + 1, record, Utc::now());

        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(MESSAGES_FILE))
            .await?;
        let len = file.metadata().await?.len();
        let written = match file.write_all(&line).await {
            Ok(()) => file.sync_data().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Leave no partial line behind
            if let Err(trunc) = file.set_len(len).await {
                warn!("Failed to roll back message log append: {}", trunc);
            }
            return Err(e.into());
        }

        inner.last_message_id = record.id;
        Ok(record)
    }

    async fn get_route(&self) -> StoreResult<Option<BridgeRoute>> {
        Ok(self.inner.lock().await.state.route())
    }

    async fn set_route(&self, chat_id: ChatId) -> StoreResult<BridgeRoute> {
        self.mutate(|state| Ok((state.set_route(chat_id, Utc::now()), true)))
            .await
    }

    async fn messages_for(&self, contact_id: ContactId) -> StoreResult<Vec<MessageRecord>> {
        // Appends hold the lock, so no partial line is read here
        let _guard = self.inner.lock().await;
        Ok(read_messages(&self.dir)
            .await?
            .into_iter()
            .filter(|m| m.contact_id == contact_id)
            .collect())
    }
}
