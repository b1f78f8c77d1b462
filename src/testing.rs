//! Recording transport fakes for unit tests.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::common::error::{TransportError, TransportResult};
use crate::common::types::{ChatId, ThreadId};
use crate::telegram::transport::GroupTransport;
use crate::whatsapp::transport::MobileTransport;

/// Mobile transport that records every command.
#[derive(Debug, Default)]
pub struct FakeMobile {
    registered: AtomicBool,
    fail_connect: AtomicBool,
    fail_send: AtomicBool,
    connects: AtomicUsize,
    logouts: AtomicUsize,
    pairing_code: Mutex<Option<String>>,
    pairing_requests: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeMobile {
    pub fn set_registered(&self, registered: bool) {
        self.registered.store(registered, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Code returned by the next pairing requests; `None` makes them fail.
    pub fn set_pairing_code(&self, code: Option<&str>) {
        *self.pairing_code.lock().unwrap() = code.map(String::from);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn pairing_requests(&self) -> Vec<String> {
        self.pairing_requests.lock().unwrap().clone()
    }

    /// Successfully sent `(remote_id, text)` pairs.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MobileTransport for FakeMobile {
    async fn connect(&self) -> TransportResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                message: "connect refused".to_string(),
            });
        }
        Ok(())
    }

    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    async fn request_pairing_code(&self, phone: &str) -> TransportResult<String> {
        self.pairing_requests.lock().unwrap().push(phone.to_string());
        self.pairing_code
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::Rejected {
                message: "pairing refused".to_string(),
            })
    }

    async fn send_text(&self, remote_id: &str, text: &str) -> TransportResult<()> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout);
        }
        self.sent
            .lock()
            .unwrap()
            .push((remote_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn logout(&self) -> TransportResult<()> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.registered.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// A call observed by [`FakeGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupCall {
    Text {
        chat_id: ChatId,
        thread_id: Option<ThreadId>,
        text: String,
    },
    Image {
        chat_id: ChatId,
        caption: String,
    },
    CreateThread {
        chat_id: ChatId,
        name: String,
        thread_id: ThreadId,
    },
}

/// Group transport that records every successful call.
#[derive(Debug, Default)]
pub struct FakeGroup {
    fail_sends: AtomicBool,
    fail_threads: AtomicBool,
    last_thread_id: AtomicI64,
    calls: Mutex<Vec<GroupCall>>,
}

impl FakeGroup {
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_threads(&self, fail: bool) {
        self.fail_threads.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<GroupCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Successfully sent `(chat_id, thread_id, text)` triples.
    pub fn texts(&self) -> Vec<(ChatId, Option<ThreadId>, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GroupCall::Text {
                    chat_id,
                    thread_id,
                    text,
                } => Some((chat_id, thread_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn threads_created(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, GroupCall::CreateThread { .. }))
            .count()
    }
}

#[async_trait]
impl GroupTransport for FakeGroup {
    async fn send_text(
        &self,
        chat_id: ChatId,
        thread_id: Option<ThreadId>,
        text: &str,
    ) -> TransportResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout);
        }
        self.calls.lock().unwrap().push(GroupCall::Text {
            chat_id,
            thread_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_image(&self, chat_id: ChatId, _png: Bytes, caption: &str) -> TransportResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout);
        }
        self.calls.lock().unwrap().push(GroupCall::Image {
            chat_id,
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn create_thread(
        &self,
        chat_id: ChatId,
        name: &str,
        _icon_color: u32,
    ) -> TransportResult<ThreadId> {
        if self.fail_threads.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected {
                message: "not a forum".to_string(),
            });
        }
        let thread_id = self.last_thread_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().unwrap().push(GroupCall::CreateThread {
            chat_id,
            name: name.to_string(),
            thread_id,
        });
        Ok(thread_id)
    }
}
