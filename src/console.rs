//! Local console transports.
//!
//! Stand-ins for the real WhatsApp and Telegram adapters: outgoing traffic
//! is printed to stdout and stdin lines are turned into transport events.
//!
//! Input lines:
//!
//! - `wa <remote> <text>`: message from a contact
//! - `tg [#thread] <text>`: message (or `/command`) in the admin chat
//! - `link`: finish authentication
//! - `drop [status code]`: close the connection

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bridge::channels::TransportSenders;
use crate::common::error::{TransportError, TransportResult};
use crate::common::types::{ChatId, ThreadId};
use crate::telegram::transport::{ChatKind, GroupEvent, GroupMessage, GroupTransport};
use crate::whatsapp::transport::{
    ConnectionUpdate, DisconnectReason, MobileEvent, MobileTransport, RawContent, RawMessage,
    UpsertKind,
};

const USAGE: &str = "Usage: wa <remote> <text> | tg [#thread] <text> | link | drop [code]";

/// Mobile transport printing to the console.
#[derive(Debug)]
pub struct ConsoleMobile {
    events: mpsc::UnboundedSender<MobileEvent>,
    registered: AtomicBool,
    qr_count: AtomicU64,
}

impl ConsoleMobile {
    pub fn new(events: mpsc::UnboundedSender<MobileEvent>) -> Self {
        Self {
            events,
            registered: AtomicBool::new(false),
            qr_count: AtomicU64::new(0),
        }
    }

    fn emit(&self, event: MobileEvent) -> TransportResult<()> {
        self.events.send(event).map_err(|_| TransportError::NotReady {
            message: "bridge is not running".to_string(),
        })
    }

    /// Simulate a completed login.
    fn link(&self) -> TransportResult<()> {
        self.registered.store(true, Ordering::SeqCst);
        self.emit(MobileEvent::Connection(ConnectionUpdate::Open))
    }
}

#[async_trait]
impl MobileTransport for ConsoleMobile {
    async fn connect(&self) -> TransportResult<()> {
        self.emit(MobileEvent::Connection(ConnectionUpdate::Connecting))?;
        if self.registered.load(Ordering::SeqCst) {
            return self.emit(MobileEvent::Connection(ConnectionUpdate::Open));
        }
        let n = self.qr_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(MobileEvent::Qr(format!("ferryman-console-login-{}", n)))
    }

    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    async fn request_pairing_code(&self, phone: &str) -> TransportResult<String> {
        if phone.len() < 8 {
            return Err(TransportError::Rejected {
                message: format!("number too short: {}", phone),
            });
        }
        // Deterministic stand-in code
        let code: String = phone[phone.len() - 8..]
            .bytes()
            .map(|b| char::from(b'A' + b.wrapping_sub(b'0') % 10))
            .collect();
        Ok(code)
    }

    async fn send_text(&self, remote_id: &str, text: &str) -> TransportResult<()> {
        println!("[wa -> {}] {}", remote_id, text);
        Ok(())
    }

    async fn logout(&self) -> TransportResult<()> {
        self.registered.store(false, Ordering::SeqCst);
        println!("[wa] logged out");
        Ok(())
    }
}

/// Group transport printing to the console.
#[derive(Debug, Default)]
pub struct ConsoleGroup {
    last_thread_id: AtomicI64,
}

#[async_trait]
impl GroupTransport for ConsoleGroup {
    async fn send_text(
        &self,
        chat_id: ChatId,
        thread_id: Option<ThreadId>,
        text: &str,
    ) -> TransportResult<()> {
        match thread_id {
            Some(thread_id) => println!("[tg {} #{}] {}", chat_id, thread_id, text),
            None => println!("[tg {}] {}", chat_id, text),
        }
        Ok(())
    }

    async fn send_image(&self, chat_id: ChatId, png: Bytes, caption: &str) -> TransportResult<()> {
        println!("[tg {}] <image, {} bytes> {}", chat_id, png.len(), caption);
        Ok(())
    }

    async fn create_thread(
        &self,
        chat_id: ChatId,
        name: &str,
        _icon_color: u32,
    ) -> TransportResult<ThreadId> {
        let thread_id = self.last_thread_id.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[tg {}] created thread #{} '{}'", chat_id, thread_id, name);
        Ok(thread_id)
    }
}

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Mobile { remote_id: String, text: String },
    Group { thread_id: Option<ThreadId>, text: String },
    Link,
    Drop(DisconnectReason),
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match head {
            "wa" => {
                let (remote, text) = rest.split_once(char::is_whitespace)?;
                let remote_id = if remote.contains('@') {
                    remote.to_string()
                } else {
                    format!("{}@s.whatsapp.net", remote)
                };
                Some(Self::Mobile {
                    remote_id,
                    text: text.trim().to_string(),
                })
            }
            "tg" if !rest.is_empty() => {
                let thread = rest
                    .strip_prefix('#')
                    .and_then(|r| r.split_once(char::is_whitespace))
                    .and_then(|(id, text)| Some((id.parse().ok()?, text.trim())));
                Some(match thread {
                    Some((thread_id, text)) => Self::Group {
                        thread_id: Some(thread_id),
                        text: text.to_string(),
                    },
                    None => Self::Group {
                        thread_id: None,
                        text: rest.to_string(),
                    },
                })
            }
            "link" => Some(Self::Link),
            "drop" => {
                let code = rest.parse().ok();
                Some(Self::Drop(DisconnectReason::from_status_code(code)))
            }
            _ => None,
        }
    }
}

/// Read stdin until EOF, turning lines into transport events.
///
/// Group messages appear to come from `chat_id`.
pub async fn read_stdin(senders: TransportSenders, mobile: Arc<ConsoleMobile>, chat_id: ChatId) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut counter: u64 = 0;

    println!("{}", USAGE);
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Console input closed");
                return;
            }
            Err(e) => {
                warn!("Failed to read console input: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        counter += 1;

        let result = match ConsoleInput::parse(&line) {
            Some(ConsoleInput::Mobile { remote_id, text }) => {
                let message = RawMessage {
                    id: format!("CONSOLE-{}", counter),
                    remote_id,
                    push_name: None,
                    timestamp: Some(Utc::now().timestamp()),
                    content: Some(RawContent::Conversation(text)),
                };
                senders
                    .mobile_tx
                    .send(MobileEvent::Messages {
                        kind: UpsertKind::Notify,
                        messages: vec![message],
                    })
                    .is_ok()
            }
            Some(ConsoleInput::Group { thread_id, text }) => {
                let chat_kind = if chat_id < 0 {
                    ChatKind::Supergroup
                } else {
                    ChatKind::Private
                };
                let message = GroupMessage {
                    chat_id,
                    chat_kind,
                    thread_id,
                    message_id: counter as i64,
                    sender: "console".to_string(),
                    text,
                };
                senders.group_tx.send(GroupEvent::Message(message)).is_ok()
            }
            Some(ConsoleInput::Link) => mobile.link().is_ok(),
            Some(ConsoleInput::Drop(reason)) => {
                info!("Simulating disconnect: {}", reason);
                mobile
                    .emit(MobileEvent::Connection(ConnectionUpdate::Close(reason)))
                    .is_ok()
            }
            None => {
                println!("{}", USAGE);
                true
            }
        };

        if !result {
            debug!("Bridge queues closed, stopping console input");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mobile_line() {
        assert_eq!(
            ConsoleInput::parse("wa 5551234 hello there"),
            Some(ConsoleInput::Mobile {
                remote_id: "5551234@s.whatsapp.net".to_string(),
                text: "hello there".to_string(),
            })
        );
        assert_eq!(
            ConsoleInput::parse("wa 555@x hi"),
            Some(ConsoleInput::Mobile {
                remote_id: "555@x".to_string(),
                text: "hi".to_string(),
            })
        );
        assert_eq!(ConsoleInput::parse("wa 555"), None);
    }

    #[test]
    fn test_parse_group_line() {
        assert_eq!(
            ConsoleInput::parse("tg /status"),
            Some(ConsoleInput::Group {
                thread_id: None,
                text: "/status".to_string(),
            })
        );
        assert_eq!(
            ConsoleInput::parse("tg #3 see you"),
            Some(ConsoleInput::Group {
                thread_id: Some(3),
                text: "see you".to_string(),
            })
        );
        assert_eq!(ConsoleInput::parse("tg"), None);
    }

    #[test]
    fn test_parse_control_lines() {
        assert_eq!(ConsoleInput::parse("link"), Some(ConsoleInput::Link));
        assert_eq!(
            ConsoleInput::parse("drop 401"),
            Some(ConsoleInput::Drop(DisconnectReason::LoggedOut))
        );
        assert_eq!(
            ConsoleInput::parse("drop"),
            Some(ConsoleInput::Drop(DisconnectReason::Unknown(None)))
        );
        assert_eq!(ConsoleInput::parse("what"), None);
    }

    #[tokio::test]
    async fn test_connect_emits_qr_until_linked() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mobile = ConsoleMobile::new(tx);

        mobile.connect().await.unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(MobileEvent::Connection(ConnectionUpdate::Connecting))
        ));
        assert!(matches!(rx.recv().await, Some(MobileEvent::Qr(_))));

        mobile.link().unwrap();
        assert!(mobile.is_registered());
        assert!(matches!(
            rx.recv().await,
            Some(MobileEvent::Connection(ConnectionUpdate::Open))
        ));
    }

    #[tokio::test]
    async fn test_pairing_code_is_deterministic() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mobile = ConsoleMobile::new(tx);
        assert_eq!(mobile.request_pairing_code("15551234567").await.unwrap(), "FBCDEFGH");
    }
}
