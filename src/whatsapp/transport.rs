//! Mobile-chat transport surface.
//!
//! The bridge never speaks the WhatsApp protocol itself. An adapter
//! implements [`MobileTransport`] for commands and pushes [`MobileEvent`]s
//! into the bridge's mobile event queue.

use std::fmt;

use async_trait::async_trait;

use crate::common::error::TransportResult;

/// Commands the bridge issues to the mobile-chat client.
#[async_trait]
pub trait MobileTransport: Send + Sync {
    /// Start a new connection attempt. Progress is reported as events.
    async fn connect(&self) -> TransportResult<()>;

    /// Whether the stored credentials are already registered (paired).
    fn is_registered(&self) -> bool;

    /// Ask the server for an out-of-band pairing code for `phone` (digits only).
    async fn request_pairing_code(&self, phone: &str) -> TransportResult<String>;

    /// Send a text message to a remote identifier.
    async fn send_text(&self, remote_id: &str, text: &str) -> TransportResult<()>;

    /// Log out and invalidate the current session.
    async fn logout(&self) -> TransportResult<()>;
}

/// Events emitted by the mobile-chat client.
#[derive(Debug, Clone)]
pub enum MobileEvent {
    Connection(ConnectionUpdate),
    /// A fresh QR payload; implicitly invalidates the previous one.
    Qr(String),
    Messages {
        kind: UpsertKind,
        messages: Vec<RawMessage>,
    },
}

/// Connection progress reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Connecting,
    Open,
    Close(DisconnectReason),
}

/// Whether a message batch is live traffic or history sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Notify,
    Append,
}

/// A message as delivered by the transport, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    pub id: String,
    pub remote_id: String,
    pub push_name: Option<String>,
    /// Unix seconds.
    pub timestamp: Option<i64>,
    pub content: Option<RawContent>,
}

/// Message payload variants the bridge understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContent {
    Conversation(String),
    ExtendedText { text: String },
    Image { caption: Option<String> },
    Video { caption: Option<String> },
    Audio,
    /// Stickers, reactions, protocol messages, etc.
    Unsupported(String),
}

/// Why the transport connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    LoggedOut,
    BadSession,
    MultideviceMismatch,
    ConnectionClosed,
    ConnectionLost,
    ConnectionReplaced,
    RestartRequired,
    UnavailableService,
    Unknown(Option<u16>),
}

impl DisconnectReason {
    /// Map a transport status code to a reason.
    pub fn from_status_code(code: Option<u16>) -> Self {
        match code {
            Some(401) => Self::LoggedOut,
            Some(500) => Self::BadSession,
            Some(411) => Self::MultideviceMismatch,
            Some(428) => Self::ConnectionClosed,
            Some(408) => Self::ConnectionLost,
            Some(440) => Self::ConnectionReplaced,
            Some(515) => Self::RestartRequired,
            Some(503) => Self::UnavailableService,
            other => Self::Unknown(other),
        }
    }

    /// Terminal reasons require the operator to re-authenticate.
    ///
    /// Unknown reasons are transient.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::LoggedOut | Self::BadSession | Self::MultideviceMismatch
        )
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("logged out"),
            Self::BadSession => f.write_str("invalid session"),
            Self::MultideviceMismatch => f.write_str("multi-device version mismatch"),
            Self::ConnectionClosed => f.write_str("connection closed"),
            Self::ConnectionLost => f.write_str("connection lost"),
            Self::ConnectionReplaced => f.write_str("connection replaced"),
            Self::RestartRequired => f.write_str("restart required"),
            Self::UnavailableService => f.write_str("service unavailable"),
            Self::Unknown(Some(code)) => write!(f, "unknown ({})", code),
            Self::Unknown(None) => f.write_str("unknown"),
        }
    }
}
