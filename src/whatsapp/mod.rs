//! Mobile-chat (WhatsApp) side: transport surface, phone policy and the
//! connection lifecycle.

pub mod lifecycle;
pub mod phone;
pub mod transport;

pub use lifecycle::{
    AuthMode, ConnectionHandle, ConnectionState, ConnectionStatus, LifecycleManager,
    LifecycleSettings, PairingRequest, TimerEvent,
};
pub use phone::{DigitRangePolicy, PhonePolicy};
pub use transport::{
    ConnectionUpdate, DisconnectReason, MobileEvent, MobileTransport, RawContent, RawMessage,
    UpsertKind,
};
