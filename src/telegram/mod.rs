//! Group-chat (Telegram) side: transport surface, operator command parsing
//! and QR/pairing-code delivery.

pub mod commands;
pub mod delivery;
pub mod transport;

pub use commands::OperatorCommand;
pub use delivery::Delivery;
pub use transport::{ChatKind, GroupEvent, GroupMessage, GroupTransport};
