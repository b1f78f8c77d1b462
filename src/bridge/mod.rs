//! Bridge between the mobile chat and the group chat.
//!
//! ## Module Structure
//!
//! - `channels`: Event queues feeding the orchestrator loop
//! - `context`: Read-only context shared with plugins and commands
//! - `formatter`: Mirror message formatting and splitting
//! - `router`: Message routing in both directions (`MessageRouter`)
//! - `operator`: Operator slash-command handling (`OperatorHandler`)
//! - `orchestrator`: Main bridge loop (`Orchestrator`)

pub mod channels;
pub mod context;
pub mod formatter;
pub mod operator;
pub mod orchestrator;
pub mod router;

pub use channels::{ChannelBundle, ControlChannels, LoopChannels, TransportSenders};
pub use context::{BotInfo, ConnectionHandle};
pub use operator::OperatorHandler;
pub use orchestrator::{Orchestrator, Transports};
pub use router::{MessageRouter, RouterSettings};
