//! Pluggable message processors.
//!
//! ## Module Structure
//!
//! - `pipeline`: Ordered, fault-isolated execution
//! - `registry`: Name -> constructor table and pipeline assembly
//! - `echo`, `help`, `status`, `pairing`, `redact`: Built-in plugins

pub mod echo;
pub mod help;
pub mod pairing;
pub mod pipeline;
pub mod redact;
pub mod registry;
pub mod status;

use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::context::BotInfo;
use crate::common::error::PluginError;
use crate::common::messages::InboundMessage;
use crate::common::types::Contact;
use crate::whatsapp::lifecycle::{ConnectionState, ConnectionStatus};

pub use pipeline::{Pipeline, PipelineResult};
pub use registry::{build_pipeline, PluginDeps, AVAILABLE_PLUGINS};

/// A message processor.
///
/// Plugins are stateless across messages. Every plugin sees the original
/// inbound message, regardless of what earlier plugins did.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap check whether `handle` should run for this message.
    fn matches(&self, message: &InboundMessage, contact: &Contact) -> bool;

    async fn handle(
        &self,
        message: &InboundMessage,
        contact: &Contact,
        ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError>;
}

/// What a plugin wants done with a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOutput {
    /// Text sent back to the sender.
    pub reply_text: Option<String>,
    /// Replacement for the mirrored text.
    pub rewritten_text: Option<String>,
}

impl PluginOutput {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply_text: Some(text.into()),
            rewritten_text: None,
        }
    }

    pub fn rewrite(text: impl Into<String>) -> Self {
        Self {
            reply_text: None,
            rewritten_text: Some(text.into()),
        }
    }
}

/// Read-only facts available to plugins.
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub bot: BotInfo,
    pub connection: ConnectionStatus,
    pub plugins_loaded: usize,
    pub bridge_active: bool,
}

impl PluginContext {
    pub fn uptime(&self) -> Duration {
        self.bot.uptime()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.state == ConnectionState::Connected
    }
}

/// Split `!command rest` into `(command, rest)` when `text` starts with `!`.
pub(crate) fn bang_command(text: &str) -> Option<(String, &str)> {
    let body = text.trim_start().strip_prefix('!')?;
    let (command, rest) = match body.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (body.trim_end(), ""),
    };
    if command.is_empty() {
        return None;
    }
    Some((command.to_lowercase(), rest))
}
