//! Read-only context shared by the router, plugins and operator commands.

use std::time::Duration;

use chrono::{DateTime, Utc};

pub use crate::whatsapp::lifecycle::ConnectionHandle;

/// Static facts about the running bot.
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub name: String,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
}

impl BotInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION"),
            started_at: Utc::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        (Utc::now() - self.started_at).to_std().unwrap_or_default()
    }
}
