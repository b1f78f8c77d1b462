//! Fixed-delay reconnection policy.

use std::time::Duration;

use backon::{BackoffBuilder, ConstantBackoff, ConstantBuilder};

/// Configuration for reconnection attempts.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay between a transient disconnect and the next attempt.
    pub delay: Duration,
    /// Maximum number of consecutive attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: 10,
        }
    }
}

/// Tracks consecutive reconnection attempts and hands out delays.
pub struct ReconnectState {
    config: ReconnectConfig,
    attempts: u32,
    backoff: ConstantBackoff,
}

impl ReconnectState {
    pub fn new(config: ReconnectConfig) -> Self {
        let backoff = build_backoff(&config);
        Self {
            config,
            attempts: 0,
            backoff,
        }
    }

    /// Returns the next delay, or None if max attempts exceeded.
    ///
    /// The attempt counter only moves when a delay is handed out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = self.backoff.next()?;
        self.attempts += 1;
        Some(delay)
    }

    /// Reset state after successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.backoff = build_backoff(&self.config);
    }

    /// Get current attempt count.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}

impl std::fmt::Debug for ReconnectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectState")
            .field("config", &self.config)
            .field("attempts", &self.attempts)
            .finish()
    }
}

fn build_backoff(config: &ReconnectConfig) -> ConstantBackoff {
    ConstantBuilder::default()
        .with_delay(config.delay)
        .with_max_times(config.max_attempts as usize)
        .build()
}
