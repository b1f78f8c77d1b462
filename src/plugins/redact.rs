//! Redaction of mirrored text with regex patterns.
//!
//! Rewrites every match of the configured patterns to `[redacted]` before
//! the text is mirrored. Replies are never produced.

use async_trait::async_trait;
use fancy_regex::Regex;
use tracing::warn;

use super::{Plugin, PluginContext, PluginOutput};
use crate::common::error::PluginError;
use crate::common::messages::InboundMessage;
use crate::common::types::Contact;

pub const REDACTED: &str = "[redacted]";

/// A compiled regex pattern with its original string for debugging.
#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

#[derive(Debug, Clone)]
pub struct RedactPlugin {
    patterns: Vec<CompiledPattern>,
}

impl RedactPlugin {
    /// Invalid regex patterns are logged and skipped.
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: compile_patterns(patterns),
        }
    }

    pub fn has_patterns(&self) -> bool {
        !self.patterns.is_empty()
    }

    fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| {
            p.regex.is_match(text).unwrap_or_else(|e| {
                warn!("Regex match error for pattern '{}': {}", p.original, e);
                false
            })
        })
    }

    fn redact(&self, text: &str) -> Result<String, PluginError> {
        let mut redacted = text.to_string();
        for p in &self.patterns {
            redacted = replace_all(&p.regex, &redacted).map_err(|e| {
                PluginError::new("redact", format!("pattern '{}': {}", p.original, e))
            })?;
        }
        Ok(redacted)
    }
}

/// Replace every match with [`REDACTED`], surfacing backtracking errors
/// instead of panicking.
fn replace_all(regex: &Regex, text: &str) -> fancy_regex::Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in regex.find_iter(text) {
        let m = m?;
        out.push_str(&text[last..m.start()]);
        out.push_str(REDACTED);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[async_trait]
impl Plugin for RedactPlugin {
    fn name(&self) -> &'static str {
        "redact"
    }

    fn matches(&self, message: &InboundMessage, _contact: &Contact) -> bool {
        self.is_match(&message.text)
    }

    async fn handle(
        &self,
        message: &InboundMessage,
        _contact: &Contact,
        _ctx: &PluginContext,
    ) -> Result<PluginOutput, PluginError> {
        Ok(PluginOutput::rewrite(self.redact(&message.text)?))
    }
}

/// Compile a list of regex pattern strings, skipping invalid ones.
fn compile_patterns(patterns: &[String]) -> Vec<CompiledPattern> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(CompiledPattern {
                original: pattern.clone(),
                regex,
            }),
            Err(e) => {
                warn!("Invalid redact regex pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::test_support::{contact, context, message};
    use crate::whatsapp::lifecycle::ConnectionState;

    fn plugin(patterns: &[&str]) -> RedactPlugin {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        RedactPlugin::new(&patterns)
    }

    async fn rewrite(plugin: &RedactPlugin, text: &str) -> Option<String> {
        let msg = message(text);
        if !plugin.matches(&msg, &contact()) {
            return None;
        }
        plugin
            .handle(&msg, &contact(), &context(ConnectionState::Connected))
            .await
            .unwrap()
            .rewritten_text
    }

    #[tokio::test]
    async fn test_no_patterns_never_matches() {
        let plugin = plugin(&[]);
        assert!(!plugin.has_patterns());
        assert_eq!(rewrite(&plugin, "anything").await, None);
    }

    #[tokio::test]
    async fn test_card_numbers_redacted() {
        let plugin = plugin(&[r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{4}\b"]);
        assert_eq!(
            rewrite(&plugin, "card 4111 1111 1111 1111 thanks").await.as_deref(),
            Some("card [redacted] thanks")
        );
        assert_eq!(rewrite(&plugin, "call me at 5").await, None);
    }

    #[tokio::test]
    async fn test_multiple_patterns() {
        let plugin = plugin(&["(?i)password:\\s*\\S+", "secret"]);
        assert_eq!(
            rewrite(&plugin, "Password: hunter2 is secret").await.as_deref(),
            Some("[redacted] is [redacted]")
        );
    }

    #[tokio::test]
    async fn test_invalid_regex_skipped() {
        let plugin = plugin(&["[invalid", "valid"]);
        assert!(plugin.has_patterns());
        assert_eq!(
            rewrite(&plugin, "valid pattern").await.as_deref(),
            Some("[redacted] pattern")
        );
    }

    #[test]
    fn test_backtrack_limit_is_an_error() {
        let pattern = "(?i)(a|b|ab)*(?=c)";
        let regex = fancy_regex::RegexBuilder::new(pattern)
            .backtrack_limit(100_000)
            .build()
            .unwrap();
        let plugin = RedactPlugin {
            patterns: vec![CompiledPattern {
                original: pattern.to_string(),
                regex,
            }],
        };
        let err = plugin.redact(&"ab".repeat(28)).unwrap_err();
        assert_eq!(err.plugin, "redact");
        assert!(err.message.contains(pattern));
    }

    #[tokio::test]
    async fn test_negative_lookahead() {
        // "token" not followed by "s"
        let plugin = plugin(&["token(?!s)\\w*"]);
        assert_eq!(rewrite(&plugin, "tokens only").await, None);
        assert_eq!(
            rewrite(&plugin, "tokenABC leaked").await.as_deref(),
            Some("[redacted] leaked")
        );
    }
}
