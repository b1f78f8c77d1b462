//! Message formatting for mirrored messages.
//!
//! Handles placeholder substitution in `bridge.message_format`.
//! Supports placeholders: {name}, {phone}, {message}, {time}

use std::time::Duration;

use chrono::Local;

use crate::common::types::Contact;
use crate::config::types::DEFAULT_MESSAGE_FORMAT;

/// Longest text the group side accepts in one message, in bytes.
pub const MAX_GROUP_MESSAGE_LEN: usize = 4096;

/// Longest forum thread name.
const MAX_TOPIC_NAME_LEN: usize = 128;

/// Message formatter that substitutes placeholders in format strings.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    format: String,
}

impl MessageFormatter {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Format a mirrored message.
    ///
    /// - `{name}` - Contact display name, Markdown-escaped
    /// - `{phone}` - Contact phone fragment
    /// - `{message}` - The message text, verbatim
    /// - `{time}` - Current time (HH:MM:SS)
    pub fn format(&self, contact: &Contact, message: &str) -> String {
        // {message} goes last so message text is never re-scanned for placeholders
        self.format
            .replace("{time}", &get_time())
            .replace("{name}", &escape_markdown(contact.display_name()))
            .replace("{phone}", &contact.phone)
            .replace("{message}", message)
    }

    pub fn format_string(&self) -> &str {
        &self.format
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_FORMAT)
    }
}

/// Escape Markdown control characters.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Forum thread name for a contact.
pub fn topic_name(contact: &Contact) -> String {
    let name = match contact.name.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(name) if name != contact.phone => format!("{} ({})", name.trim(), contact.phone),
        _ => contact.display_name().to_string(),
    };
    let end = floor_char_boundary(&name, MAX_TOPIC_NAME_LEN);
    name[..end].to_string()
}

/// Human-readable uptime such as `2d 3h 4m`.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    match (days, hours) {
        (0, 0) => format!("{}m {}s", minutes, secs % 60),
        (0, _) => format!("{}h {}m", hours, minutes),
        _ => format!("{}d {}h {}m", days, hours, minutes),
    }
}

/// Get the current time as HH:MM:SS string.
fn get_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Find the last UTF-8 char boundary at or before `byte_index` in `s`.
fn floor_char_boundary(s: &str, byte_index: usize) -> usize {
    if byte_index >= s.len() {
        return s.len();
    }
    let mut i = byte_index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Split a message into chunks that fit within the max length (in bytes).
///
/// Prefers line breaks, then spaces. Never splits inside a UTF-8 character.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message.len() <= max_len {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let split_at = floor_char_boundary(remaining, max_len);

        // Force at least one character when max_len is smaller than it
        if split_at == 0 {
            let first_char_end = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
            chunks.push(remaining[..first_char_end].to_string());
            remaining = &remaining[first_char_end..];
            continue;
        }

        let chunk = &remaining[..split_at];
        match chunk.rfind('\n').or_else(|| chunk.rfind(' ')) {
            Some(idx) if idx > 0 => {
                chunks.push(remaining[..idx].to_string());
                remaining = &remaining[idx + 1..];
            }
            _ => {
                chunks.push(chunk.to_string());
                remaining = &remaining[split_at..];
            }
        }
    }

    chunks
}
