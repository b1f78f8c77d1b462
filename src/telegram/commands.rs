//! Operator slash commands (/status, /qr, /pair, etc).

/// Commands accepted from the group chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/status`
    Status,
    /// `/config` (admin chat only).
    Config,
    /// `/setbridge` (groups only).
    SetBridge,
    /// `/qr` (admin chat only).
    Qr,
    /// `/pair <phone>` (admin chat only); the argument may be missing.
    Pair { phone: Option<String> },
    /// `/unpair` (admin chat only).
    Unpair,
    /// `/reconnect` (admin chat only).
    Reconnect,
    /// A slash command this bot does not know.
    Unknown(String),
}

impl OperatorCommand {
    /// Parse a message as a command.
    ///
    /// Returns `None` if the text is not a slash command, or if it is
    /// addressed to a different bot (`/status@otherbot`).
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;
        if body.len() > 200 {
            return None;
        }

        let mut parts = body.splitn(2, char::is_whitespace);
        let head = parts.next().unwrap_or_default();
        let args = parts
            .next()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from);

        let (command, target) = match head.split_once('@') {
            Some((command, target)) => (command, Some(target)),
            None => (head, None),
        };
        if let (Some(target), Some(username)) = (target, bot_username) {
            if !target.eq_ignore_ascii_case(username) {
                return None;
            }
        }
        if command.is_empty() {
            return None;
        }

        Some(match command.to_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "status" => Self::Status,
            "config" => Self::Config,
            "setbridge" => Self::SetBridge,
            "qr" => Self::Qr,
            "pair" => Self::Pair { phone: args },
            "unpair" => Self::Unpair,
            "reconnect" => Self::Reconnect,
            other => Self::Unknown(other.to_string()),
        })
    }

    /// Whether the command may only be issued from the admin chat.
    ///
    /// Everything that touches the WhatsApp session is gated.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::Config | Self::Qr | Self::Pair { .. } | Self::Unpair | Self::Reconnect
        )
    }
}

/// Command reference shown by `/start` and `/help`.
pub const COMMAND_HELP: &str = "\
/status - connection and bridge status
/qr - show the current login QR code (admin only)
/pair <phone> - request a pairing code for a phone number (admin only)
/unpair - log out of WhatsApp (admin only)
/reconnect - reconnect to WhatsApp now (admin only)
/setbridge - mirror WhatsApp chats into this group
/config - show configuration (admin only)
/help - this list";
