//! Delivery of QR codes, pairing codes and status notices to operators.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use tracing::{debug, warn};

use crate::common::error::DeliveryError;
use crate::common::types::{ChatId, ThreadId};
use crate::store::ContactStore;
use crate::telegram::transport::GroupTransport;

/// Minimum rendered QR edge length in pixels.
pub const QR_MIN_DIMENSION: u32 = 256;

const QR_CAPTION: &str =
    "Scan this QR code in WhatsApp: Settings > Linked devices > Link a device";

/// Render a QR payload to a PNG image with a quiet zone.
pub fn render_qr(payload: &str) -> Result<Bytes, DeliveryError> {
    let code = QrCode::new(payload.as_bytes())?;
    let image = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(Bytes::from(png))
}

/// Format an 8-character pairing code as `XXXX-XXXX`.
///
/// Codes of any other length are returned unchanged.
pub fn format_pairing_code(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    if chars.len() != 8 {
        return code.to_string();
    }
    let (head, tail) = chars.split_at(4);
    format!(
        "{}-{}",
        head.iter().collect::<String>(),
        tail.iter().collect::<String>()
    )
}

/// Sends operator-facing artifacts to the group-chat side.
///
/// Every failure is logged and swallowed.
pub struct Delivery {
    group: Arc<dyn GroupTransport>,
    store: Arc<dyn ContactStore>,
    admin_chat: ChatId,
}

impl Delivery {
    pub fn new(
        group: Arc<dyn GroupTransport>,
        store: Arc<dyn ContactStore>,
        admin_chat: ChatId,
    ) -> Self {
        Self {
            group,
            store,
            admin_chat,
        }
    }

    pub fn admin_chat(&self) -> ChatId {
        self.admin_chat
    }

    /// Post a status notice to the admin chat.
    pub async fn notify_status(&self, text: &str) {
        self.send(self.admin_chat, None, text).await;
    }

    /// Render and send a QR payload to the admin and bridge chats.
    pub async fn deliver_qr(&self, payload: &str) {
        let png = match render_qr(payload) {
            Ok(png) => png,
            Err(e) => {
                warn!("Failed to render QR code: {}", e);
                return;
            }
        };

        for chat_id in self.recipients().await {
            if let Err(e) = self.group.send_image(chat_id, png.clone(), QR_CAPTION).await {
                warn!(chat_id, "Failed to deliver QR code: {}", e);
            }
        }
    }

    /// Send a pairing code to the admin and bridge chats, and to the chat that asked for it.
    pub async fn deliver_pairing_code(&self, phone: &str, code: &str, requested_by: Option<ChatId>) {
        let text = format!(
            "🔑 Pairing code for +{}: {}\n\nEnter it in WhatsApp: Settings > Linked devices > Link with phone number",
            phone,
            format_pairing_code(code)
        );

        let mut recipients = self.recipients().await;
        if let Some(chat_id) = requested_by {
            if !recipients.contains(&chat_id) {
                recipients.push(chat_id);
            }
        }
        for chat_id in recipients {
            self.send(chat_id, None, &text).await;
        }
    }

    /// Reply into a specific chat (and thread).
    pub async fn reply(&self, chat_id: ChatId, thread_id: Option<ThreadId>, text: &str) {
        self.send(chat_id, thread_id, text).await;
    }

    async fn send(&self, chat_id: ChatId, thread_id: Option<ThreadId>, text: &str) {
        if let Err(e) = self.group.send_text(chat_id, thread_id, text).await {
            warn!(chat_id, "Failed to deliver message: {}", e);
        }
    }

    /// Admin chat plus the bridge route chat, without duplicates.
    async fn recipients(&self) -> Vec<ChatId> {
        let mut chats = vec![self.admin_chat];
        match self.store.get_route().await {
            Ok(Some(route)) if route.active && route.chat_id != self.admin_chat => {
                chats.push(route.chat_id)
            }
            Ok(_) => {}
            Err(e) => debug!("Could not read bridge route for delivery: {}", e),
        }
        chats
    }
}
