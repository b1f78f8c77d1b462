//! Connection lifecycle management for the mobile-chat transport.
//!
//! Drives the `Disconnected -> Connecting -> Authenticating -> Connected`
//! state machine, chooses between QR and pairing-code authentication, and
//! applies the reconnect policy on disconnects.
//!
//! Timers run as tokio tasks that post [`TimerEvent`]s back into the
//! orchestrator loop. Each event carries the connection epoch it was
//! scheduled in; events from an older epoch are ignored.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::error::{ConfigError, ConnectionError, TransportResult};
use crate::common::reconnect::{ReconnectConfig, ReconnectState};
use crate::common::types::ChatId;
use crate::config::types::Config;
use crate::telegram::delivery::Delivery;
use crate::whatsapp::phone::PhonePolicy;
use crate::whatsapp::transport::{ConnectionUpdate, DisconnectReason, MobileTransport};

/// Lifecycle state of the mobile-chat connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
}

impl ConnectionState {
    fn notice(&self) -> &'static str {
        match self {
            Self::Disconnected => "🔴 WhatsApp disconnected",
            Self::Connecting => "🔄 Connecting to WhatsApp...",
            Self::Authenticating => "🔐 Waiting for WhatsApp authentication",
            Self::Connected => "✅ Connected to WhatsApp",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
        })
    }
}

/// How the transport identity is authenticated. Fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Qr,
    /// Out-of-band code for a normalized, digits-only phone number.
    PairingCode { phone: String },
}

impl AuthMode {
    /// Pairing-code mode when a pairing number is configured, QR otherwise.
    pub fn from_config(config: &Config, policy: &dyn PhonePolicy) -> Result<Self, ConfigError> {
        match config.pairing_number() {
            None => Ok(Self::Qr),
            Some(number) => policy
                .normalize(number)
                .map(|phone| Self::PairingCode { phone })
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "whatsapp.pairing_number".to_string(),
                    message: format!("'{}' is not a valid phone number", number),
                }),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qr => f.write_str("QR code"),
            Self::PairingCode { phone } => write!(f, "pairing code (+{})", phone),
        }
    }
}

/// Published snapshot of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub attempts: u32,
    pub last_disconnect: Option<DisconnectReason>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            last_disconnect: None,
        }
    }
}

/// Read-only view of the connection status.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    rx: watch::Receiver<ConnectionStatus>,
}

impl ConnectionHandle {
    pub fn new(rx: watch::Receiver<ConnectionStatus>) -> Self {
        Self { rx }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.rx.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.rx.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Wait for the next published change. Returns `false` once the manager is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// A pending pairing-code request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingRequest {
    /// Normalized, digits-only phone number.
    pub phone: String,
    /// Chat that asked for the code, if an operator did.
    pub requested_by: Option<ChatId>,
}

/// Timer expirations delivered to the orchestrator loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Reconnect { epoch: u64 },
    PairingDue { epoch: u64, request: PairingRequest },
}

/// Lifecycle tunables, derived from configuration.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub auth_mode: AuthMode,
    pub auto_reconnect: bool,
    pub reconnect: ReconnectConfig,
    pub pairing_settle_delay: Duration,
    pub pairing_manual_delay: Duration,
}

impl LifecycleSettings {
    pub fn from_config(config: &Config, auth_mode: AuthMode) -> Self {
        Self {
            auth_mode,
            auto_reconnect: config.bot.auto_reconnect,
            reconnect: ReconnectConfig {
                delay: config.reconnect_delay(),
                max_attempts: config.bot.max_reconnect_attempts,
            },
            pairing_settle_delay: config.whatsapp.pairing.settle_delay(),
            pairing_manual_delay: config.whatsapp.pairing.manual_delay(),
        }
    }
}

/// Owner of the connection state.
pub struct LifecycleManager {
    settings: LifecycleSettings,
    transport: Arc<dyn MobileTransport>,
    delivery: Arc<Delivery>,
    reconnect: ReconnectState,
    state: ConnectionState,
    epoch: u64,
    last_qr: Option<String>,
    last_disconnect: Option<DisconnectReason>,
    status_tx: watch::Sender<ConnectionStatus>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    reconnect_timer: Option<JoinHandle<()>>,
    pairing_timer: Option<JoinHandle<()>>,
}

impl LifecycleManager {
    pub fn new(
        settings: LifecycleSettings,
        transport: Arc<dyn MobileTransport>,
        delivery: Arc<Delivery>,
        timer_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::default());
        let reconnect = ReconnectState::new(settings.reconnect.clone());
        Self {
            settings,
            transport,
            delivery,
            reconnect,
            state: ConnectionState::Disconnected,
            epoch: 0,
            last_qr: None,
            last_disconnect: None,
            status_tx,
            timer_tx,
            reconnect_timer: None,
            pairing_timer: None,
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle::new(self.status_tx.subscribe())
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    pub fn max_attempts(&self) -> u32 {
        self.reconnect.max_attempts()
    }

    pub fn auth_mode(&self) -> &AuthMode {
        &self.settings.auth_mode
    }

    pub fn last_qr(&self) -> Option<&str> {
        self.last_qr.as_deref()
    }

    pub fn last_disconnect(&self) -> Option<DisconnectReason> {
        self.last_disconnect
    }

    pub fn is_registered(&self) -> bool {
        self.transport.is_registered()
    }

    pub fn has_pending_pairing(&self) -> bool {
        self.pairing_timer.is_some()
    }

    /// Begin the first connection attempt.
    pub async fn start(&mut self) -> Result<(), ConnectionError> {
        info!("Starting WhatsApp connection ({})", self.settings.auth_mode);
        self.begin_connect().await
    }

    /// Apply a connection update reported by the transport.
    pub async fn handle_update(&mut self, update: ConnectionUpdate) -> Result<(), ConnectionError> {
        match update {
            ConnectionUpdate::Connecting => {
                if self.state != ConnectionState::Connecting {
                    self.enter_connecting().await;
                }
                Ok(())
            }
            ConnectionUpdate::Open => {
                self.cancel_timers();
                self.reconnect.reset();
                self.last_qr = None;
                info!("WhatsApp connection open");
                self.transition(ConnectionState::Connected, None).await;
                Ok(())
            }
            ConnectionUpdate::Close(reason) => self.handle_disconnect(reason).await,
        }
    }

    /// Handle a fresh QR payload. The previous payload is invalidated.
    pub async fn handle_qr(&mut self, payload: String) {
        if let AuthMode::PairingCode { .. } = self.settings.auth_mode {
            debug!("Ignoring QR payload in pairing-code mode");
            return;
        }

        info!("Received WhatsApp login QR code");
        self.last_qr = Some(payload.clone());
        self.transition(ConnectionState::Authenticating, None).await;
        self.delivery.deliver_qr(&payload).await;
    }

    /// Handle an expired timer.
    pub async fn handle_timer(&mut self, event: TimerEvent) -> Result<(), ConnectionError> {
        match event {
            TimerEvent::Reconnect { epoch } => {
                if epoch != self.epoch || self.state != ConnectionState::Disconnected {
                    debug!(epoch, current = self.epoch, "Ignoring stale reconnect timer");
                    return Ok(());
                }
                self.reconnect_timer = None;
                info!(
                    attempt = self.reconnect.attempts(),
                    "Reconnecting to WhatsApp..."
                );
                self.begin_connect().await
            }
            TimerEvent::PairingDue { epoch, request } => {
                if epoch != self.epoch {
                    debug!(epoch, current = self.epoch, "Ignoring stale pairing timer");
                    return Ok(());
                }
                self.pairing_timer = None;
                self.request_pairing_code(request).await;
                Ok(())
            }
        }
    }

    /// Schedule a pairing-code request after the operator delay.
    pub fn schedule_pairing(&mut self, request: PairingRequest) {
        let delay = self.settings.pairing_manual_delay;
        self.schedule_pairing_after(delay, request);
    }

    /// Cancel any pending reconnect and connect immediately.
    pub async fn reconnect_now(&mut self) -> Result<(), ConnectionError> {
        info!("Manual reconnect requested");
        self.begin_connect().await
    }

    /// Log out of the transport. The session must be re-authenticated afterwards.
    pub async fn logout(&mut self) -> TransportResult<()> {
        self.cancel_timers();
        self.transport.logout().await?;
        self.epoch += 1;
        self.last_qr = None;
        self.last_disconnect = Some(DisconnectReason::LoggedOut);
        info!("Logged out of WhatsApp");
        self.transition(
            ConnectionState::Disconnected,
            Some("🔴 Logged out of WhatsApp. Use /qr or /pair <phone> to link again.".to_string()),
        )
        .await;
        Ok(())
    }

    /// Stop all timers. The session is left intact.
    pub fn shutdown(&mut self) {
        self.cancel_timers();
    }

    async fn begin_connect(&mut self) -> Result<(), ConnectionError> {
        self.cancel_timers();
        self.epoch += 1;
        self.state = ConnectionState::Disconnected;
        self.enter_connecting().await;

        if let Err(e) = self.transport.connect().await {
            warn!("WhatsApp connect failed: {}", e);
            return self.handle_disconnect(DisconnectReason::Unknown(None)).await;
        }
        Ok(())
    }

    async fn enter_connecting(&mut self) {
        self.transition(ConnectionState::Connecting, None).await;

        if let AuthMode::PairingCode { phone } = &self.settings.auth_mode {
            if !self.transport.is_registered() {
                let request = PairingRequest {
                    phone: phone.clone(),
                    requested_by: None,
                };
                let delay = self.settings.pairing_settle_delay;
                self.schedule_pairing_after(delay, request);
            }
        }
    }

    async fn handle_disconnect(&mut self, reason: DisconnectReason) -> Result<(), ConnectionError> {
        let already_down = self.state == ConnectionState::Disconnected;
        if already_down && self.reconnect_timer.is_some() && !reason.is_terminal() {
            // The pending retry already covers this drop
            debug!("WhatsApp closed again ({}), retry already scheduled", reason);
            self.last_disconnect = Some(reason);
            self.publish();
            return Ok(());
        }
        self.cancel_timers();
        self.epoch += 1;
        self.last_qr = None;
        self.last_disconnect = Some(reason);

        if reason.is_terminal() {
            warn!("WhatsApp session ended: {}", reason);
            if already_down {
                self.publish();
                return Ok(());
            }
            self.transition(
                ConnectionState::Disconnected,
                Some(format!(
                    "❌ WhatsApp session ended ({}). Use /qr or /pair <phone> to link again.",
                    reason
                )),
            )
            .await;
            return Ok(());
        }

        if !self.settings.auto_reconnect {
            warn!("WhatsApp disconnected ({}), auto-reconnect disabled", reason);
            self.transition(
                ConnectionState::Disconnected,
                Some(format!(
                    "🔴 WhatsApp disconnected ({}). Auto-reconnect is off, use /reconnect.",
                    reason
                )),
            )
            .await;
            return Ok(());
        }

        match self.reconnect.next_delay() {
            Some(delay) => {
                let attempt = self.reconnect.attempts();
                let max = self.reconnect.max_attempts();
                warn!(
                    attempt,
                    "WhatsApp disconnected ({}), reconnecting in {:.1}s",
                    reason,
                    delay.as_secs_f64()
                );
                self.transition(
                    ConnectionState::Disconnected,
                    Some(format!(
                        "🔴 WhatsApp disconnected ({}). Reconnecting in {}s (attempt {}/{})",
                        reason,
                        delay.as_secs(),
                        attempt,
                        max
                    )),
                )
                .await;

                let event = TimerEvent::Reconnect { epoch: self.epoch };
                self.reconnect_timer = Some(self.spawn_timer(delay, event));
                Ok(())
            }
            None => {
                let attempts = self.reconnect.attempts();
                error!("Maximum reconnection attempts ({}) exceeded", attempts);
                self.transition(
                    ConnectionState::Disconnected,
                    Some(format!(
                        "❌ WhatsApp disconnected ({}). Gave up after {} reconnection attempts.",
                        reason, attempts
                    )),
                )
                .await;
                Err(ConnectionError::MaxReconnectAttempts { attempts })
            }
        }
    }

    async fn request_pairing_code(&mut self, request: PairingRequest) {
        if !matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Authenticating
        ) {
            debug!(state = %self.state, "Skipping pairing request, no connection in progress");
            return;
        }
        if self.transport.is_registered() {
            debug!("Skipping pairing request, already registered");
            return;
        }

        info!("Requesting pairing code for +{}", request.phone);
        match self.transport.request_pairing_code(&request.phone).await {
            Ok(code) => {
                self.transition(ConnectionState::Authenticating, None).await;
                self.delivery
                    .deliver_pairing_code(&request.phone, &code, request.requested_by)
                    .await;
            }
            Err(e) => {
                warn!("Pairing code request failed: {}", e);
                let text = format!("❌ Failed to get a pairing code for +{}: {}", request.phone, e);
                self.delivery.notify_status(&text).await;
                if let Some(chat_id) = request.requested_by {
                    if chat_id != self.delivery.admin_chat() {
                        self.delivery.reply(chat_id, None, &text).await;
                    }
                }
            }
        }
    }

    fn schedule_pairing_after(&mut self, delay: Duration, request: PairingRequest) {
        if let Some(timer) = self.pairing_timer.take() {
            timer.abort();
        }
        debug!("Pairing code request in {:.1}s", delay.as_secs_f64());
        let event = TimerEvent::PairingDue {
            epoch: self.epoch,
            request,
        };
        self.pairing_timer = Some(self.spawn_timer(delay, event));
    }

    fn spawn_timer(&self, delay: Duration, event: TimerEvent) -> JoinHandle<()> {
        let tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = tx.send(event) {
                debug!("Timer queue closed (shutdown in progress): {}", e);
            }
        })
    }

    fn cancel_timers(&mut self) {
        for timer in [self.reconnect_timer.take(), self.pairing_timer.take()]
            .into_iter()
            .flatten()
        {
            timer.abort();
        }
    }

    async fn transition(&mut self, state: ConnectionState, notice: Option<String>) {
        let changed = self.state != state;
        self.state = state;
        self.publish();

        if let Some(text) = notice {
            self.delivery.notify_status(&text).await;
        } else if changed {
            self.delivery.notify_status(state.notice()).await;
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(ConnectionStatus {
            state: self.state,
            attempts: self.reconnect.attempts(),
            last_disconnect: self.last_disconnect,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{FakeGroup, FakeMobile, GroupCall};

    const ADMIN: ChatId = -100;

    struct Harness {
        manager: LifecycleManager,
        mobile: Arc<FakeMobile>,
        group: Arc<FakeGroup>,
        timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    }

    fn harness(auth_mode: AuthMode, max_attempts: u32) -> Harness {
        let mobile = Arc::new(FakeMobile::default());
        let group = Arc::new(FakeGroup::default());
        let delivery = Arc::new(Delivery::new(
            group.clone(),
            Arc::new(MemoryStore::new()),
            ADMIN,
        ));
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let settings = LifecycleSettings {
            auth_mode,
            auto_reconnect: true,
            reconnect: ReconnectConfig {
                delay: Duration::from_secs(5),
                max_attempts,
            },
            pairing_settle_delay: Duration::from_secs(5),
            pairing_manual_delay: Duration::from_secs(2),
        };
        Harness {
            manager: LifecycleManager::new(settings, mobile.clone(), delivery, timer_tx),
            mobile,
            group,
            timer_rx,
        }
    }

    fn pairing_mode() -> AuthMode {
        AuthMode::PairingCode {
            phone: "15551234567".to_string(),
        }
    }

    fn notices(group: &FakeGroup) -> Vec<String> {
        group.texts().into_iter().map(|(_, _, text)| text).collect()
    }

    #[test]
    fn test_auth_mode_from_config() {
        use crate::whatsapp::phone::DigitRangePolicy;

        let policy = DigitRangePolicy::default();
        let mut config = Config::default();
        assert_eq!(AuthMode::from_config(&config, &policy).unwrap(), AuthMode::Qr);

        config.whatsapp.pairing_number = Some("+1 555 123 4567".to_string());
        assert_eq!(
            AuthMode::from_config(&config, &policy).unwrap(),
            pairing_mode()
        );

        config.whatsapp.pairing_number = Some("123".to_string());
        assert!(AuthMode::from_config(&config, &policy).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_enters_connecting() {
        let mut h = harness(AuthMode::Qr, 10);
        let handle = h.manager.handle();

        h.manager.start().await.unwrap();
        assert_eq!(h.manager.state(), ConnectionState::Connecting);
        assert_eq!(handle.state(), ConnectionState::Connecting);
        assert_eq!(h.mobile.connects(), 1);
        assert!(notices(&h.group).iter().any(|n| n.contains("Connecting")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_disconnect_then_open_resets_counter() {
        let mut h = harness(AuthMode::Qr, 10);
        let handle = h.manager.handle();
        h.manager.start().await.unwrap();

        h.manager
            .handle_update(ConnectionUpdate::Close(DisconnectReason::ConnectionLost))
            .await
            .unwrap();
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);
        assert_eq!(h.manager.attempts(), 1);
        assert_eq!(handle.status().attempts, 1);

        let timer = h.timer_rx.recv().await.unwrap();
        h.manager.handle_timer(timer).await.unwrap();
        assert_eq!(h.mobile.connects(), 2);
        assert_eq!(h.manager.attempts(), 1);

        h.manager.handle_update(ConnectionUpdate::Open).await.unwrap();
        assert_eq!(h.manager.state(), ConnectionState::Connected);
        assert_eq!(h.manager.attempts(), 0);
        assert!(handle.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_close_consumes_one_attempt() {
        let mut h = harness(AuthMode::Qr, 10);
        h.manager.start().await.unwrap();

        for _ in 0..2 {
            h.manager
                .handle_update(ConnectionUpdate::Close(DisconnectReason::ConnectionLost))
                .await
                .unwrap();
            assert_eq!(h.manager.attempts(), 1);
        }

        let timer = h.timer_rx.recv().await.unwrap();
        h.manager.handle_timer(timer).await.unwrap();
        assert_eq!(h.manager.attempts(), 1);
        assert_eq!(h.mobile.connects(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(h.timer_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logged_out_is_terminal() {
        let mut h = harness(AuthMode::Qr, 10);
        h.manager.start().await.unwrap();
        h.manager
            .handle_update(ConnectionUpdate::Close(DisconnectReason::ConnectionLost))
            .await
            .unwrap();
        let timer = h.timer_rx.recv().await.unwrap();
        h.manager.handle_timer(timer).await.unwrap();

        h.manager
            .handle_update(ConnectionUpdate::Close(DisconnectReason::LoggedOut))
            .await
            .unwrap();
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);
        assert_eq!(h.manager.attempts(), 1);
        assert_eq!(h.manager.last_disconnect(), Some(DisconnectReason::LoggedOut));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(h.timer_rx.try_recv().is_err());
        assert_eq!(h.mobile.connects(), 2);
        assert!(notices(&h.group).iter().any(|n| n.contains("logged out")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_are_fatal() {
        let mut h = harness(AuthMode::Qr, 10);
        h.manager.start().await.unwrap();

        for attempt in 1..=10 {
            h.manager
                .handle_update(ConnectionUpdate::Close(DisconnectReason::ConnectionLost))
                .await
                .unwrap();
            assert_eq!(h.manager.attempts(), attempt);
            let timer = h.timer_rx.recv().await.unwrap();
            h.manager.handle_timer(timer).await.unwrap();
        }

        let result = h
            .manager
            .handle_update(ConnectionUpdate::Close(DisconnectReason::ConnectionLost))
            .await;
        assert!(matches!(
            result,
            Err(ConnectionError::MaxReconnectAttempts { attempts: 10 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connect_counts_as_attempt() {
        let mut h = harness(AuthMode::Qr, 10);
        h.mobile.fail_connect(true);

        h.manager.start().await.unwrap();
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);
        assert_eq!(h.manager.attempts(), 1);
        assert!(matches!(
            h.timer_rx.recv().await,
            Some(TimerEvent::Reconnect { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_qr_replaces_previous_and_is_delivered() {
        let mut h = harness(AuthMode::Qr, 10);
        h.manager.start().await.unwrap();

        h.manager.handle_qr("first".to_string()).await;
        assert_eq!(h.manager.state(), ConnectionState::Authenticating);
        h.manager.handle_qr("second".to_string()).await;
        assert_eq!(h.manager.last_qr(), Some("second"));

        let images = h
            .group
            .calls()
            .into_iter()
            .filter(|c| matches!(c, GroupCall::Image { chat_id: ADMIN, .. }))
            .count();
        assert_eq!(images, 2);

        h.manager.handle_update(ConnectionUpdate::Open).await.unwrap();
        assert!(h.manager.last_qr().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairing_code_after_settle_delay() {
        let mut h = harness(pairing_mode(), 10);
        h.mobile.set_pairing_code(Some("ABCDEFGH"));

        h.manager.start().await.unwrap();
        assert!(h.manager.has_pending_pairing());

        let timer = h.timer_rx.recv().await.unwrap();
        assert!(matches!(timer, TimerEvent::PairingDue { .. }));
        h.manager.handle_timer(timer).await.unwrap();

        assert_eq!(h.mobile.pairing_requests(), vec!["15551234567"]);
        assert_eq!(h.manager.state(), ConnectionState::Authenticating);
        assert!(notices(&h.group).iter().any(|n| n.contains("ABCD-EFGH")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairing_failure_stays_connecting() {
        let mut h = harness(pairing_mode(), 10);
        h.mobile.set_pairing_code(None);

        h.manager.start().await.unwrap();
        let timer = h.timer_rx.recv().await.unwrap();
        h.manager.handle_timer(timer).await.unwrap();

        assert_eq!(h.manager.state(), ConnectionState::Connecting);
        assert!(!h.manager.has_pending_pairing());
        assert!(notices(&h.group).iter().any(|n| n.contains("Failed to get a pairing code")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registered_identity_skips_pairing() {
        let mut h = harness(pairing_mode(), 10);
        h.mobile.set_registered(true);

        h.manager.start().await.unwrap();
        assert!(!h.manager.has_pending_pairing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timers_are_ignored() {
        let mut h = harness(AuthMode::Qr, 10);
        h.manager.start().await.unwrap();
        h.manager
            .handle_update(ConnectionUpdate::Close(DisconnectReason::ConnectionLost))
            .await
            .unwrap();

        h.manager
            .handle_timer(TimerEvent::Reconnect { epoch: 0 })
            .await
            .unwrap();
        assert_eq!(h.mobile.connects(), 1);
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_reconnect_cancels_pending_timer() {
        let mut h = harness(AuthMode::Qr, 10);
        h.manager.start().await.unwrap();
        h.manager
            .handle_update(ConnectionUpdate::Close(DisconnectReason::ConnectionLost))
            .await
            .unwrap();

        h.manager.reconnect_now().await.unwrap();
        assert_eq!(h.mobile.connects(), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(h.timer_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout() {
        let mut h = harness(AuthMode::Qr, 10);
        h.mobile.set_registered(true);
        h.manager.start().await.unwrap();
        h.manager.handle_update(ConnectionUpdate::Open).await.unwrap();

        h.manager.logout().await.unwrap();
        assert_eq!(h.mobile.logouts(), 1);
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);

        // The transport's own close event afterwards does not reconnect
        h.manager
            .handle_update(ConnectionUpdate::Close(DisconnectReason::LoggedOut))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(h.timer_rx.try_recv().is_err());
    }
}
