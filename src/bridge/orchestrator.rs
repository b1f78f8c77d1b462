//! Bridge orchestrator that ties the mobile chat and the group chat together.
//!
//! A single loop drains the transport event queues and lifecycle timers.
//! Every handler is awaited inline, so handlers never run concurrently and
//! each queue is processed in arrival order.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::bridge::channels::LoopChannels;
use crate::bridge::context::BotInfo;
use crate::bridge::operator::{summarize_config, OperatorHandler};
use crate::bridge::router::{MessageRouter, RouterSettings};
use crate::common::error::{AppError, ConfigError};
use crate::config::types::Config;
use crate::plugins::{build_pipeline, PluginDeps};
use crate::store::ContactStore;
use crate::telegram::commands::OperatorCommand;
use crate::telegram::delivery::Delivery;
use crate::telegram::transport::{GroupEvent, GroupMessage, GroupTransport};
use crate::whatsapp::lifecycle::{AuthMode, LifecycleManager, LifecycleSettings};
use crate::whatsapp::phone::{DigitRangePolicy, PhonePolicy};
use crate::whatsapp::transport::{MobileEvent, MobileTransport, UpsertKind};

/// Transport adapters the orchestrator drives.
#[derive(Clone)]
pub struct Transports {
    pub mobile: Arc<dyn MobileTransport>,
    pub group: Arc<dyn GroupTransport>,
    /// Username of the group bot, for `/command@username` addressing.
    pub bot_username: Option<String>,
}

/// The main bridge loop and everything it owns.
pub struct Orchestrator {
    lifecycle: LifecycleManager,
    router: MessageRouter,
    operator: OperatorHandler,
    bot_username: Option<String>,
    channels: LoopChannels,
}

impl Orchestrator {
    /// Wire up every component from configuration.
    pub fn new(
        config: &Config,
        transports: Transports,
        store: Arc<dyn ContactStore>,
        channels: LoopChannels,
    ) -> Result<Self, AppError> {
        let phone_policy: Arc<dyn PhonePolicy> =
            Arc::new(DigitRangePolicy::from_config(&config.whatsapp.phone));
        let auth_mode = AuthMode::from_config(config, phone_policy.as_ref())?;
        let admin_chat = config
            .telegram
            .admin_chat_id
            .ok_or_else(|| ConfigError::ValidationError {
                message: "telegram.admin_chat_id is required".to_string(),
            })?;

        let delivery = Arc::new(Delivery::new(
            transports.group.clone(),
            store.clone(),
            admin_chat,
        ));
        let lifecycle = LifecycleManager::new(
            LifecycleSettings::from_config(config, auth_mode.clone()),
            transports.mobile.clone(),
            delivery.clone(),
            channels.timer_tx.clone(),
        );

        let pipeline = build_pipeline(
            &config.plugins,
            &PluginDeps {
                transport: transports.mobile.clone(),
                phone_policy: phone_policy.clone(),
            },
        )?;
        let plugin_names = pipeline.names();

        let bot = BotInfo::new(config.bot.name.clone());
        let router = MessageRouter::new(
            store.clone(),
            pipeline,
            transports.mobile,
            transports.group,
            bot.clone(),
            lifecycle.handle(),
            RouterSettings::from_config(&config.bridge),
        );
        let operator = OperatorHandler::new(
            store,
            delivery,
            phone_policy,
            bot,
            plugin_names,
            summarize_config(config, &auth_mode),
        );

        Ok(Self {
            lifecycle,
            router,
            operator,
            bot_username: transports.bot_username,
            channels,
        })
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Run until shutdown is signalled or a fatal error occurs.
    ///
    /// Pending timers are cancelled on exit; the mobile session is kept.
    pub async fn run(mut self) -> Result<(), AppError> {
        let result = self.run_loop().await;
        self.lifecycle.shutdown();
        match &result {
            Ok(()) => info!("Bridge stopped"),
            Err(e) => error!("Bridge stopped: {}", e),
        }
        result
    }

    async fn run_loop(&mut self) -> Result<(), AppError> {
        self.lifecycle.start().await?;
        info!("Bridge running");

        loop {
            tokio::select! {
                biased;

                changed = self.channels.shutdown_rx.changed() => {
                    if changed.is_err() || *self.channels.shutdown_rx.borrow() {
                        info!("Shutdown signal received");
                        return Ok(());
                    }
                }

                Some(event) = self.channels.timer_rx.recv() => {
                    self.lifecycle.handle_timer(event).await?;
                }

                Some(event) = self.channels.mobile_rx.recv() => {
                    self.handle_mobile_event(event).await?;
                }

                Some(event) = self.channels.group_rx.recv() => {
                    self.handle_group_event(event).await?;
                }

                else => {
                    warn!("All event queues closed");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_mobile_event(&mut self, event: MobileEvent) -> Result<(), AppError> {
        match event {
            MobileEvent::Connection(update) => {
                debug!(?update, "Connection update");
                self.lifecycle.handle_update(update).await?;
            }
            MobileEvent::Qr(payload) => self.lifecycle.handle_qr(payload).await,
            MobileEvent::Messages {
                kind: UpsertKind::Notify,
                messages,
            } => {
                for raw in &messages {
                    if let Err(e) = self.router.route_inbound(raw).await {
                        warn!(id = %raw.id, remote_id = %raw.remote_id, "Dropping inbound message: {}", e);
                    }
                }
            }
            MobileEvent::Messages {
                kind: UpsertKind::Append,
                messages,
            } => {
                debug!("Ignoring {} history message(s)", messages.len());
            }
        }
        Ok(())
    }

    async fn handle_group_event(&mut self, event: GroupEvent) -> Result<(), AppError> {
        let GroupEvent::Message(message) = event;

        if let Some(command) = OperatorCommand::parse(&message.text, self.bot_username.as_deref()) {
            self.operator
                .handle(&mut self.lifecycle, &message, command)
                .await?;
            return Ok(());
        }

        if message.thread_id.is_some() {
            self.forward_thread_message(&message).await;
        } else {
            debug!(chat_id = message.chat_id, "Ignoring group message outside a thread");
        }
        Ok(())
    }

    async fn forward_thread_message(&self, message: &GroupMessage) {
        if let Err(e) = self.router.route_outbound_from_mirror(message).await {
            warn!(
                chat_id = message.chat_id,
                thread_id = ?message.thread_id,
                "Dropping thread message: {}",
                e
            );
        }
    }
}
