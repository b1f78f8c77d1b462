//! Bridge channel management.
//!
//! Groups the event queues feeding the orchestrator loop: one per transport,
//! one for lifecycle timers, plus the shutdown signal.

use tokio::sync::{mpsc, watch};

use crate::telegram::transport::GroupEvent;
use crate::whatsapp::lifecycle::TimerEvent;
use crate::whatsapp::transport::MobileEvent;

/// Senders handed to the transport adapters.
#[derive(Clone)]
pub struct TransportSenders {
    /// Mobile-chat client -> bridge.
    pub mobile_tx: mpsc::UnboundedSender<MobileEvent>,
    /// Group-chat bot -> bridge.
    pub group_tx: mpsc::UnboundedSender<GroupEvent>,
}

/// Receivers drained by the orchestrator loop.
pub struct LoopChannels {
    pub mobile_rx: mpsc::UnboundedReceiver<MobileEvent>,
    pub group_rx: mpsc::UnboundedReceiver<GroupEvent>,
    pub timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    /// Sender for lifecycle timers (lifecycle manager posts here).
    pub timer_tx: mpsc::UnboundedSender<TimerEvent>,
    /// Receiver for shutdown signal (orchestrator listens).
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Control channels for shutdown coordination.
pub struct ControlChannels {
    /// Sender to trigger shutdown.
    pub shutdown_tx: watch::Sender<bool>,
}

/// Bundle of all channels created by the bridge.
pub struct ChannelBundle {
    pub transports: TransportSenders,
    pub bridge: LoopChannels,
    pub control: ControlChannels,
}

impl ChannelBundle {
    /// Create a new set of bridge channels.
    pub fn new() -> Self {
        let (mobile_tx, mobile_rx) = mpsc::unbounded_channel();
        let (group_tx, group_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            transports: TransportSenders {
                mobile_tx,
                group_tx,
            },
            bridge: LoopChannels {
                mobile_rx,
                group_rx,
                timer_rx,
                timer_tx,
                shutdown_rx,
            },
            control: ControlChannels { shutdown_tx },
        }
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new()
    }
}
