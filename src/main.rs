//! Ferryman - WhatsApp-Telegram chat bridge
//!
//! Runs the bridge against the local console transports.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ferryman::bridge::{ChannelBundle, Orchestrator, Transports};
use ferryman::config::{env::get_config_path, load_and_validate};
use ferryman::console::{read_stdin, ConsoleGroup, ConsoleMobile};
use ferryman::store::JsonFileStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = get_config_path();
    let config = load_and_validate(&config_path);

    // RUST_LOG wins over the configured level
    let level = config.as_ref().map(|c| c.log_level()).unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    info!("Ferryman v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded from {}", config_path);
    info!("  Bot: {}", config.bot.name);
    info!("  Database: {}", config.database.path);
    info!(
        "  Auth: {}",
        if config.pairing_number().is_some() { "pairing code" } else { "QR code" }
    );

    let store = Arc::new(JsonFileStore::open(&config.database.path).await?);

    // ============================================================
    // Transports and the bridge loop
    // ============================================================
    let channels = ChannelBundle::new();
    let shutdown_tx = channels.control.shutdown_tx;
    let mobile = Arc::new(ConsoleMobile::new(channels.transports.mobile_tx.clone()));
    let transports = Transports {
        mobile: mobile.clone(),
        group: Arc::new(ConsoleGroup::default()),
        bot_username: None,
    };

    let orchestrator = Orchestrator::new(&config, transports, store, channels.bridge)?;

    if let Some(admin_chat) = config.telegram.admin_chat_id {
        tokio::spawn(read_stdin(channels.transports, mobile, admin_chat));
    }

    let mut bridge_task = tokio::spawn(orchestrator.run());

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => true,
        result = &mut bridge_task => {
            match result {
                Ok(Ok(())) => info!("Bridge exited"),
                Ok(Err(e)) => {
                    error!("Fatal: {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Bridge task panicked: {}", e);
                    std::process::exit(1);
                }
            }
            false
        }
    };

    if shutdown {
        info!("Shutdown signal received - stopping bridge...");
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (bridge already exited): {}", e);
        }
        match tokio::time::timeout(Duration::from_secs(5), bridge_task).await {
            Ok(Ok(Ok(()))) => info!("Bridge stopped gracefully"),
            Ok(Ok(Err(e))) => warn!("Bridge stopped with error: {}", e),
            Ok(Err(e)) => warn!("Bridge task panicked: {}", e),
            Err(_) => warn!("Bridge shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
