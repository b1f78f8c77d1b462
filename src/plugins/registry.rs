//! Static plugin registry.
//!
//! Plugins are looked up by name and run in the order listed under
//! `plugins.order`.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use super::echo::EchoPlugin;
use super::help::HelpPlugin;
use super::pairing::PairingPlugin;
use super::redact::RedactPlugin;
use super::status::StatusPlugin;
use super::{Pipeline, Plugin};
use crate::common::error::ConfigError;
use crate::config::types::PluginsConfig;
use crate::whatsapp::phone::PhonePolicy;
use crate::whatsapp::transport::MobileTransport;

/// Every plugin name the registry knows.
pub const AVAILABLE_PLUGINS: &[&str] = &["help", "status", "echo", "pairing", "redact"];

/// Collaborators some plugins need.
#[derive(Clone)]
pub struct PluginDeps {
    pub transport: Arc<dyn MobileTransport>,
    pub phone_policy: Arc<dyn PhonePolicy>,
}

/// Build the pipeline described by the configuration.
pub fn build_pipeline(config: &PluginsConfig, deps: &PluginDeps) -> Result<Pipeline, ConfigError> {
    if !config.enabled {
        info!("Plugins disabled");
        return Ok(Pipeline::empty());
    }

    let mut seen = HashSet::new();
    let mut plugins = Vec::with_capacity(config.order.len());

    for name in &config.order {
        let key = name.trim().to_lowercase();
        if !seen.insert(key.clone()) {
            warn!("Plugin '{}' listed more than once, skipping duplicate", name);
            continue;
        }
        let plugin = create(&key, config, deps).ok_or_else(|| ConfigError::InvalidValue {
            field: "plugins.order".to_string(),
            message: format!(
                "unknown plugin '{}' (available: {})",
                name,
                AVAILABLE_PLUGINS.join(", ")
            ),
        })?;
        plugins.push(plugin);
    }

    let pipeline = Pipeline::new(plugins);
    info!("Loaded {} plugin(s): {}", pipeline.len(), pipeline.names().join(", "));
    Ok(pipeline)
}

fn create(name: &str, config: &PluginsConfig, deps: &PluginDeps) -> Option<Box<dyn Plugin>> {
    let plugin: Box<dyn Plugin> = match name {
        "help" => Box::new(HelpPlugin),
        "status" => Box::new(StatusPlugin),
        "echo" => Box::new(EchoPlugin),
        "pairing" => Box::new(PairingPlugin::new(
            deps.transport.clone(),
            deps.phone_policy.clone(),
        )),
        "redact" => {
            let redact = RedactPlugin::new(&config.redact.patterns);
            if !redact.has_patterns() {
                warn!("Redact plugin enabled without any valid patterns");
            }
            Box::new(redact)
        }
        _ => return None,
    };
    Some(plugin)
}
