//! Network-facing collaborators of the shell core.

pub mod gemini_api_agent;

use std::sync::Arc;

use termgate_core::LanguageBridge;
use termgate_core::bridge::DisabledBridge;
use termgate_core::config::BridgeConfig;

pub use gemini_api_agent::{BridgeError, GeminiApiAgent};

/// Builds the bridge described by the configuration. Without a key the
/// feature is disabled and no request is ever attempted.
pub fn bridge_from_config(config: &BridgeConfig) -> Arc<dyn LanguageBridge> {
    match config.api_key() {
        Some(key) => match GeminiApiAgent::from_config(key, config) {
            Ok(agent) => {
                tracing::info!("[Bridge] Gemini enabled (model: {})", config.model);
                Arc::new(agent)
            }
            Err(e) => {
                tracing::warn!("[Bridge] could not build HTTP client, bridge disabled: {}", e);
                Arc::new(DisabledBridge)
            }
        },
        None => {
            tracing::debug!("[Bridge] no API key configured, bridge disabled");
            Arc::new(DisabledBridge)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termgate_core::bridge::DISABLED_MESSAGE;

    #[tokio::test]
    async fn test_missing_key_disables_bridge() {
        let bridge = bridge_from_config(&BridgeConfig::default());
        assert_eq!(bridge.ask("hello").await, Err(DISABLED_MESSAGE.to_string()));
    }
}
