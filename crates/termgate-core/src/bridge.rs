//! Boundary to the natural-language service.
//!
//! The service itself lives outside the core (see `termgate-interaction`).
//! Whatever goes wrong on the other side, the answer comes back as text:
//! either the reply or a descriptive failure line.

use async_trait::async_trait;

/// Forwards free text to a generative-language service.
#[async_trait]
pub trait LanguageBridge: Send + Sync {
    /// `Ok` holds the answer, `Err` a descriptive `nl: ...` line.
    async fn ask(&self, text: &str) -> Result<String, String>;
}

/// The bridge used when no credential is configured. Never touches the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBridge;

pub const DISABLED_MESSAGE: &str =
    "nl: natural-language bridge is not configured (set GEMINI_API_KEY or bridge.api_key)";

#[async_trait]
impl LanguageBridge for DisabledBridge {
    async fn ask(&self, _text: &str) -> Result<String, String> {
        Err(DISABLED_MESSAGE.to_string())
    }
}
