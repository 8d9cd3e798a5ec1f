//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! Sends one user turn to `generateContent` and flattens the first candidate
//! to text. Every failure is rendered as an `nl: ...` line.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use termgate_core::LanguageBridge;
use termgate_core::config::{BridgeConfig, DEFAULT_BRIDGE_BASE_URL, DEFAULT_GEMINI_MODEL};
use thiserror::Error;

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const NO_CONTENT: &str = "[No content returned]";

/// Why a request produced no answer. `Display` is the line the user sees.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("nl: nothing to ask")]
    EmptyQuery,

    #[error("nl: API call failed: {0}")]
    Transport(String),

    #[error("nl: API returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("[No content returned]")]
    NoContent,
}

/// Agent implementation that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

// Omits the key.
impl std::fmt::Debug for GeminiApiAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiApiAgent")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiApiAgent {
    /// Creates an agent with the default model, endpoint and a 10 second timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::build(
            api_key.into(),
            DEFAULT_GEMINI_MODEL.to_string(),
            DEFAULT_BRIDGE_BASE_URL.to_string(),
            DEFAULT_TIMEOUT,
        )
    }

    pub fn from_config(api_key: &str, config: &BridgeConfig) -> Result<Self, reqwest::Error> {
        Self::build(
            api_key.to_string(),
            config.model.clone(),
            config.base_url.clone(),
            config.timeout(),
        )
    }

    fn build(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    /// Sends `text` as a single user turn and returns the answer.
    pub async fn generate(&self, text: &str) -> Result<String, BridgeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BridgeError::EmptyQuery);
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            }],
        };

        tracing::debug!("[Bridge] POST {}", self.endpoint());

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| BridgeError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| BridgeError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(map_http_error(status, &body));
        }

        match serde_json::from_str::<GenerateContentResponse>(&body) {
            Ok(parsed) => extract_text_response(parsed),
            Err(err) => {
                tracing::debug!("[Bridge] unreadable response body: {}", err);
                Err(BridgeError::NoContent)
            }
        }
    }
}

#[async_trait]
impl LanguageBridge for GeminiApiAgent {
    async fn ask(&self, text: &str) -> Result<String, String> {
        match self.generate(text).await {
            Ok(answer) => Ok(answer),
            // An empty candidate list is an answer, just not a useful one.
            Err(BridgeError::NoContent) => Ok(NO_CONTENT.to_string()),
            Err(err) => {
                if !matches!(err, BridgeError::EmptyQuery) {
                    tracing::warn!("[Bridge] {}", err);
                }
                Err(err.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Joins every text fragment of the first candidate.
fn extract_text_response(response: GenerateContentResponse) -> Result<String, BridgeError> {
    let parts = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    if parts.is_empty() {
        return Err(BridgeError::NoContent);
    }

    Ok(parts
        .into_iter()
        .map(|part| part.text.unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn map_http_error(status: StatusCode, body: &str) -> BridgeError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    BridgeError::Http {
        status: status.as_u16(),
        message,
    }
}
