//! Configuration file management for termgate.
//!
//! Reads `~/.config/termgate/config.toml` (platform config dir). Every field
//! has a default, so a missing file is equivalent to an empty one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable that overrides `bridge.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BRIDGE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub shell: ShellConfig,
    pub bridge: BridgeConfig,
    pub web: WebConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ShellConfig {
    /// Upper bound on the wall-clock time of an external program.
    pub external_timeout_secs: u64,
    /// Oldest history entries are dropped beyond this many.
    pub history_limit: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            external_timeout_secs: 30,
            history_limit: 1000,
        }
    }
}

impl ShellConfig {
    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }
}

/// Natural-language bridge settings. A missing key disables the bridge.
#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout_secs: 10,
            base_url: DEFAULT_BRIDGE_BASE_URL.to_string(),
        }
    }
}

impl BridgeConfig {
    /// The configured key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Hand-written so the key never reaches a log line.
impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// How the HTTP caller answers `rm -i` prompts, since it has no prompt channel.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmPolicy {
    #[default]
    Decline,
    Accept,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct WebConfig {
    pub bind: String,
    pub confirm: ConfirmPolicy,
    /// Entries kept by the form page transcript.
    pub transcript_limit: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
            confirm: ConfirmPolicy::Decline,
            transcript_limit: 200,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from `path`, or from the default location when
    /// `None`, then applies the `GEMINI_API_KEY` override.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.bridge.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Parses a configuration file without consulting the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Returns the default configuration path: `<config_dir>/termgate/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("termgate").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.shell.external_timeout_secs, 30);
        assert_eq!(config.bridge.timeout_secs, 10);
        assert_eq!(config.bridge.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.web.confirm, ConfirmPolicy::Decline);
        assert!(config.bridge.api_key().is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[web]\nconfirm = \"accept\"\n\n[bridge]\napi_key = \"   \"\nmodel = \"gemini-pro\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.web.confirm, ConfirmPolicy::Accept);
        assert_eq!(config.web.bind, "0.0.0.0:5000");
        assert_eq!(config.bridge.model, "gemini-pro");
        // Blank keys count as absent.
        assert!(config.bridge.api_key().is_none());
        assert_eq!(config.shell.history_limit, 1000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[shell\nexternal_timeout_secs = ").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_debug_redacts_key() {
        let bridge = BridgeConfig {
            api_key: Some("super-secret".into()),
            ..BridgeConfig::default()
        };
        let rendered = format!("{:?}", bridge);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
