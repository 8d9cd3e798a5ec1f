//! Error types for termgate.
//!
//! Every error a command can hit is recovered and rendered as one line of
//! text, so each variant carries the verb that produced it and its `Display`
//! is already the prefixed line the user sees.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a built-in handler or of the external-process fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A required argument was not supplied
    #[error("{verb}: missing operand")]
    MissingOperand { verb: &'static str },

    #[error("{verb}: {target}: No such file or directory")]
    NotFound { verb: &'static str, target: String },

    #[error("{verb}: {target}: Not a directory")]
    NotADirectory { verb: &'static str, target: String },

    #[error("{verb}: {target}: Is a directory")]
    IsADirectory { verb: &'static str, target: String },

    #[error("{verb}: {target}: Permission denied")]
    PermissionDenied { verb: &'static str, target: String },

    #[error("{verb}: cannot create directory '{target}': File exists")]
    AlreadyExists { verb: &'static str, target: String },

    /// Several sources were given but the destination is not a directory
    #[error("{verb}: target '{target}' is not a directory")]
    TargetNotDirectory { verb: &'static str, target: String },

    /// Source and destination name the same file
    #[error("{verb}: '{source_path}' and '{target}' are the same file")]
    SameFile {
        verb: &'static str,
        source_path: String,
        target: String,
    },

    /// A directory would be copied or moved below itself
    #[error("{verb}: cannot {action} a directory, '{target}', into itself")]
    IntoItself {
        verb: &'static str,
        action: &'static str,
        target: String,
    },

    /// A monitoring figure was requested on a host without system metrics
    #[error("{verb}: {what} unavailable (system metrics are not available on this host)")]
    Unavailable {
        verb: &'static str,
        what: &'static str,
    },

    /// The external fallback could not find an executable for the verb
    #[error("{program}: command not found")]
    CommandNotFound { program: String },

    /// An external program exceeded its bounded wait and was killed
    #[error("{verb}: timed out after {seconds}s")]
    TimedOut { verb: String, seconds: u64 },

    /// Any other IO or launch failure
    #[error("{verb}: {message}")]
    Io { verb: String, message: String },
}

impl CommandError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn missing_operand(verb: &'static str) -> Self {
        Self::MissingOperand { verb }
    }

    pub fn not_found(verb: &'static str, target: impl Into<String>) -> Self {
        Self::NotFound {
            verb,
            target: target.into(),
        }
    }

    pub fn io(verb: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            verb: verb.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(verb: &'static str, what: &'static str) -> Self {
        Self::Unavailable { verb, what }
    }

    /// Maps an `io::Error` raised while operating on `target` onto the
    /// matching variant, keeping the OS description for everything else.
    pub fn from_io(verb: &'static str, target: impl Into<String>, err: &io::Error) -> Self {
        let target = target.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { verb, target },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { verb, target },
            io::ErrorKind::NotADirectory => Self::NotADirectory { verb, target },
            io::ErrorKind::IsADirectory => Self::IsADirectory { verb, target },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { verb, target },
            _ => Self::Io {
                verb: verb.to_string(),
                message: format!("{target}: {err}"),
            },
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::CommandNotFound { .. })
    }
}

/// Failure while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse configuration file at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A type alias for handler results.
pub type Result<T> = std::result::Result<T, CommandError>;
