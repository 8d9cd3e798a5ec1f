pub mod bridge;
pub mod capability;
pub mod command;
pub mod config;
pub mod confirm;
pub mod error;
pub mod executor;
pub mod external;
pub mod path;
pub mod session;
pub mod tokenizer;

// Re-export the types every caller needs
pub use bridge::{DisabledBridge, LanguageBridge};
pub use capability::Capabilities;
pub use command::{CommandOutput, TERMINATE_VERBS};
pub use config::AppConfig;
pub use confirm::{Confirm, FixedAnswer};
pub use error::{CommandError, ConfigError};
pub use executor::{ExecOptions, ExecOutcome, Executor};
pub use session::Session;
