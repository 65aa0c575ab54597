//! Error types for registration, execution, and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for alias registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Errors that reject a single registration attempt.
///
/// Neither variant affects mappings that are already live.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The candidate alias list was empty, not normalized, or contained duplicates.
    #[error("Invalid alias specification: {0}")]
    InvalidAliasSpec(String),

    /// Every candidate, including the namespaced fallback, is already claimed.
    #[error("No alias available for plugin '{plugin}': [{}] are all claimed", .candidates.join(", "))]
    NoAliasAvailable { plugin: String, candidates: Vec<String> },
}

/// User-facing failure raised by a registrar while processing a command.
///
/// The message is surfaced verbatim to whoever invoked the command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandExecutionError {
    message: String,
}

impl CommandExecutionError {
    /// Create an execution error carrying a user-facing message.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// The user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A registrar failed to clean up after an unregistration notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unregistration cleanup failed: {message}")]
pub struct NotificationError {
    message: String,
}

impl NotificationError {
    /// Create a notification error.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// The failure description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A scripted command entry is unusable.
    #[error("Invalid scripted command '{name}': {reason}")]
    InvalidCommand { name: String, reason: String },
}
