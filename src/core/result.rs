//! Outcome of dispatching a command line.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CommandExecutionError;

/// Kind of dispatch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// The registrar ran the command.
    Success,
    /// The registrar rejected or failed the command.
    Failure,
    /// No mapping owns the typed alias.
    NotFound,
}

impl ResultKind {
    /// Lowercase label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::NotFound => "not found",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of a dispatch, returned to the caller unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Outcome kind.
    pub kind: ResultKind,
    /// Optional user-facing message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResult {
    /// Successful result with no message.
    pub fn success() -> Self {
        Self { kind: ResultKind::Success, message: None }
    }

    /// Successful result with a message.
    pub fn success_with(message: impl Into<String>) -> Self {
        Self { kind: ResultKind::Success, message: Some(message.into()) }
    }

    /// Failed result carrying a user-facing message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self { kind: ResultKind::Failure, message: Some(message.into()) }
    }

    /// No command owns the alias.
    pub fn not_found() -> Self {
        Self { kind: ResultKind::NotFound, message: None }
    }

    /// Replace the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.kind == ResultKind::Success
    }

    pub fn is_failure(&self) -> bool {
        self.kind == ResultKind::Failure
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ResultKind::NotFound
    }
}

impl From<CommandExecutionError> for CommandResult {
    fn from(err: CommandExecutionError) -> Self {
        Self::failure(err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_becomes_failure() {
        let result = CommandResult::from(CommandExecutionError::new("No such world"));
        assert!(result.is_failure());
        assert_eq!(result.message.as_deref(), Some("No such world"));
    }

    #[test]
    fn test_result_serialization() {
        let json = serde_json::to_string(&CommandResult::not_found()).unwrap();
        assert_eq!(json, r#"{"kind":"not_found"}"#);

        let json = serde_json::to_string(&CommandResult::success_with("ok")).unwrap();
        assert_eq!(json, r#"{"kind":"success","message":"ok"}"#);
    }
}
