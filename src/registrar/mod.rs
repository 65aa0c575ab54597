//! Registrar adapters: the contract every command framework implements.
//!
//! A framework registers aliases through
//! [`CommandManager::register_alias`](crate::CommandManager::register_alias)
//! and from then on only needs to remember the primary alias of each
//! mapping it was granted. The manager always forwards that primary alias,
//! whichever alias the caller typed. The verbatim line, when the caller
//! attached one, is available through
//! [`InvocationContext::command_string`].
//!
//! # Bundled frameworks
//!
//! - [`SimpleRegistrar`]: commands backed by closures
//! - [`ScriptedRegistrar`]: commands declared in the config file

mod scripted;
mod simple;

pub use scripted::ScriptedRegistrar;
pub use simple::{CommandHandler, SimpleCommand, SimpleRegistrar};

use crate::core::{CommandMapping, CommandResult, InvocationContext, RegistrarId, TreeScope};
use crate::error::{CommandExecutionError, NotificationError};

/// A command framework plugged into the manager.
///
/// Only [`process`](Self::process) may report a user-facing failure.
/// Suggestions, help, and tree completion degrade to empty results.
///
/// Callbacks run on the caller's thread. [`unregister`](Self::unregister)
/// runs while the manager holds its registration lock, so it must not
/// register or unregister aliases itself.
pub trait CommandRegistrar: Send + Sync {
    /// Stable identity of this registrar.
    fn id(&self) -> RegistrarId;

    /// Execute `command` (a primary alias) with the raw argument string.
    fn process(
        &self,
        cause: &InvocationContext,
        command: &str,
        arguments: &str,
    ) -> Result<CommandResult, CommandExecutionError>;

    /// Completions for the argument string of `command`.
    fn suggestions(&self, _cause: &InvocationContext, _command: &str, _arguments: &str) -> Vec<String> {
        Vec::new()
    }

    /// Help text for `command`, if the framework has any.
    fn help(&self, _cause: &InvocationContext, _command: &str) -> Option<String> {
        None
    }

    /// Stop treating `mapping` as live.
    ///
    /// Called before the mapping's aliases are released. Must be
    /// idempotent.
    fn unregister(&self, mapping: &CommandMapping) -> Result<(), NotificationError>;

    /// Decorate the tree nodes for the primary aliases this registrar owns.
    ///
    /// Called once per registrar per tree build, with every alias at once.
    fn complete_command_tree(&self, _cause: &InvocationContext, _scope: &mut TreeScope) {}
}
